//! Route history (recorridos) operations for [`SqliteStore`].

use rusqlite::{Connection, Row, params};

use opsdesk_core::route::Route;

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

const ROUTE_COLUMNS: &str = "id, unidad, operador, caja, origen, destino, inicio, fin";

fn scan_route(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: row.get("id")?,
        unidad: row.get("unidad")?,
        operador: row.get("operador")?,
        caja: row.get("caja")?,
        origen: row.get("origen")?,
        destino: row.get("destino")?,
        inicio: row.get("inicio")?,
        fin: row.get("fin")?,
    })
}

/// Latest `limit` routes of `unidad`, most recent start first.
pub(crate) fn recent_routes_on_conn(
    conn: &Connection,
    unidad: &str,
    limit: usize,
) -> Result<Vec<Route>> {
    let sql = format!(
        "SELECT {ROUTE_COLUMNS} FROM recorridos WHERE unidad = ?1 \
         ORDER BY inicio DESC, id DESC LIMIT ?2"
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![unidad, limit], scan_route)?;
    let mut routes = Vec::new();
    for row in rows {
        routes.push(row?);
    }
    Ok(routes)
}

impl SqliteStore {
    /// Records a route and returns its row id.
    pub fn add_route_impl(&self, route: &Route) -> Result<i64> {
        if route.unidad.trim().is_empty() {
            return Err(StorageError::validation("route unidad is required"));
        }
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO recorridos (unidad, operador, caja, origen, destino, inicio, fin) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                route.unidad,
                route.operador,
                route.caja,
                route.origen,
                route.destino,
                route.inicio,
                route.fin,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent_routes_impl(&self, unidad: &str, limit: usize) -> Result<Vec<Route>> {
        let conn = self.lock_conn()?;
        recent_routes_on_conn(&conn, unidad, limit)
    }
}
