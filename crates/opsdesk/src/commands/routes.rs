//! `opsdesk routes` -- record and list route history of fleet units.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use opsdesk_core::route::Route;
use opsdesk_storage::TaskStore;

use crate::cli::{RouteAddArgs, RouteListArgs, RoutesArgs, RoutesCommands};
use crate::context::RuntimeContext;
use crate::output::{ROUTE_HEADERS, output_json, output_table, route_row};

pub fn run(ctx: &RuntimeContext, args: &RoutesArgs) -> Result<()> {
    let store = ctx.open_store()?;
    match &args.command {
        RoutesCommands::Add(add) => run_add(ctx, &store, add),
        RoutesCommands::List(list) => run_list(ctx, &store, list),
    }
}

fn run_add(ctx: &RuntimeContext, store: &dyn TaskStore, args: &RouteAddArgs) -> Result<()> {
    let inicio = match &args.inicio {
        Some(raw) => parse_time(raw)?,
        None => Utc::now(),
    };
    let mut route = Route::new(&args.unidad, inicio);
    route.operador = args.operador.clone();
    route.caja = args.caja.clone().filter(|c| !c.is_empty());
    route.origen = args.origen.clone();
    route.destino = args.destino.clone();
    route.fin = args
        .fin
        .as_deref()
        .map(parse_time)
        .transpose()?
        .map(|dt| dt.timestamp_millis());

    let id = store.add_route(&route)?;
    route.id = Some(id);

    if ctx.json {
        output_json(&route);
    } else if !ctx.quiet {
        println!("Recorded route {} for unit {}", id, route.unidad);
    }
    Ok(())
}

fn run_list(ctx: &RuntimeContext, store: &dyn TaskStore, args: &RouteListArgs) -> Result<()> {
    let routes = store.recent_routes(&args.unidad, args.limit)?;
    if ctx.json {
        output_json(&routes);
    } else if routes.is_empty() {
        if !ctx.quiet {
            println!("No routes recorded for unit {}.", args.unidad);
        }
    } else {
        let rows: Vec<Vec<String>> = routes.iter().map(route_row).collect();
        output_table(ROUTE_HEADERS, &rows);
    }
    Ok(())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid RFC 3339 time: {raw:?}"))
}
