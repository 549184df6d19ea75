//! Route history records (recorridos) of a fleet unit.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One completed or in-progress route of a unit.
///
/// Times are epoch milliseconds, the shape forms receive when route history
/// is injected into them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub unidad: String,
    #[serde(default)]
    pub operador: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caja: Option<String>,
    #[serde(default)]
    pub origen: String,
    #[serde(default)]
    pub destino: String,
    pub inicio: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fin: Option<i64>,
}

impl Route {
    pub fn new(unidad: impl Into<String>, inicio: DateTime<Utc>) -> Self {
        Self {
            id: None,
            unidad: unidad.into(),
            operador: String::new(),
            caja: None,
            origen: String::new(),
            destino: String::new(),
            inicio: inicio.timestamp_millis(),
            fin: None,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.inicio).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_optional_fields_skipped() {
        let at = Utc.with_ymd_and_hms(2025, 9, 4, 2, 18, 51).unwrap();
        let mut route = Route::new("T-12", at);
        route.origen = "Monterrey".into();
        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(
            value,
            json!({
                "unidad": "T-12",
                "operador": "",
                "origen": "Monterrey",
                "destino": "",
                "inicio": at.timestamp_millis()
            })
        );
        assert_eq!(route.started_at(), Some(at));
    }
}
