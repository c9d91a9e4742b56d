//! Request and response types for the HTTP API

use serde::{Deserialize, Serialize};

/// Query parameters for `GET /variables/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct VariableQuery {
    /// Select-list override; accepted for compatibility and not applied
    #[serde(default = "default_select")]
    pub q: String,

    /// Starting offset
    #[serde(default)]
    pub offset: u32,

    /// Maximum number of rows
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_select() -> String {
    "*".to_string()
}

fn default_limit() -> u32 {
    10
}

/// Query parameters for `GET /get-data/{id}`
///
/// The list parameters are comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridDataQuery {
    /// External grid id from the region catalog
    pub grid_id: Option<String>,

    pub levels_id: Option<String>,

    pub filter_names: Option<String>,

    pub filter_values: Option<String>,
}

/// Split a comma-separated query parameter
pub fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|value| value.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Error payload shared by every endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Payload of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Greeting {
    pub hola: String,
}

/// Payload of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("1,2,3")), ["1", "2", "3"]);
        assert_eq!(split_list(Some("mun")), ["mun"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_variable_query_defaults() {
        let query: VariableQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.q, "*");
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 10);
    }
}
