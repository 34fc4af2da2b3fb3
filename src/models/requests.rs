//! Request DTOs for the HTTP API
//!
//! Defines the query strings accepted by the moderation endpoints.

use serde::Deserialize;

use crate::error::{CoreError, Result};

/// Query string carrying an entity id (`?id=42`)
#[derive(Debug, Clone, Deserialize)]
pub struct IdQuery {
    /// The entity id
    pub id: Option<String>,
}

impl IdQuery {
    /// Parses the id, rejecting missing, malformed or zero values.
    pub fn parse(&self) -> Result<u64> {
        let raw = self
            .id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::InvalidRequest("Missing id parameter".to_string()))?;

        match raw.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(CoreError::InvalidRequest(format!("Invalid id parameter: {}", raw))),
        }
    }
}

/// Query string filtering the pending queue by owner (`?user=7`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingQuery {
    /// Optional owner filter
    #[serde(default)]
    pub user: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_query_parse() {
        let query = IdQuery {
            id: Some("42".to_string()),
        };
        assert_eq!(query.parse().unwrap(), 42);
    }

    #[test]
    fn test_id_query_missing() {
        let query = IdQuery { id: None };
        assert!(matches!(query.parse(), Err(CoreError::InvalidRequest(_))));

        let query = IdQuery {
            id: Some(String::new()),
        };
        assert!(query.parse().is_err());
    }

    #[test]
    fn test_id_query_invalid() {
        for raw in ["abc", "-1", "0"] {
            let query = IdQuery {
                id: Some(raw.to_string()),
            };
            assert!(query.parse().is_err(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_pending_query_deserialize() {
        let query: PendingQuery = serde_json::from_str(r#"{"user": 7}"#).unwrap();
        assert_eq!(query.user, Some(7));

        let query: PendingQuery = serde_json::from_str("{}").unwrap();
        assert!(query.user.is_none());
    }
}
