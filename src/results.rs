//! Probe results and their JSON encoding.
//!
//! Every record has the same shape: durations are integer nanoseconds and
//! a missing error, page or address is written as an empty string.

use std::fmt::Display;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// What one path's resolve-then-fetch attempt observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathOutcome {
    #[serde(rename = "LookupTook", serialize_with = "as_nanos")]
    pub lookup_took: Duration,
    #[serde(rename = "HTTPConnectionTook", serialize_with = "as_nanos")]
    pub http_connection_took: Duration,
    #[serde(rename = "Error", serialize_with = "or_empty")]
    pub error: Option<String>,
    #[serde(rename = "Page", serialize_with = "or_empty")]
    pub page: Option<String>,
    #[serde(rename = "IP", serialize_with = "or_empty")]
    pub ip: Option<Ipv4Addr>,
}

impl PathOutcome {
    /// An outcome that failed before anything was measured.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Both paths' outcomes for one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedResult {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Plain")]
    pub plain: PathOutcome,
    #[serde(rename = "Tor")]
    pub tor: PathOutcome,
}

/// Encode results in completion order as a JSON array.
pub fn encode(results: &[CombinedResult]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(results)
}

fn as_nanos<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

fn or_empty<T: Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_str(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample() -> Vec<CombinedResult> {
        vec![
            CombinedResult {
                name: "example.com".to_string(),
                plain: PathOutcome {
                    lookup_took: Duration::from_millis(12),
                    http_connection_took: Duration::from_micros(1500),
                    error: None,
                    page: None,
                    ip: Some(Ipv4Addr::new(93, 184, 216, 34)),
                },
                tor: PathOutcome {
                    lookup_took: Duration::from_millis(300),
                    http_connection_took: Duration::from_millis(800),
                    error: None,
                    page: Some("<html></html>".to_string()),
                    ip: Some(Ipv4Addr::new(93, 184, 216, 34)),
                },
            },
            CombinedResult {
                name: "blocked.test".to_string(),
                plain: PathOutcome {
                    lookup_took: Duration::from_nanos(42),
                    ..PathOutcome::failed("no addresses found")
                },
                tor: PathOutcome::failed("connection refused"),
            },
        ]
    }

    #[test]
    fn encode_uses_fixed_field_names() {
        let encoded: Value = serde_json::from_slice(&encode(&sample()).unwrap()).unwrap();

        assert_eq!(
            encoded[0],
            json!({
                "Name": "example.com",
                "Plain": {
                    "LookupTook": 12_000_000u64,
                    "HTTPConnectionTook": 1_500_000u64,
                    "Error": "",
                    "Page": "",
                    "IP": "93.184.216.34",
                },
                "Tor": {
                    "LookupTook": 300_000_000u64,
                    "HTTPConnectionTook": 800_000_000u64,
                    "Error": "",
                    "Page": "<html></html>",
                    "IP": "93.184.216.34",
                },
            })
        );
    }

    #[test]
    fn failed_outcomes_keep_the_same_shape() {
        let encoded: Value = serde_json::from_slice(&encode(&sample()).unwrap()).unwrap();

        let failed = &encoded[1]["Plain"];
        assert_eq!(failed["Error"], "no addresses found");
        assert_eq!(failed["IP"], "");
        assert_eq!(failed["LookupTook"], 42);
        assert_eq!(failed["HTTPConnectionTook"], 0);

        let keys = |v: &Value| {
            let mut keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&encoded[0]["Tor"]), keys(&encoded[1]["Tor"]));
        assert_eq!(keys(&encoded[0]), keys(&encoded[1]));
    }

    #[test]
    fn encode_is_stable_across_calls() {
        let results = sample();

        assert_eq!(encode(&results).unwrap(), encode(&results).unwrap());
    }

    #[test]
    fn encode_empty_set() {
        assert_eq!(encode(&[]).unwrap(), b"[]");
    }
}
