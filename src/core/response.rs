use crate::core::exchange::ExchangeResult;
use crate::domain::error::TcpHexError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Reply to a connect request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectResponse {
    pub fn connected() -> Self {
        Self {
            connected: true,
            error: None,
        }
    }

    pub fn failed(error: &TcpHexError) -> Self {
        Self {
            connected: false,
            error: Some(format!("Connection failed: {}", error)),
        }
    }
}

/// Reply to a disconnect request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectResponse {
    pub disconnected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DisconnectResponse {
    pub fn disconnected() -> Self {
        Self {
            disconnected: true,
            error: None,
        }
    }

    pub fn failed(error: &TcpHexError) -> Self {
        Self {
            disconnected: false,
            error: Some(format!("Disconnect failed: {}", error)),
        }
    }
}

/// One successful iteration as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeReply {
    pub sent: String,
    pub received: String,
}

/// Aggregated outcome of a send, keyed by iteration index.
///
/// Partial success is normal: an index appears in exactly one of the maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendResponse {
    pub success: BTreeMap<usize, ExchangeReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<usize, String>>,
}

impl SendResponse {
    pub fn total(&self) -> usize {
        self.success.len() + self.errors.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn success_count(&self) -> usize {
        self.success.len()
    }

    /// Non-empty replies in iteration order
    pub fn responses(&self) -> Vec<&str> {
        self.success
            .values()
            .map(|reply| reply.received.as_str())
            .filter(|received| !received.is_empty())
            .collect()
    }
}

impl From<Vec<ExchangeResult>> for SendResponse {
    fn from(results: Vec<ExchangeResult>) -> Self {
        let mut response = SendResponse::default();
        let mut errors = BTreeMap::new();

        for result in results {
            match result.error {
                Some(error) => {
                    errors.insert(result.index, error);
                }
                None => {
                    response.success.insert(
                        result.index,
                        ExchangeReply {
                            sent: result.sent,
                            received: result.received.unwrap_or_default(),
                        },
                    );
                }
            }
        }

        if !errors.is_empty() {
            response.errors = Some(errors);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, received: Option<&str>, error: Option<&str>) -> ExchangeResult {
        ExchangeResult {
            index,
            sent: "0102".to_string(),
            received: received.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_send_response_partitions_results() {
        let response = SendResponse::from(vec![
            result(0, Some("AA"), None),
            result(1, None, Some("Receive error (repeat 2/3): reset")),
            result(2, Some(""), None),
        ]);

        assert_eq!(response.total(), 3);
        assert_eq!(response.success_count(), 2);
        assert_eq!(response.success[&0].received, "AA");
        assert_eq!(response.success[&2].received, "");
        assert_eq!(response.errors.as_ref().unwrap().len(), 1);
        assert_eq!(response.responses(), vec!["AA"]);
    }

    #[test]
    fn test_send_response_json_shape() {
        let response = SendResponse::from(vec![result(0, Some("48656C6C6F"), None)]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"]["0"]["sent"], "0102");
        assert_eq!(json["success"]["0"]["received"], "48656C6C6F");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_connect_response_json_shape() {
        let ok = serde_json::to_value(ConnectResponse::connected()).unwrap();
        assert_eq!(ok, serde_json::json!({ "connected": true }));

        let failed = ConnectResponse::failed(&TcpHexError::ConnectTimeout {
            addr: "10.0.0.1:502".to_string(),
            timeout_ms: 5000,
        });
        assert!(!failed.connected);
        assert!(failed.error.unwrap().contains("10.0.0.1:502"));
    }

    #[test]
    fn test_disconnect_response() {
        assert!(DisconnectResponse::disconnected().disconnected);
        let failed = DisconnectResponse::failed(&TcpHexError::NotConnected);
        assert!(!failed.disconnected);
        assert!(failed.error.unwrap().starts_with("Disconnect failed"));
    }
}
