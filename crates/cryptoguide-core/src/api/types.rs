use serde::{Deserialize, Serialize};

use crate::message::{Citation, Metadata};
use crate::protocol::Protocol;
use crate::selection::ProtocolSelection;

pub const QUERY_PATH: &str = "/api/query";
pub const COMPARE_PATH: &str = "/api/compare";
pub const HEALTH_PATH: &str = "/health";

/// Request body for one submission. The variant decides the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryRequest {
    Single {
        question: String,
        protocol: Protocol,
    },
    Compare {
        question: String,
        /// Selected protocol first.
        protocols: [Protocol; 2],
    },
}

impl QueryRequest {
    pub fn for_selection(question: &str, selection: &ProtocolSelection) -> Self {
        match selection.comparison_pair() {
            Some(protocols) => QueryRequest::Compare {
                question: question.to_string(),
                protocols,
            },
            None => QueryRequest::Single {
                question: question.to_string(),
                protocol: selection.selected(),
            },
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            QueryRequest::Single { .. } => QUERY_PATH,
            QueryRequest::Compare { .. } => COMPARE_PATH,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            QueryRequest::Single { question, .. } | QueryRequest::Compare { question, .. } => {
                question
            }
        }
    }

    pub fn comparison(&self) -> Option<[Protocol; 2]> {
        match self {
            QueryRequest::Single { .. } => None,
            QueryRequest::Compare { protocols, .. } => Some(*protocols),
        }
    }
}

/// Success body of both endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerEnvelope {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<Citation>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Only sent by the comparison endpoint.
    #[serde(default)]
    pub protocols: Option<Vec<String>>,
}

impl AnswerEnvelope {
    /// The echoed comparison pair, if it names exactly two known protocols.
    pub fn protocol_pair(&self) -> Option<[Protocol; 2]> {
        match self.protocols.as_deref() {
            Some([a, b]) => Some([Protocol::from_str(a)?, Protocol::from_str(b)?]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub pipeline_ready: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "ok" && self.pipeline_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_request_shape() {
        let selection = ProtocolSelection::default();
        let request = QueryRequest::for_selection("What is Aave?", &selection);
        assert_eq!(request.path(), "/api/query");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"question": "What is Aave?", "protocol": "aave"})
        );
    }

    #[test]
    fn test_compare_request_puts_selected_first() {
        let mut selection = ProtocolSelection::new(Protocol::Uniswap);
        selection.toggle_compare();
        selection.set_compare_protocol(Protocol::Aave).unwrap();

        let request = QueryRequest::for_selection("fees?", &selection);
        assert_eq!(request.path(), "/api/compare");
        assert_eq!(request.comparison(), Some([Protocol::Uniswap, Protocol::Aave]));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"question": "fees?", "protocols": ["uniswap", "aave"]})
        );
    }

    #[test]
    fn test_protocol_pair_requires_two_known_protocols() {
        let parse = |v: serde_json::Value| -> AnswerEnvelope { serde_json::from_value(v).unwrap() };

        let ok = parse(json!({"answer": "", "protocols": ["aave", "compound"]}));
        assert_eq!(ok.protocol_pair(), Some([Protocol::Aave, Protocol::Compound]));

        let unknown = parse(json!({"answer": "", "protocols": ["aave", "maker"]}));
        assert_eq!(unknown.protocol_pair(), None);

        let three = parse(json!({"answer": "", "protocols": ["aave", "compound", "uniswap"]}));
        assert_eq!(three.protocol_pair(), None);
    }

    #[test]
    fn test_envelope_requires_answer() {
        let result: Result<AnswerEnvelope, _> = serde_json::from_value(json!({"sources": []}));
        assert!(result.is_err());
    }
}
