//! UI-agnostic conversation message types
//!
//! Messages are built once and never edited afterwards. All defaulting of
//! optional backend fields happens here, so renderers never need to
//! re-check for missing sources or metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::api::AnswerEnvelope;
use crate::protocol::Protocol;

/// Shown in place of an answer whenever a submission fails for any reason.
pub const FAILURE_ADVISORY: &str =
    "I couldn't process that question. Please ensure the backend server is running and reachable.";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub sources: Vec<Citation>,
    pub metadata: Metadata,
    pub is_comparison: bool,
    /// Only set when `is_comparison` is true.
    pub protocols: Option<[Protocol; 2]>,
    pub is_error: bool,
}

impl ChatMessage {
    /// Builds a user turn. Returns `None` for blank input; the raw text is
    /// kept as typed.
    pub fn user(text: impl Into<String>) -> Option<Self> {
        let content = text.into();
        if content.trim().is_empty() {
            return None;
        }

        Some(Self {
            role: ChatRole::User,
            content,
            sources: Vec::new(),
            metadata: Metadata::default(),
            is_comparison: false,
            protocols: None,
            is_error: false,
        })
    }

    /// Builds an assistant turn from a decoded backend response.
    ///
    /// `requested` is the protocol pair of a comparison request, or `None`
    /// for a single-protocol query. A comparison answer that does not echo a
    /// usable pair keeps the requested one.
    pub fn answer(envelope: AnswerEnvelope, requested: Option<[Protocol; 2]>) -> Self {
        let protocols = requested.map(|pair| envelope.protocol_pair().unwrap_or(pair));

        Self {
            role: ChatRole::Assistant,
            content: envelope.answer,
            sources: envelope.sources.unwrap_or_default(),
            metadata: envelope.metadata.unwrap_or_default(),
            is_comparison: requested.is_some(),
            protocols,
            is_error: false,
        }
    }

    /// Builds the locally synthesized failure turn.
    pub fn error() -> Self {
        Self {
            role: ChatRole::Assistant,
            content: FAILURE_ADVISORY.to_string(),
            sources: Vec::new(),
            metadata: Metadata::default(),
            is_comparison: false,
            protocols: None,
            is_error: true,
        }
    }
}

/// A document excerpt backing part of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireCitation")]
pub struct Citation {
    pub id: Option<u32>,
    pub protocol: Option<String>,
    pub document: Option<String>,
    pub page: Option<String>,
    pub excerpt: String,
}

impl Citation {
    /// Ordinal shown in front of the citation, `position` being zero-based.
    /// An id of 0 counts as missing.
    pub fn display_id(&self, position: usize) -> u32 {
        self.id
            .filter(|id| *id != 0)
            .unwrap_or(position as u32 + 1)
    }

    pub fn document_title(&self) -> &str {
        self.document.as_deref().unwrap_or("Unknown document")
    }
}

/// Citation as the backend sends it. `page` may be a number, a string, or
/// `"N/A"`; the passage may arrive as `text` or `excerpt`.
#[derive(Deserialize)]
struct WireCitation {
    id: Option<u32>,
    protocol: Option<String>,
    document: Option<String>,
    page: Option<Value>,
    text: Option<String>,
    excerpt: Option<String>,
}

impl From<WireCitation> for Citation {
    fn from(wire: WireCitation) -> Self {
        let excerpt = wire
            .text
            .filter(|t| !t.is_empty())
            .or(wire.excerpt)
            .unwrap_or_default();

        Self {
            id: wire.id,
            protocol: wire.protocol.filter(|p| !p.is_empty()),
            document: wire.document,
            page: wire.page.and_then(normalize_page),
            excerpt,
        }
    }
}

fn normalize_page(value: Value) -> Option<String> {
    match value {
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == "N/A" {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    }
}

/// Answer metadata. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    /// The model that produced the answer. Some backends report it as `model`.
    pub fn model(&self) -> Option<&str> {
        self.model_used
            .as_deref()
            .or_else(|| self.extra.get("model").and_then(Value::as_str))
    }

    /// `None` when no cost was reported or it was zero.
    pub fn formatted_cost(&self) -> Option<String> {
        self.cost_usd
            .filter(|cost| *cost != 0.0)
            .map(|cost| format!("${:.4}", cost))
    }

    pub fn is_empty(&self) -> bool {
        self.model_used.is_none() && self.cost_usd.is_none() && self.extra.is_empty()
    }
}
