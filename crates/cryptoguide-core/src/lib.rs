pub mod api;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod message;
pub mod protocol;
pub mod selection;
pub mod suggestions;

// Re-export main types for convenience
pub use api::{AnswerBackend, AnswerEnvelope, HealthStatus, HttpBackend, QueryRequest};
pub use config::Config;
pub use conversation::{Conversation, ConversationStore, Phase};
pub use dispatcher::{PendingQuery, QueryDispatcher, Rejected, SubmitOutcome};
pub use error::{BackendError, SelectionError};
pub use input::InputBuffer;
pub use message::{ChatMessage, ChatRole, Citation, Metadata, FAILURE_ADVISORY};
pub use protocol::Protocol;
pub use selection::ProtocolSelection;
pub use suggestions::{suggestions_for, suggestions_for_selection, Suggestion};
