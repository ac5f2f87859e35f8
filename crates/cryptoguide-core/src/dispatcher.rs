//! Turns a question into a backend request and the answer into a message.
//!
//! A submission runs in two halves: [`QueryDispatcher::begin`] validates,
//! records the user turn and claims the single in-flight slot synchronously;
//! [`PendingQuery::run`] performs the call and appends the outcome. Callers
//! that own a UI loop spawn the second half on the runtime.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{AnswerBackend, QueryRequest};
use crate::conversation::ConversationStore;
use crate::input::InputBuffer;
use crate::message::ChatMessage;
use crate::selection::ProtocolSelection;

/// Why a submission was ignored. Not an error: nothing is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    EmptyQuestion,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(Rejected),
    Answered,
    Failed,
}

#[derive(Clone)]
pub struct QueryDispatcher {
    backend: Arc<dyn AnswerBackend>,
    store: ConversationStore,
}

impl QueryDispatcher {
    pub fn new(backend: Arc<dyn AnswerBackend>) -> Self {
        Self::with_store(backend, ConversationStore::new())
    }

    pub fn with_store(backend: Arc<dyn AnswerBackend>, store: ConversationStore) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn AnswerBackend> {
        &self.backend
    }

    /// Admits a submission: appends the user turn and marks the session as
    /// loading. Blank questions and submissions while loading are rejected
    /// and leave the conversation untouched.
    pub fn begin(
        &self,
        question: &str,
        selection: &ProtocolSelection,
    ) -> Result<PendingQuery, Rejected> {
        let message = ChatMessage::user(question).ok_or(Rejected::EmptyQuestion)?;
        let ticket = self.store.try_begin(message).ok_or(Rejected::Busy)?;
        let request = QueryRequest::for_selection(question, selection);

        info!(ticket, endpoint = request.path(), "question dispatched");

        Ok(PendingQuery {
            request,
            backend: Arc::clone(&self.backend),
            guard: InFlight {
                store: self.store.clone(),
                ticket,
                done: false,
            },
        })
    }

    /// Like [`begin`](Self::begin) but takes the question from the input
    /// buffer, which is cleared once the submission is admitted.
    pub fn submit_input(
        &self,
        input: &mut InputBuffer,
        selection: &ProtocolSelection,
    ) -> Result<PendingQuery, Rejected> {
        let pending = self.begin(input.text(), selection)?;
        input.clear();
        Ok(pending)
    }

    /// Runs a whole submission to completion.
    pub async fn submit(&self, question: &str, selection: &ProtocolSelection) -> SubmitOutcome {
        match self.begin(question, selection) {
            Ok(pending) => pending.run().await,
            Err(reason) => {
                debug!(?reason, "submission ignored");
                SubmitOutcome::Rejected(reason)
            }
        }
    }
}

/// An admitted submission whose request has not been sent yet.
///
/// Dropping it, or the future returned by [`run`](Self::run), releases the
/// in-flight slot without adding an answer.
pub struct PendingQuery {
    request: QueryRequest,
    backend: Arc<dyn AnswerBackend>,
    guard: InFlight,
}

impl PendingQuery {
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub async fn run(self) -> SubmitOutcome {
        let PendingQuery {
            request,
            backend,
            guard,
        } = self;

        let (message, outcome) = match backend.ask(&request).await {
            Ok(envelope) => {
                let message = ChatMessage::answer(envelope, request.comparison());
                info!(
                    ticket = guard.ticket,
                    sources = message.sources.len(),
                    "answer received"
                );
                (message, SubmitOutcome::Answered)
            }
            Err(err) => {
                warn!(
                    ticket = guard.ticket,
                    kind = err.kind(),
                    error = %err,
                    "query failed"
                );
                (ChatMessage::error(), SubmitOutcome::Failed)
            }
        };

        guard.complete(message);
        outcome
    }
}

/// Owns the in-flight slot of one ticket. Releases it on drop.
struct InFlight {
    store: ConversationStore,
    ticket: u64,
    done: bool,
}

impl InFlight {
    fn complete(mut self, message: ChatMessage) {
        self.store.complete(self.ticket, message);
        self.done = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.done && self.store.finish(self.ticket) {
            warn!(ticket = self.ticket, "submission abandoned before an answer arrived");
        }
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
