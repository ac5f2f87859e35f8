use super::*;
use crate::api::{AnswerEnvelope, HealthStatus};
use crate::error::BackendError;
use crate::message::{ChatRole, FAILURE_ADVISORY};
use crate::protocol::Protocol;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

type Reply = Result<AnswerEnvelope, BackendError>;

/// Replies from a script and records every request it sees.
#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl ScriptedBackend {
    fn replying(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerBackend for ScriptedBackend {
    async fn ask(&self, request: &QueryRequest) -> Result<AnswerEnvelope, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(status(503)))
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "ok".to_string(),
            pipeline_ready: true,
        })
    }
}

/// Holds every request until the test opens the gate.
struct GatedBackend {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedBackend {
    fn new() -> (Arc<Self>, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::new(Self {
            gate: Mutex::new(Some(rx)),
        });
        (backend, tx)
    }
}

#[async_trait]
impl AnswerBackend for GatedBackend {
    async fn ask(&self, _request: &QueryRequest) -> Result<AnswerEnvelope, BackendError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(envelope(json!({"answer": "released"})))
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Err(status(404))
    }
}

struct PanickingBackend;

#[async_trait]
impl AnswerBackend for PanickingBackend {
    async fn ask(&self, _request: &QueryRequest) -> Result<AnswerEnvelope, BackendError> {
        panic!("backend blew up");
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Err(status(500))
    }
}

fn envelope(value: serde_json::Value) -> AnswerEnvelope {
    serde_json::from_value(value).expect("valid envelope")
}

fn status(code: u16) -> BackendError {
    BackendError::Status {
        url: "http://backend.test/api/query".to_string(),
        status: code,
    }
}

fn compare_selection(selected: Protocol, partner: Protocol) -> ProtocolSelection {
    let mut selection = ProtocolSelection::new(selected);
    selection.toggle_compare();
    selection.set_compare_protocol(partner).expect("distinct protocols");
    selection
}

const AAVE_QUESTION: &str = "What is Aave's liquidation threshold?";

#[tokio::test]
async fn single_query_appends_answer_with_sources() {
    let backend = ScriptedBackend::replying(vec![Ok(envelope(json!({
        "answer": "The threshold is 82.5% for ETH.",
        "sources": [{"document": "Aave V3 Docs", "page": 12, "text": "Liquidation threshold..."}]
    })))]);
    let dispatcher = QueryDispatcher::new(backend.clone());

    let outcome = dispatcher
        .submit(AAVE_QUESTION, &ProtocolSelection::default())
        .await;

    assert_eq!(outcome, SubmitOutcome::Answered);
    assert_eq!(
        backend.requests(),
        vec![QueryRequest::Single {
            question: AAVE_QUESTION.to_string(),
            protocol: Protocol::Aave,
        }]
    );

    let conversation = dispatcher.store().snapshot();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.messages()[0].role, ChatRole::User);
    let answer = &conversation.messages()[1];
    assert_eq!(answer.role, ChatRole::Assistant);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].page.as_deref(), Some("12"));
    assert!(!answer.is_comparison);
    assert!(answer.protocols.is_none());
    assert!(!conversation.is_loading());
}

#[tokio::test]
async fn comparison_query_marks_message_as_comparison() {
    let backend = ScriptedBackend::replying(vec![Ok(envelope(json!({
        "answer": "## Aave\n...\n## Compound\n...",
        "protocols": ["aave", "compound"],
        "sources": [
            {"id": 1, "protocol": "aave", "document": "Aave V3 Docs", "page": 3, "text": "a"},
            {"id": 2, "protocol": "compound", "document": "Compound III", "page": "N/A", "text": "b"}
        ],
        "metadata": {"model_used": "claude-3-haiku", "cost_usd": 0.0021}
    })))]);
    let dispatcher = QueryDispatcher::new(backend.clone());
    let selection = compare_selection(Protocol::Aave, Protocol::Compound);

    let outcome = dispatcher.submit(AAVE_QUESTION, &selection).await;

    assert_eq!(outcome, SubmitOutcome::Answered);
    assert_eq!(
        backend.requests(),
        vec![QueryRequest::Compare {
            question: AAVE_QUESTION.to_string(),
            protocols: [Protocol::Aave, Protocol::Compound],
        }]
    );

    let conversation = dispatcher.store().snapshot();
    let answer = &conversation.messages()[1];
    assert!(answer.is_comparison);
    assert_eq!(answer.protocols, Some([Protocol::Aave, Protocol::Compound]));
    assert_eq!(answer.sources[1].protocol.as_deref(), Some("compound"));
    assert_eq!(answer.sources[1].page, None);
    assert_eq!(answer.metadata.model(), Some("claude-3-haiku"));
}

#[tokio::test]
async fn every_failure_kind_becomes_one_error_message() {
    let failures = vec![
        status(500),
        BackendError::Transport {
            url: "http://backend.test/api/query".to_string(),
            reason: "connection refused".to_string(),
        },
        BackendError::Decode {
            url: "http://backend.test/api/query".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        },
    ];

    for failure in failures {
        let kind = failure.kind();
        let dispatcher = QueryDispatcher::new(ScriptedBackend::replying(vec![Err(failure)]));

        let outcome = dispatcher
            .submit("Why?", &ProtocolSelection::default())
            .await;

        assert_eq!(outcome, SubmitOutcome::Failed, "{}", kind);
        let conversation = dispatcher.store().snapshot();
        assert_eq!(conversation.len(), 2, "{}", kind);
        let error = &conversation.messages()[1];
        assert!(error.is_error);
        assert_eq!(error.content, FAILURE_ADVISORY);
        assert!(error.sources.is_empty());
        assert!(error.metadata.is_empty());
        assert!(!conversation.is_loading(), "{}", kind);
    }
}

#[tokio::test]
async fn blank_question_is_a_no_op() {
    let backend = ScriptedBackend::replying(Vec::new());
    let dispatcher = QueryDispatcher::new(backend.clone());

    let outcome = dispatcher.submit("   ", &ProtocolSelection::default()).await;

    assert_eq!(outcome, SubmitOutcome::Rejected(Rejected::EmptyQuestion));
    assert!(dispatcher.store().is_empty());
    assert!(!dispatcher.store().is_loading());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn user_message_is_visible_before_the_answer_and_blocks_new_submissions() {
    let (backend, gate) = GatedBackend::new();
    let dispatcher = QueryDispatcher::new(backend);
    let selection = ProtocolSelection::default();

    let pending = dispatcher
        .begin("first question", &selection)
        .expect("admitted");
    assert_eq!(dispatcher.store().len(), 1);
    assert!(dispatcher.store().is_loading());

    let task = tokio::spawn(pending.run());

    let second = dispatcher.submit("second question", &selection).await;
    assert_eq!(second, SubmitOutcome::Rejected(Rejected::Busy));
    assert_eq!(dispatcher.store().len(), 1);

    gate.send(()).expect("gate open");
    assert_eq!(task.await.expect("join"), SubmitOutcome::Answered);

    let conversation = dispatcher.store().snapshot();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.messages()[1].content, "released");
    assert!(!conversation.is_loading());
}

#[tokio::test]
async fn submit_input_drains_buffer_only_when_admitted() {
    let (backend, gate) = GatedBackend::new();
    let dispatcher = QueryDispatcher::new(backend);
    let selection = ProtocolSelection::default();

    let mut input = InputBuffer::new();
    input.stage("How are swap fees calculated in Uniswap?");
    let pending = dispatcher
        .submit_input(&mut input, &selection)
        .expect("admitted");
    assert_eq!(input.text(), "");
    assert_eq!(pending.request().question(), "How are swap fees calculated in Uniswap?");

    input.stage("typed while waiting");
    assert_eq!(
        dispatcher.submit_input(&mut input, &selection).err(),
        Some(Rejected::Busy)
    );
    assert_eq!(input.text(), "typed while waiting");

    gate.send(()).expect("gate open");
    pending.run().await;
    assert_eq!(dispatcher.store().len(), 2);
}

#[tokio::test]
async fn dropping_a_pending_query_releases_the_slot() {
    let backend = ScriptedBackend::replying(Vec::new());
    let dispatcher = QueryDispatcher::new(backend.clone());

    let pending = dispatcher
        .begin("never sent", &ProtocolSelection::default())
        .expect("admitted");
    drop(pending);

    assert!(!dispatcher.store().is_loading());
    assert_eq!(dispatcher.store().len(), 1);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn panicking_backend_still_clears_loading() {
    let dispatcher = QueryDispatcher::new(Arc::new(PanickingBackend));

    let pending = dispatcher
        .begin("boom", &ProtocolSelection::default())
        .expect("admitted");
    let result = tokio::spawn(pending.run()).await;

    assert!(result.is_err());
    assert!(!dispatcher.store().is_loading());
}

#[tokio::test]
async fn answers_follow_submission_order() {
    let backend = ScriptedBackend::replying(vec![
        Ok(envelope(json!({"answer": "one"}))),
        Err(status(502)),
        Ok(envelope(json!({"answer": "three"}))),
    ]);
    let dispatcher = QueryDispatcher::new(backend);
    let selection = ProtocolSelection::default();

    for question in ["q1", "q2", "q3"] {
        dispatcher.submit(question, &selection).await;
    }

    let conversation = dispatcher.store().snapshot();
    let contents: Vec<_> = conversation
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(
        contents,
        vec!["q1", "one", "q2", FAILURE_ADVISORY, "q3", "three"]
    );
}
