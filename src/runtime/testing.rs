//! Mock implementations for testing
//!
//! These mocks enable orchestrator testing without real I/O.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text reply
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::text(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next(request)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Service (for busy/cancellation testing)
// ============================================================================

/// Mock LLM service with configurable delay
pub struct DelayedMockLlmService {
    inner: MockLlmService,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmService {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmService::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_text(&self, text: &str) {
        self.inner.queue_text(text);
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmService for DelayedMockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        // Record now, answer after the delay
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Tests
// ============================================================================

mod tests {
    use super::*;
    use crate::llm::{GenerationConfig, LlmErrorKind, LlmMessage, Usage};
    use crate::runtime::{TurnError, TurnOrchestrator};
    use crate::session::SessionHandle;
    use crate::state_machine::TurnState;
    use crate::transcript::Speaker;

    fn orchestrator(llm: Arc<dyn LlmService>) -> TurnOrchestrator {
        TurnOrchestrator::new(llm, GenerationConfig::default(), Duration::from_secs(5))
    }

    fn texts(session: &SessionHandle) -> Vec<(Speaker, String)> {
        session
            .snapshot()
            .into_iter()
            .map(|t| (t.speaker, t.text))
            .collect()
    }

    #[tokio::test]
    async fn test_mock_llm_service() {
        let mock = MockLlmService::new("test-model");
        mock.queue_text("Hello");

        let request = LlmRequest {
            history: vec![],
            message: "hi".to_string(),
            config: GenerationConfig::default(),
        };

        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello");
        assert!(response.end_turn);

        // Second call should fail (no more responses)
        let result = mock.complete(&request).await;
        assert!(result.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    /// Empty transcript, one successful turn
    #[tokio::test]
    async fn test_hello_scenario() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_text("hi there");
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let reply = orch.handle_user_message(&session, "hello").await.unwrap();

        assert_eq!(reply.text, "hi there");
        assert!(!reply.partial);
        assert_eq!(
            texts(&session),
            vec![
                (Speaker::User, "hello".to_string()),
                (Speaker::Assistant, "hi there".to_string()),
            ]
        );

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].message, "hello");
        assert_eq!(requests[0].config, GenerationConfig::default());
    }

    /// Two turns in the transcript, then a network failure
    #[tokio::test]
    async fn test_network_failure_leaves_transcript_unchanged() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_text("hi there");
        llm.queue_error(LlmError::network("Connection failed"));
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        orch.handle_user_message(&session, "hello").await.unwrap();
        let before = session.snapshot();
        assert_eq!(before.len(), 2);

        let err = orch
            .handle_user_message(&session, "are you there?")
            .await
            .unwrap_err();

        match err {
            TurnError::Generation(e) => assert_eq!(e.kind, LlmErrorKind::Network),
            other => panic!("Expected generation error, got {other:?}"),
        }
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_call() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let err = orch.handle_user_message(&session, "").await.unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));

        let err = orch.handle_user_message(&session, "   ").await.unwrap_err();
        assert!(matches!(err, TurnError::Validation(_)));

        assert!(session.snapshot().is_empty());
        assert!(llm.recorded_requests().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_history_role_mapping_in_order() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_text("hi there");
        llm.queue_text("I'm fine");
        llm.queue_text("bye!");
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        orch.handle_user_message(&session, "hello").await.unwrap();
        orch.handle_user_message(&session, "how are you?").await.unwrap();
        orch.handle_user_message(&session, "bye").await.unwrap();

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[2].history,
            vec![
                LlmMessage::user("hello"),
                LlmMessage::model("hi there"),
                LlmMessage::user("how are you?"),
                LlmMessage::model("I'm fine"),
            ]
        );
        assert_eq!(requests[2].message, "bye");

        // History always matches the transcript as it was before the message
        for (i, request) in requests.iter().enumerate() {
            assert_eq!(request.history.len(), i * 2);
        }
    }

    #[tokio::test]
    async fn test_order_preserved_across_many_turns() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        for i in 0..10 {
            llm.queue_text(&format!("reply {i}"));
        }
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        for i in 0..10 {
            orch.handle_user_message(&session, &format!("message {i}"))
                .await
                .unwrap();
        }

        let turns = texts(&session);
        assert_eq!(turns.len(), 20);
        for (i, pair) in turns.chunks(2).enumerate() {
            assert_eq!(pair[0], (Speaker::User, format!("message {i}")));
            assert_eq!(pair[1], (Speaker::Assistant, format!("reply {i}")));
        }
    }

    #[tokio::test]
    async fn test_stopped_early_partial_is_committed() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_error(LlmError::stopped_early("SAFETY", "Here is half of"));
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let reply = orch.handle_user_message(&session, "tell me").await.unwrap();

        assert_eq!(reply.text, "Here is half of");
        assert!(reply.partial);
        assert_eq!(
            texts(&session),
            vec![
                (Speaker::User, "tell me".to_string()),
                (Speaker::Assistant, "Here is half of".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stopped_early_without_text_fails() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_error(LlmError::stopped_early("SAFETY", ""));
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let err = orch.handle_user_message(&session, "tell me").await.unwrap_err();

        match err {
            TurnError::Generation(e) => assert_eq!(e.kind, LlmErrorKind::StoppedEarly),
            other => panic!("Expected generation error, got {other:?}"),
        }
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_max_tokens_reply_marked_partial() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_response(LlmResponse {
            text: "a very long".to_string(),
            end_turn: false,
            usage: Usage {
                input_tokens: 4,
                output_tokens: 8192,
            },
        });
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let reply = orch.handle_user_message(&session, "write a lot").await.unwrap();
        assert!(reply.partial);
        assert_eq!(reply.usage.output_tokens, 8192);
        assert_eq!(session.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_is_rejected() {
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_text("");
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let err = orch.handle_user_message(&session, "hello").await.unwrap_err();
        assert!(matches!(err, TurnError::Generation(_)));
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_second_message_while_awaiting_is_busy() {
        let llm = Arc::new(DelayedMockLlmService::new(
            "test-model",
            Duration::from_millis(200),
        ));
        llm.queue_text("first reply");
        let orch = Arc::new(orchestrator(llm.clone()));
        let session = SessionHandle::new();

        let first = tokio::spawn({
            let orch = orch.clone();
            let session = session.clone();
            async move { orch.handle_user_message(&session, "first").await }
        });
        llm.request_started.notified().await;

        let err = orch.handle_user_message(&session, "second").await.unwrap_err();
        assert!(matches!(err, TurnError::Busy));

        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.text, "first reply");
        assert_eq!(
            texts(&session),
            vec![
                (Speaker::User, "first".to_string()),
                (Speaker::Assistant, "first reply".to_string()),
            ]
        );
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_abandons_in_flight_turn() {
        let llm = Arc::new(DelayedMockLlmService::new(
            "test-model",
            Duration::from_secs(10),
        ));
        llm.queue_text("never seen");
        let orch = Arc::new(orchestrator(llm.clone()));
        let session = SessionHandle::new();

        let turn = tokio::spawn({
            let orch = orch.clone();
            let session = session.clone();
            async move { orch.handle_user_message(&session, "hello").await }
        });
        llm.request_started.notified().await;
        assert!(session.is_busy());

        session.cancel();

        let err = turn.await.unwrap().unwrap_err();
        assert!(matches!(err, TurnError::Abandoned));
        assert!(session.snapshot().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_reset_abandons_in_flight_turn() {
        let llm = Arc::new(DelayedMockLlmService::new(
            "test-model",
            Duration::from_secs(10),
        ));
        let orch = Arc::new(orchestrator(llm.clone()));
        let session = SessionHandle::new();
        let old_id = session.id();

        let turn = tokio::spawn({
            let orch = orch.clone();
            let session = session.clone();
            async move { orch.handle_user_message(&session, "hello").await }
        });
        llm.request_started.notified().await;

        let new_id = session.reset();
        assert_ne!(old_id, new_id);

        let err = turn.await.unwrap().unwrap_err();
        assert!(matches!(err, TurnError::Abandoned));
        assert!(session.snapshot().is_empty());
        assert_eq!(session.id(), new_id);
    }

    #[tokio::test]
    async fn test_timeout_is_generation_error() {
        let llm = Arc::new(DelayedMockLlmService::new(
            "test-model",
            Duration::from_secs(10),
        ));
        llm.queue_text("too slow");
        let orch = TurnOrchestrator::new(
            llm.clone(),
            GenerationConfig::default(),
            Duration::from_millis(50),
        );
        let session = SessionHandle::new();

        let err = orch.handle_user_message(&session, "hello").await.unwrap_err();

        match err {
            TurnError::Generation(e) => assert_eq!(e.kind, LlmErrorKind::Network),
            other => panic!("Expected generation error, got {other:?}"),
        }
        assert!(session.snapshot().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_turn_returns_session_to_idle() {
        let llm = Arc::new(DelayedMockLlmService::new(
            "test-model",
            Duration::from_secs(10),
        ));
        let orch = orchestrator(llm.clone());
        let session = SessionHandle::new();

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            orch.handle_user_message(&session, "hello"),
        )
        .await;
        assert!(result.is_err());

        assert_eq!(session.state(), TurnState::Idle);
        assert!(session.snapshot().is_empty());

        // The session is usable again
        let llm = Arc::new(MockLlmService::new("test-model"));
        llm.queue_text("hi");
        let orch = orchestrator(llm);
        orch.handle_user_message(&session, "hello again").await.unwrap();
        assert_eq!(session.snapshot().len(), 2);
    }
}
