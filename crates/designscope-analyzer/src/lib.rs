//! Single-shot analysis pipeline: extraction, payload assembly, one model call,
//! response validation. Progress is reported on an event channel so a display
//! surface can show staged status.
//!
//! Callers are expected to keep at most one run in flight. Every event carries
//! the request id of its run, so a caller that issues a new request anyway can
//! drop events from the older one.

use designscope_common::{AnalysisError, ErrorReport, Result};
use designscope_core::{assemble_payload, AnalysisPayload, ImageAttachment, PayloadLimits, SceneGraph};
use designscope_llm::{
    validate_response, AnalysisResult, AnalysisType, CostConfig, CostEstimate, CostEstimator,
    LLMProvider, Priority, PromptBuilder, PromptConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub limits: PayloadLimits,
    pub prompt: PromptConfig,
    pub cost: CostConfig,
    /// Upper bound on the model call alone.
    pub timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            limits: PayloadLimits::default(),
            prompt: PromptConfig::default(),
            cost: CostConfig::default(),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub analysis_type: AnalysisType,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AnalysisEvent {
    #[serde(rename_all = "camelCase")]
    ExtractionStarted { request_id: u64 },
    #[serde(rename_all = "camelCase")]
    PayloadReady {
        request_id: u64,
        node_count: usize,
        estimate: CostEstimate,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        request_id: u64,
        result: AnalysisResult,
    },
    #[serde(rename_all = "camelCase")]
    Failed { request_id: u64, error: ErrorReport },
}

impl AnalysisEvent {
    pub fn request_id(&self) -> u64 {
        match self {
            AnalysisEvent::ExtractionStarted { request_id }
            | AnalysisEvent::PayloadReady { request_id, .. }
            | AnalysisEvent::Completed { request_id, .. }
            | AnalysisEvent::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisEvent::Completed { .. } | AnalysisEvent::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub request_id: u64,
    pub result: AnalysisResult,
    pub estimate: CostEstimate,
    /// Priced from the usage the endpoint reported, when it reported any.
    pub actual: Option<CostEstimate>,
}

pub struct Analyzer {
    provider: Arc<dyn LLMProvider>,
    prompts: PromptBuilder,
    estimator: CostEstimator,
    limits: PayloadLimits,
    timeout: Duration,
    next_request: AtomicU64,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: AnalyzerConfig) -> Self {
        Self {
            provider,
            prompts: PromptBuilder::new(config.prompt),
            estimator: CostEstimator::new(config.cost),
            limits: config.limits,
            timeout: config.timeout,
            next_request: AtomicU64::new(1),
        }
    }

    /// Runs one analysis attempt. Emits `ExtractionStarted` and `PayloadReady` as
    /// the stages finish, then exactly one terminal event mirroring the returned
    /// value. An empty selection fails before anything else is emitted.
    pub async fn run<G: SceneGraph + ?Sized>(
        &self,
        graph: &G,
        selection: &[String],
        images: &[ImageAttachment],
        options: AnalysisOptions,
        events: &UnboundedSender<AnalysisEvent>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome> {
        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst);

        match self
            .attempt(request_id, graph, selection, images, options, events, cancel)
            .await
        {
            Ok(outcome) => {
                info!(
                    "Request {} completed, confidence {:.2}",
                    request_id, outcome.result.confidence
                );
                emit(
                    events,
                    AnalysisEvent::Completed {
                        request_id,
                        result: outcome.result.clone(),
                    },
                );
                Ok(outcome)
            }
            Err(err) => {
                error!("Request {} failed: {}", request_id, err);
                emit(
                    events,
                    AnalysisEvent::Failed {
                        request_id,
                        error: ErrorReport::from(&err),
                    },
                );
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt<G: SceneGraph + ?Sized>(
        &self,
        request_id: u64,
        graph: &G,
        selection: &[String],
        images: &[ImageAttachment],
        options: AnalysisOptions,
        events: &UnboundedSender<AnalysisEvent>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome> {
        if selection.is_empty() {
            return Err(AnalysisError::NoSelection);
        }

        emit(events, AnalysisEvent::ExtractionStarted { request_id });
        let payload = assemble_payload(graph, selection, images, self.limits)?;
        let estimate = self.estimator.estimate(&payload, self.prompts.max_images())?;
        emit(
            events,
            AnalysisEvent::PayloadReady {
                request_id,
                node_count: payload.node_count(),
                estimate,
            },
        );

        let (result, actual) = self.request(&payload, options, cancel).await?;
        Ok(AnalysisOutcome {
            request_id,
            result,
            estimate,
            actual,
        })
    }

    async fn request(
        &self,
        payload: &AnalysisPayload,
        options: AnalysisOptions,
        cancel: &CancellationToken,
    ) -> Result<(AnalysisResult, Option<CostEstimate>)> {
        let blocks = self
            .prompts
            .build(payload, options.analysis_type, options.priority)?;
        debug!(
            "Sending {} content blocks to {} ({:?} timeout)",
            blocks.len(),
            self.provider.model(),
            self.timeout
        );

        let start = Instant::now();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(AnalysisError::network("request cancelled")),
            reply = tokio::time::timeout(self.timeout, self.provider.generate(blocks)) => match reply {
                Ok(response) => response,
                Err(_) => Err(AnalysisError::network(format!(
                    "no response within {}s",
                    self.timeout.as_secs_f64()
                ))),
            },
        };
        let response = outcome?;
        info!("Model replied in {:?}", start.elapsed());

        let result = validate_response(&response.content)?;
        let actual = response.usage.as_ref().map(|u| self.estimator.actual(u));
        Ok((result, actual))
    }
}

fn emit(events: &UnboundedSender<AnalysisEvent>, event: AnalysisEvent) {
    // a closed receiver only means nobody is watching progress
    if events.send(event).is_err() {
        debug!("Progress receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use designscope_common::ErrorKind;
    use designscope_core::JsonDocument;
    use designscope_llm::{ContentBlock, LLMResponse, Usage};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    const DOC: &str = r#"{
        "pages": [{
            "id": "0:1", "name": "Home", "type": "PAGE",
            "children": [
                { "id": "1:1", "name": "Card", "type": "FRAME",
                  "children": [
                      { "id": "1:2", "name": "Submit button", "type": "FRAME" },
                      { "id": "1:3", "name": "Title", "type": "TEXT", "text": { "characters": "Hello" } }
                  ] }
            ]
        }]
    }"#;

    struct MockProvider {
        reply: String,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                reply: "{}".to_string(),
                delay: Some(Duration::from_secs(30)),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        async fn generate(&self, content: Vec<ContentBlock>) -> Result<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!content.is_empty());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(LLMResponse {
                content: self.reply.clone(),
                finish_reason: Some("end_turn".to_string()),
                usage: Some(Usage {
                    prompt_tokens: 1000,
                    completion_tokens: 200,
                    total_tokens: 1200,
                }),
            })
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    fn analyzer(provider: Arc<MockProvider>, timeout: Duration) -> Analyzer {
        Analyzer::new(
            provider,
            AnalyzerConfig {
                timeout,
                ..Default::default()
            },
        )
    }

    fn drain(rx: &mut UnboundedReceiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn selection(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_selection_never_calls_model() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let provider = MockProvider::replying("{}");
        let analyzer = analyzer(provider.clone(), Duration::from_secs(5));
        let (tx, mut rx) = unbounded_channel();

        let err = analyzer
            .run(&doc, &[], &[], AnalysisOptions::default(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, AnalysisError::NoSelection);
        assert_eq!(provider.calls(), 0);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], AnalysisEvent::Failed { error, .. } if error.kind == ErrorKind::NoSelection));
    }

    #[tokio::test]
    async fn test_successful_run_emits_stages_in_order() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let provider = MockProvider::replying(
            r#"Sure. {"feasibility": {"score": 8}, "effort": {"hours": 12}, "confidence": 0.75} Done."#,
        );
        let analyzer = analyzer(provider.clone(), Duration::from_secs(5));
        let (tx, mut rx) = unbounded_channel();

        let outcome = analyzer
            .run(&doc, &selection(&["1:1"]), &[], AnalysisOptions::default(), &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(outcome.result.feasibility.score, 8.0);
        assert_eq!(outcome.result.effort.hours, 12.0);
        assert_eq!(outcome.result.effort.complexity, "medium");
        assert_eq!(outcome.result.confidence, 0.75);
        assert_eq!(outcome.actual.map(|a| a.input_tokens), Some(1000));
        assert!(outcome.estimate.input_tokens > 2000);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], AnalysisEvent::ExtractionStarted { .. }));
        assert!(matches!(events[1], AnalysisEvent::PayloadReady { node_count: 3, .. }));
        assert!(matches!(events[2], AnalysisEvent::Completed { .. }));
        assert!(events.iter().all(|e| e.request_id() == outcome.request_id));
        assert!(events[2].is_terminal());
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let analyzer = analyzer(MockProvider::replying("{}"), Duration::from_secs(5));
        let (tx, _rx) = unbounded_channel();
        let token = CancellationToken::new();

        let first = analyzer
            .run(&doc, &selection(&["1:2"]), &[], AnalysisOptions::default(), &tx, &token)
            .await
            .unwrap();
        let second = analyzer
            .run(&doc, &selection(&["1:3"]), &[], AnalysisOptions::default(), &tx, &token)
            .await
            .unwrap();
        assert!(second.request_id > first.request_id);
    }

    #[tokio::test]
    async fn test_extraction_failure_stops_before_model() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let provider = MockProvider::replying("{}");
        let analyzer = analyzer(provider.clone(), Duration::from_secs(5));
        let (tx, mut rx) = unbounded_channel();

        let err = analyzer
            .run(&doc, &selection(&["9:9"]), &[], AnalysisOptions::default(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Extraction { .. }));
        assert_eq!(provider.calls(), 0);
        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, AnalysisEvent::PayloadReady { .. })));
        assert!(events.last().is_some_and(AnalysisEvent::is_terminal));
    }

    #[tokio::test]
    async fn test_unstructured_reply_is_terminal_error() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let analyzer = analyzer(MockProvider::replying("I cannot help with that."), Duration::from_secs(5));
        let (tx, mut rx) = unbounded_channel();

        let err = analyzer
            .run(&doc, &selection(&["1:1"]), &[], AnalysisOptions::default(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, AnalysisError::NoStructuredContent);
        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(AnalysisEvent::Failed { error, .. }) if error.kind == ErrorKind::NoStructuredContent
        ));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_network_error() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let analyzer = analyzer(MockProvider::hanging(), Duration::from_millis(50));
        let (tx, _rx) = unbounded_channel();

        let err = analyzer
            .run(&doc, &selection(&["1:1"]), &[], AnalysisOptions::default(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Network { status: None, .. }));
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_as_network_error() {
        let doc = JsonDocument::from_json(DOC).unwrap();
        let provider = MockProvider::hanging();
        let analyzer = analyzer(provider, Duration::from_secs(60));
        let (tx, _rx) = unbounded_channel();
        let token = CancellationToken::new();
        token.cancel();

        let err = analyzer
            .run(&doc, &selection(&["1:1"]), &[], AnalysisOptions::default(), &tx, &token)
            .await
            .unwrap_err();
        assert_eq!(err, AnalysisError::network("request cancelled"));
    }

    #[test]
    fn test_event_wire_shape() {
        let event = AnalysisEvent::ExtractionStarted { request_id: 7 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "extractionStarted");
        assert_eq!(json["requestId"], 7);
    }
}
