//! Per-task state machine.
//!
//! ```text
//! prepare -> submit -> immediate output ----------------------> deliver
//!                   -> pending -> poll -> completed -----------> deliver
//!                                      -> failed / timed out --> abort
//! deliver -> delivered | delivery exhausted
//! ```
//!
//! Every outcome except [`TaskOutcome::Interrupted`] is final for the task:
//! nothing here retries a task as a whole.

use std::sync::Arc;
use std::time::Duration;

use prodgen_core::envelope::{CallbackEnvelope, ImageCallback, ReportCallback, TextCallback};
use prodgen_core::kind::ArtifactKind;
use prodgen_core::task::{Task, TaskInput};
use prodgen_engine::output::{extract_artifact, EngineArtifact};
use prodgen_engine::{EngineStatus, InferenceEngine, SubmitOutcome};
use prodgen_events::CallbackSink;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::poll::{poll_until_terminal, PollOutcome, PollPolicy};
use crate::prompt;
use crate::translate::{to_english_or_original, Translator};

/// Poll policy per artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicies {
    pub text: PollPolicy,
    pub image: PollPolicy,
    pub report: PollPolicy,
}

impl PollPolicies {
    pub fn for_kind(&self, kind: ArtifactKind) -> &PollPolicy {
        match kind {
            ArtifactKind::Text => &self.text,
            ArtifactKind::Image => &self.image,
            ArtifactKind::Report => &self.report,
        }
    }
}

impl Default for PollPolicies {
    /// 2 s interval; 600 s for text, 1200 s for image and report.
    fn default() -> Self {
        let interval = Duration::from_secs(2);
        Self {
            text: PollPolicy::new(interval, Duration::from_secs(600)),
            image: PollPolicy::new(interval, Duration::from_secs(1200)),
            report: PollPolicy::new(interval, Duration::from_secs(1200)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// The submit request failed.
    Submit(String),
    /// The engine reported `failed` or `cancelled`.
    EngineFailed(EngineStatus),
    /// The poll budget ran out.
    TimedOut { attempts: u32 },
    /// The engine finished without a usable artifact.
    EmptyArtifact,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Delivered { attempts: u32 },
    /// Generation succeeded but every callback attempt failed.
    DeliveryExhausted,
    Aborted(AbortReason),
    /// Shutdown interrupted the task before it produced anything.
    Interrupted,
}

/// Engine input plus what the callback needs besides the artifact.
enum Prepared {
    Text { prompt: String },
    Image { name_en: String, prompt: String },
    Report,
}

pub struct TaskProcessor {
    engine: Arc<dyn InferenceEngine>,
    translator: Arc<dyn Translator>,
    callbacks: Arc<dyn CallbackSink>,
    policies: PollPolicies,
}

impl TaskProcessor {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        translator: Arc<dyn Translator>,
        callbacks: Arc<dyn CallbackSink>,
        policies: PollPolicies,
    ) -> Self {
        Self {
            engine,
            translator,
            callbacks,
            policies,
        }
    }

    /// Drive one task to a final outcome.
    pub async fn process(&self, task: &Task, cancel: &CancellationToken) -> TaskOutcome {
        let kind = task.kind();
        let job_id = &task.job_id;
        let started = Instant::now();

        let (engine_input, prepared) = self.prepare(task).await;

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TaskOutcome::Interrupted,
            result = self.engine.submit(kind, &engine_input) => result,
        };

        let output = match submitted {
            Ok(SubmitOutcome::Immediate(output)) => {
                tracing::info!(job_id = %job_id, kind = kind.as_str(), "Engine answered inline");
                output
            }
            Ok(SubmitOutcome::Pending(handle)) => {
                tracing::info!(
                    job_id = %job_id,
                    kind = kind.as_str(),
                    task_id = %handle.task_id,
                    "Engine task queued, polling",
                );
                let policy = self.policies.for_kind(kind);
                match poll_until_terminal(self.engine.as_ref(), &handle, policy, job_id, cancel).await {
                    PollOutcome::Completed(output) => output,
                    PollOutcome::Failed(status) => {
                        return abort(task, started, AbortReason::EngineFailed(status));
                    }
                    PollOutcome::TimedOut { attempts } => {
                        return abort(task, started, AbortReason::TimedOut { attempts });
                    }
                    PollOutcome::Interrupted => return TaskOutcome::Interrupted,
                }
            }
            Err(e) => return abort(task, started, AbortReason::Submit(e.to_string())),
        };

        let Some(envelope) =
            extract_artifact(kind, &output).and_then(|artifact| build_envelope(task, prepared, artifact))
        else {
            return abort(task, started, AbortReason::EmptyArtifact);
        };

        match self.callbacks.deliver(&envelope).await {
            Ok(attempts) => TaskOutcome::Delivered { attempts },
            Err(_) => TaskOutcome::DeliveryExhausted,
        }
    }

    async fn prepare(&self, task: &Task) -> (serde_json::Value, Prepared) {
        match &task.input {
            TaskInput::Text(input) => {
                let prompt = prompt::text_prompt(input);
                (prompt::text_engine_input(&prompt), Prepared::Text { prompt })
            }
            TaskInput::Image(input) => {
                let name_en = to_english_or_original(self.translator.as_ref(), &input.product_name).await;
                let prompt = prompt::image_prompt(&name_en);
                let engine_input = prompt::image_engine_input(&prompt, task.user_id, &input.product_name);
                (engine_input, Prepared::Image { name_en, prompt })
            }
            TaskInput::Report(input) => (prompt::report_engine_input(&input.query), Prepared::Report),
        }
    }
}

fn abort(task: &Task, started: Instant, reason: AbortReason) -> TaskOutcome {
    tracing::error!(
        job_id = %task.job_id,
        kind = task.kind().as_str(),
        reason = ?reason,
        elapsed_secs = started.elapsed().as_secs(),
        "Task abandoned, no result will be delivered",
    );
    TaskOutcome::Aborted(reason)
}

/// `None` only if the artifact does not belong to the task's kind.
fn build_envelope(task: &Task, prepared: Prepared, artifact: EngineArtifact) -> Option<CallbackEnvelope> {
    let job_id = task.job_id.clone();
    let user_id = task.user_id;
    let envelope = match (&task.input, prepared, artifact) {
        (TaskInput::Text(input), Prepared::Text { prompt }, EngineArtifact::Text { description }) => {
            CallbackEnvelope::Text(TextCallback {
                job_id,
                user_id,
                product_name: input.product_name.clone(),
                category: input.category.clone(),
                price: input.price,
                keywords: input.keywords.clone(),
                tone: input.tone.clone(),
                prompt,
                description,
            })
        }
        (
            TaskInput::Image(input),
            Prepared::Image { name_en, prompt },
            EngineArtifact::Image { image_base64 },
        ) => CallbackEnvelope::Image(ImageCallback {
            job_id,
            user_id,
            product_name_ko: input.product_name.clone(),
            product_name_en: name_en,
            prompt,
            image_base64,
        }),
        (
            TaskInput::Report(input),
            Prepared::Report,
            EngineArtifact::Report { result, web_results },
        ) => CallbackEnvelope::Report(ReportCallback {
            job_id,
            user_id,
            query: input.query.clone(),
            result,
            web_results,
        }),
        _ => return None,
    };
    Some(envelope)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use prodgen_core::task::{ImageTaskInput, ReportTaskInput, TextTaskInput};
    use prodgen_core::types::JobId;
    use prodgen_engine::{EngineError, PendingHandle, StatusResponse};
    use prodgen_events::CallbackError;

    use super::*;
    use crate::translate::TranslateError;

    // ---- fakes ----

    enum Submit {
        Immediate(serde_json::Value),
        Pending,
        Fail,
    }

    struct FakeEngine {
        submit: Submit,
        /// Status returned by every poll.
        poll_status: EngineStatus,
        poll_output: serde_json::Value,
        inputs: Mutex<Vec<serde_json::Value>>,
        polls: AtomicU32,
    }

    impl FakeEngine {
        fn new(submit: Submit, poll_status: EngineStatus, poll_output: serde_json::Value) -> Self {
            Self {
                submit,
                poll_status,
                poll_output,
                inputs: Mutex::new(Vec::new()),
                polls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl InferenceEngine for FakeEngine {
        async fn submit(
            &self,
            kind: ArtifactKind,
            input: &serde_json::Value,
        ) -> Result<SubmitOutcome, EngineError> {
            self.inputs.lock().unwrap().push(input.clone());
            match &self.submit {
                Submit::Immediate(output) => Ok(SubmitOutcome::Immediate(output.clone())),
                Submit::Pending => Ok(SubmitOutcome::Pending(PendingHandle {
                    kind,
                    task_id: "t-1".into(),
                    status: EngineStatus::Queued,
                    poll_url: "http://engine/status/t-1".into(),
                })),
                Submit::Fail => Err(EngineError::ApiError {
                    status: 500,
                    body: "down".into(),
                }),
            }
        }

        async fn poll(&self, _handle: &PendingHandle) -> Result<StatusResponse, EngineError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusResponse {
                id: Some("t-1".into()),
                status: self.poll_status,
                output: Some(self.poll_output.clone()),
            })
        }
    }

    struct FakeTranslator {
        fail: bool,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn to_english(&self, text: &str) -> Result<String, TranslateError> {
            if self.fail {
                return Err(TranslateError::Empty);
            }
            Ok(match text {
                "소보로빵" => "Soboro bread".to_string(),
                other => other.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        delivered: Mutex<Vec<CallbackEnvelope>>,
    }

    #[async_trait]
    impl CallbackSink for RecordingSink {
        async fn deliver(&self, envelope: &CallbackEnvelope) -> Result<u32, CallbackError> {
            if self.fail {
                return Err(CallbackError::Exhausted {
                    attempts: 3,
                    last_error: "HTTP 503".into(),
                });
            }
            self.delivered.lock().unwrap().push(envelope.clone());
            Ok(1)
        }
    }

    // ---- helpers ----

    fn processor(
        engine: Arc<FakeEngine>,
        sink: Arc<RecordingSink>,
        translator_fails: bool,
    ) -> TaskProcessor {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(10));
        TaskProcessor::new(
            engine,
            Arc::new(FakeTranslator { fail: translator_fails }),
            sink,
            PollPolicies {
                text: policy,
                image: policy,
                report: policy,
            },
        )
    }

    fn text_task() -> Task {
        Task::new(
            JobId::from("job-1"),
            7,
            TaskInput::Text(TextTaskInput {
                product_name: "소보로빵".into(),
                category: "베이커리".into(),
                price: 3500,
                keywords: vec!["고소한".into()],
                tone: "친근한".into(),
            }),
        )
    }

    fn image_task() -> Task {
        Task::new(
            JobId::from("job-1"),
            7,
            TaskInput::Image(ImageTaskInput {
                product_name: "소보로빵".into(),
            }),
        )
    }

    fn report_task() -> Task {
        Task::new(
            JobId::from("report_1"),
            7,
            TaskInput::Report(ReportTaskInput {
                query: "베이커리 시장 동향".into(),
            }),
        )
    }

    // ---- tests ----

    #[tokio::test(start_paused = true)]
    async fn immediate_text_is_delivered_with_prompt() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Immediate(serde_json::json!({"description": "바삭하고 고소한 소보로빵"})),
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine.clone(), sink.clone(), false)
            .process(&text_task(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, TaskOutcome::Delivered { attempts: 1 });
        assert_eq!(engine.polls.load(Ordering::SeqCst), 0);

        let input = engine.inputs.lock().unwrap()[0].clone();
        assert!(input["text"].as_str().unwrap().contains("가격: 3,500원"));

        let delivered = sink.delivered.lock().unwrap();
        let CallbackEnvelope::Text(cb) = &delivered[0] else {
            panic!("expected a text envelope");
        };
        assert_eq!(cb.description, "바삭하고 고소한 소보로빵");
        assert_eq!(cb.prompt, input["text"].as_str().unwrap());
        assert_eq!(cb.price, 3500);
    }

    #[tokio::test(start_paused = true)]
    async fn async_image_is_polled_translated_and_stripped() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Pending,
            EngineStatus::Completed,
            serde_json::json!({"image_base64": "data:image/png;base64,aGVsbG8="}),
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine.clone(), sink.clone(), false)
            .process(&image_task(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, TaskOutcome::Delivered { attempts: 1 });
        assert_eq!(engine.polls.load(Ordering::SeqCst), 1);

        let input = engine.inputs.lock().unwrap()[0].clone();
        assert_eq!(input["korean_text"], "소보로빵");
        assert_eq!(input["user_id"], 7);

        let delivered = sink.delivered.lock().unwrap();
        let CallbackEnvelope::Image(cb) = &delivered[0] else {
            panic!("expected an image envelope");
        };
        assert_eq!(cb.product_name_en, "Soboro bread");
        assert_eq!(cb.product_name_ko, "소보로빵");
        assert!(cb.prompt.contains("Soboro bread"));
        assert_eq!(cb.image_base64, "aGVsbG8=");
    }

    #[tokio::test(start_paused = true)]
    async fn translation_failure_falls_back_to_korean_name() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Immediate(serde_json::json!({"image": "aGVsbG8="})),
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        processor(engine, sink.clone(), true)
            .process(&image_task(), &CancellationToken::new())
            .await;

        let delivered = sink.delivered.lock().unwrap();
        let CallbackEnvelope::Image(cb) = &delivered[0] else {
            panic!("expected an image envelope");
        };
        assert_eq!(cb.product_name_en, "소보로빵");
    }

    #[tokio::test(start_paused = true)]
    async fn report_carries_query_and_web_results() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Pending,
            EngineStatus::Completed,
            serde_json::json!({"result": "보고서", "web_results": "links"}),
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine, sink.clone(), false)
            .process(&report_task(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, TaskOutcome::Delivered { attempts: 1 });
        let delivered = sink.delivered.lock().unwrap();
        assert_matches!(
            &delivered[0],
            CallbackEnvelope::Report(cb) if cb.query == "베이커리 시장 동향" && cb.web_results == "links"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_engine_is_abandoned_after_budget() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Pending,
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine.clone(), sink.clone(), false)
            .process(&image_task(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, TaskOutcome::Aborted(AbortReason::TimedOut { attempts: 5 }));
        assert_eq!(engine.polls.load(Ordering::SeqCst), 5);
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn engine_failure_sends_no_callback() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Pending,
            EngineStatus::Failed,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine, sink.clone(), false)
            .process(&text_task(), &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            TaskOutcome::Aborted(AbortReason::EngineFailed(EngineStatus::Failed))
        );
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_error_aborts() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Fail,
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine, sink.clone(), false)
            .process(&text_task(), &CancellationToken::new())
            .await;

        assert_matches!(outcome, TaskOutcome::Aborted(AbortReason::Submit(msg)) if msg.contains("500"));
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_artifact_is_a_failure() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Immediate(serde_json::json!({"description": ""})),
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        let outcome = processor(engine, sink.clone(), false)
            .process(&text_task(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, TaskOutcome::Aborted(AbortReason::EmptyArtifact));
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_delivery_is_reported() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Immediate(serde_json::json!({"text": "t"})),
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let outcome = processor(engine, sink, false)
            .process(&text_task(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, TaskOutcome::DeliveryExhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_polling() {
        let engine = Arc::new(FakeEngine::new(
            Submit::Pending,
            EngineStatus::InProgress,
            serde_json::Value::Null,
        ));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let outcome = processor(engine.clone(), sink.clone(), false)
            .process(&image_task(), &cancel)
            .await;

        assert_eq!(outcome, TaskOutcome::Interrupted);
        assert_eq!(engine.polls.load(Ordering::SeqCst), 1);
        assert!(sink.delivered.lock().unwrap().is_empty());
    }
}
