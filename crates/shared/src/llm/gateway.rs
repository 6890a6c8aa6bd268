use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::ConfigError;

use super::anthropic::AnthropicBackend;
use super::backend::{BackendRequest, LlmBackend, LlmConfig, LlmError, ProviderKind};
use super::gemini::GeminiBackend;
use super::openai::OpenAiBackend;
use super::{extract, prompts};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const STRUCTURED_TEMPERATURE: f32 = 0.4;
const REPAIR_TEMPERATURE: f32 = 0.1;
const CHAT_TEMPERATURE: f32 = 0.7;
const STRUCTURED_MAX_TOKENS: u32 = 900;
const CHAT_MAX_TOKENS: u32 = 800;

/// Uniform entry point over the active provider. The backend is resolved
/// once from configuration and held for the process lifetime; credentials
/// are still checked lazily, per call, inside the backend.
#[derive(Clone)]
pub struct LlmGateway {
    backend: Arc<dyn LlmBackend>,
    provider: ProviderKind,
}

impl LlmGateway {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        let provider = config.provider_kind();
        let backend: Arc<dyn LlmBackend> = match provider {
            ProviderKind::OpenAi => Arc::new(OpenAiBackend::new(
                client,
                config.openai_api_key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
            )),
            ProviderKind::Anthropic => Arc::new(AnthropicBackend::new(
                client,
                config.anthropic_api_key.clone(),
                config.anthropic_model.clone(),
            )),
            ProviderKind::Gemini => Arc::new(GeminiBackend::new(
                client,
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            )),
        };

        Ok(Self { backend, provider })
    }

    pub fn new(backend: Arc<dyn LlmBackend>, provider: ProviderKind) -> Self {
        Self { backend, provider }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Generates a structured value for `task`. On a first extraction or
    /// parse failure, exactly one repair call is made through the same
    /// backend; a second failure is `UnparseableOutput`. Never more than two
    /// backend calls.
    pub async fn generate_structured(
        &self,
        task: &str,
        schema_hint: Option<&str>,
    ) -> Result<Value, LlmError> {
        let raw = self
            .backend
            .generate(BackendRequest {
                system_prompt: Some(prompts::STRUCTURED_SYSTEM_PROMPT.to_string()),
                user_prompt: prompts::structured_task_prompt(task, schema_hint),
                temperature: Some(STRUCTURED_TEMPERATURE),
                max_tokens: STRUCTURED_MAX_TOKENS,
            })
            .await?;

        if let Some(value) = extract::try_parse(extract::extract_candidate(&raw)) {
            return Ok(value);
        }

        debug!(
            provider = self.provider.as_str(),
            "first structured attempt did not parse; running repair pass"
        );

        let repaired = self
            .backend
            .generate(BackendRequest {
                system_prompt: Some(prompts::STRUCTURED_SYSTEM_PROMPT.to_string()),
                user_prompt: prompts::repair_prompt(&raw),
                temperature: Some(REPAIR_TEMPERATURE),
                max_tokens: STRUCTURED_MAX_TOKENS,
            })
            .await?;

        extract::try_parse(extract::extract_candidate(&repaired))
            .ok_or(LlmError::UnparseableOutput)
    }

    /// Conversational reply; no extraction, no repair.
    pub async fn generate_freeform(
        &self,
        system_prompt: &str,
        user_context: &str,
    ) -> Result<String, LlmError> {
        self.backend
            .generate(BackendRequest {
                system_prompt: Some(system_prompt.to_string()),
                user_prompt: user_context.to_string(),
                temperature: Some(CHAT_TEMPERATURE),
                max_tokens: CHAT_MAX_TOKENS,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::super::backend::{BackendFuture, BackendRequest, LlmBackend, LlmError, ProviderKind};
    use super::LlmGateway;

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
        prompts_seen: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::from(replies)),
                calls: AtomicUsize::new(0),
                prompts_seen: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LlmBackend for ScriptedBackend {
        fn generate<'a>(&'a self, request: BackendRequest) -> BackendFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts_seen
                .lock()
                .expect("prompt log lock")
                .push(request.user_prompt);
            let reply = self
                .replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse));
            Box::pin(async move { reply })
        }
    }

    fn gateway(backend: Arc<ScriptedBackend>) -> LlmGateway {
        LlmGateway::new(backend, ProviderKind::OpenAi)
    }

    #[tokio::test]
    async fn clean_output_needs_a_single_backend_call() {
        let backend = ScriptedBackend::new(vec![Ok("{\"a\":1}".to_string())]);
        let value = gateway(backend.clone())
            .generate_structured("task", None)
            .await
            .expect("structured value");

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn fenced_output_parses_without_repair() {
        let backend =
            ScriptedBackend::new(vec![Ok("Sure! ```json\n{\"a\":1}\n```".to_string())]);
        let value = gateway(backend.clone())
            .generate_structured("task", None)
            .await
            .expect("structured value");

        assert_eq!(value, json!({"a": 1}));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn repair_pass_recovers_prose_wrapped_output() {
        let backend = ScriptedBackend::new(vec![
            Ok("definitely not json".to_string()),
            Ok("{\"fixed\":true}".to_string()),
        ]);
        let value = gateway(backend.clone())
            .generate_structured("task", None)
            .await
            .expect("repaired value");

        assert_eq!(value, json!({"fixed": true}));
        assert_eq!(backend.call_count(), 2);

        let prompts = backend.prompts_seen.lock().expect("prompt log lock");
        assert!(
            prompts[1].contains("definitely not json"),
            "repair prompt must carry the failing output"
        );
    }

    #[tokio::test]
    async fn two_unparseable_responses_fail_after_exactly_two_calls() {
        let backend = ScriptedBackend::new(vec![
            Ok("no json here".to_string()),
            Ok("still no json".to_string()),
            Ok("{\"never\":\"reached\"}".to_string()),
        ]);
        let err = gateway(backend.clone())
            .generate_structured("task", None)
            .await
            .expect_err("second failure must surface");

        assert!(matches!(err, LlmError::UnparseableOutput));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn backend_errors_propagate_without_repair() {
        let backend = ScriptedBackend::new(vec![Err(LlmError::MissingCredential("AI_API_KEY"))]);
        let err = gateway(backend.clone())
            .generate_structured("task", None)
            .await
            .expect_err("credential error must surface");

        assert!(matches!(err, LlmError::MissingCredential("AI_API_KEY")));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn freeform_reply_passes_text_through() {
        let backend = ScriptedBackend::new(vec![Ok("hello there".to_string())]);
        let reply = gateway(backend.clone())
            .generate_freeform("persona", "User: x\nMessage: hi")
            .await
            .expect("freeform reply");

        assert_eq!(reply, "hello there");
        assert_eq!(backend.call_count(), 1);
    }
}
