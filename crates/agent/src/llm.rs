use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tiller_core::config::GenerationConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: u32,
    /// In `0.0..=2.0`.
    pub temperature: f32,
    /// In `(0.0, 1.0]`.
    pub top_p: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, sampling: &GenerationConfig) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens: sampling.max_new_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
        }
    }
}

/// Failures a generation engine reports in a way the runtime can classify.
/// Anything else returned from [`GenerationPort::generate`] is treated as a
/// generic generation failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
}

/// The text-generation engine. One call per turn; the returned text is the
/// whole completion, however the engine produces it internally.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Engine with nothing loaded. Every call fails as unavailable.
#[derive(Clone, Debug)]
pub struct UnavailableGenerator {
    message: String,
}

impl Default for UnavailableGenerator {
    fn default() -> Self {
        Self { message: "no generation model is loaded".to_string() }
    }
}

impl UnavailableGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl GenerationPort for UnavailableGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        Err(GenerationError::Unavailable(self.message.clone()).into())
    }
}

/// Wraps a synchronous engine and runs each call on tokio's blocking pool so
/// the awaiting task's executor thread stays free.
pub struct BlockingGenerator<F> {
    engine: Arc<F>,
}

impl<F> BlockingGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static,
{
    pub fn new(engine: F) -> Self {
        Self { engine: Arc::new(engine) }
    }
}

#[async_trait]
impl<F> GenerationPort for BlockingGenerator<F>
where
    F: Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static,
{
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let engine = Arc::clone(&self.engine);
        let request = request.clone();
        tokio::task::spawn_blocking(move || engine(&request))
            .await
            .context("generation worker stopped before returning")?
    }
}

/// Replays canned engine results in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    script: Arc<Mutex<VecDeque<Result<String, GenerationError>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::default();
        for output in outputs {
            generator.push_output(output);
        }
        generator
    }

    pub fn push_output(&self, output: impl Into<String>) {
        lock(&self.script).push_back(Ok(output.into()));
    }

    pub fn push_failure(&self, error: GenerationError) {
        lock(&self.script).push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl GenerationPort for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.script).pop_front().unwrap_or_else(|| {
            Err(GenerationError::Unavailable("scripted generator has no output left".to_string()))
        });
        next.map_err(Into::into)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use tiller_core::config::GenerationConfig;

    use super::{
        BlockingGenerator, GenerationError, GenerationPort, GenerationRequest, ScriptedGenerator,
        UnavailableGenerator,
    };

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(
            prompt,
            &GenerationConfig { max_new_tokens: 64, temperature: 0.2, top_p: 0.95 },
        )
    }

    #[tokio::test]
    async fn scripted_generator_replays_in_order_and_records_requests() {
        let generator = ScriptedGenerator::new(["first", "second"]);

        assert_eq!(generator.generate(&request("a")).await.expect("first output"), "first");
        assert_eq!(generator.generate(&request("b")).await.expect("second output"), "second");

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].prompt, "b");
        assert_eq!(requests[1].max_new_tokens, 64);
    }

    #[tokio::test]
    async fn exhausted_script_reports_unavailable() {
        let generator = ScriptedGenerator::default();
        let error = generator.generate(&request("a")).await.expect_err("script is empty");
        assert!(matches!(
            error.downcast_ref::<GenerationError>(),
            Some(GenerationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_generator_always_fails() {
        let error = UnavailableGenerator::new("weights not loaded")
            .generate(&request("a"))
            .await
            .expect_err("nothing is loaded");
        assert_eq!(error.to_string(), "weights not loaded");
    }

    #[tokio::test]
    async fn blocking_generator_runs_engine_off_the_async_thread() {
        let generator = BlockingGenerator::new(|request: &GenerationRequest| {
            Ok(format!("echo:{}:{}", request.prompt, request.max_new_tokens))
        });
        let output = generator.generate(&request("hi")).await.expect("engine output");
        assert_eq!(output, "echo:hi:64");
    }

    #[tokio::test]
    async fn blocking_generator_propagates_engine_errors() {
        let generator =
            BlockingGenerator::new(|_: &GenerationRequest| Err(anyhow!("cuda out of memory")));
        let error = generator.generate(&request("hi")).await.expect_err("engine fails");
        assert!(error.to_string().contains("cuda out of memory"));
    }
}
