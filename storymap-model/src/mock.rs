use crate::provider::user_prompt;
use crate::{ChatRequest, Outcome, Provider, ProviderRequest, TaskType};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted provider for tests.
///
/// Outcomes are returned in order; the last one repeats once the script is
/// exhausted.
pub struct MockProvider {
    name: String,
    model: String,
    available: bool,
    native_json: bool,
    script: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            model: format!("{name}-model"),
            name,
            available: true,
            native_json: true,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_native_json(mut self, native_json: bool) -> Self {
        self.native_json = native_json;
        self
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.with_outcome(Outcome::Success(text.into()))
    }

    #[must_use]
    pub fn with_outcome(self, outcome: Outcome) -> Self {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(outcome);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn model_for(&self, _task: TaskType) -> &str {
        &self.model
    }

    fn supports_native_json(&self) -> bool {
        self.native_json
    }

    fn build_request(&self, request: &ChatRequest, task: TaskType) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            timeout: request.timeout,
            body: json!({
                "task": task.as_str(),
                "system": request.system,
                "user": user_prompt(request, self.native_json),
                "temperature": request.temperature,
            }),
        }
    }

    async fn call(&self, request: ProviderRequest) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);

        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match script.len() {
            0 => Outcome::Fatal(format!("mock provider {} has no scripted outcome", self.name)),
            1 => script[0].clone(),
            _ => script.pop_front().unwrap_or_else(|| Outcome::Fatal("empty script".to_string())),
        }
    }
}
