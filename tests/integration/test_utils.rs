//! Shared test utilities for integration tests
//!
//! A scripted generation service that answers per section key, plus serialized access to
//! the environment for config tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use planwright::error::TransportError;
use planwright::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, TokenUsage,
};
use planwright::retry::{RetryController, RetryPolicy};
use planwright::validate::ValidationPolicy;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Key the prompt asks for, taken from the output contract line.
pub fn requested_key(messages: &[ChatMessage]) -> String {
    let Some(prompt) = messages.last().map(|m| m.content.as_str()) else {
        return String::new();
    };
    let marker = "exactly one key, \"";
    match prompt.find(marker) {
        Some(found) => {
            let start = found + marker.len();
            let end = prompt[start..]
                .find('"')
                .map(|i| start + i)
                .unwrap_or(start);
            prompt[start..end].to_string()
        }
        None => String::new(),
    }
}

/// Replies per section key. Each key replays its script, then repeats the last entry.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Vec<Result<String, TransportError>>>,
    calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, key: &str, reply: &str) -> Self {
        self.script(key, vec![Ok(reply.to_string())])
    }

    pub fn script(mut self, key: &str, replies: Vec<Result<String, TransportError>>) -> Self {
        self.scripts.insert(key.to_string(), replies);
        self
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|(k, _)| k == key).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn prompts_for(&self, key: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .filter_map(|(_, messages)| messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ModelProviderClient for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, TransportError> {
        let key = requested_key(&messages);
        let index = {
            let mut calls = self.calls.lock();
            let index = calls.iter().filter(|(k, _)| *k == key).count();
            calls.push((key.clone(), messages));
            index
        };
        let script = self
            .scripts
            .get(&key)
            .ok_or_else(|| TransportError::RequestFailed(format!("no script for '{}'", key)))?;
        let content = script
            .get(index)
            .or_else(|| script.last())
            .cloned()
            .unwrap_or_else(|| Err(TransportError::InvalidResponse("empty script".into())))?;
        Ok(CompletionResponse {
            content,
            model: "scripted".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Controller with default attempts and backoff against `provider`.
pub fn controller(provider: Arc<ScriptedProvider>) -> RetryController {
    RetryController::new(
        provider,
        CompletionOptions::default(),
        RetryPolicy::default(),
        ValidationPolicy::default(),
    )
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with HOME and XDG_CONFIG_HOME pointed into `test_dir` and `vars` set,
/// restoring the previous environment afterwards.
pub fn with_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let config_home = test_dir.path().join("xdg-config");
    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&config_home).unwrap();
    std::fs::create_dir_all(&home).unwrap();

    let mut touched: Vec<(String, Option<String>)> = Vec::new();
    let mut set = |name: &str, value: &str| {
        touched.push((name.to_string(), std::env::var(name).ok()));
        std::env::set_var(name, value);
    };
    set("HOME", home.to_str().unwrap());
    set("XDG_CONFIG_HOME", config_home.to_str().unwrap());
    for (name, value) in vars {
        set(name, value);
    }

    let result = f();

    for (name, previous) in touched.into_iter().rev() {
        match previous {
            Some(value) => std::env::set_var(&name, value),
            None => std::env::remove_var(&name),
        }
    }
    result
}
