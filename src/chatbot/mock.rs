//! Scripted provider for tests, with call counting.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::chatbot::provider::{Prompt, Provider, ProviderError, ProviderErrorKind, TextStream};

#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(ProviderErrorKind),
    /// Stream these fragments, then optionally fail.
    Fragments(Vec<String>, Option<ProviderErrorKind>),
    Panic,
}

impl Step {
    pub fn reply(text: &str) -> Self {
        Step::Reply(text.to_string())
    }

    pub fn fragments(parts: &[&str], then: Option<ProviderErrorKind>) -> Self {
        Step::Fragments(parts.iter().map(|p| p.to_string()).collect(), then)
    }
}

pub struct ScriptedProvider {
    id: String,
    streaming: bool,
    script: Mutex<VecDeque<Step>>,
    /// Used once the script runs out.
    fallback: Step,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    pub fn new(id: &str, fallback: Step) -> Self {
        Self {
            id: id.to_string(),
            streaming: false,
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn then(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }

    fn next_step(&self, prompt: &Prompt) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn error(&self, kind: ProviderErrorKind) -> ProviderError {
        ProviderError::new(&self.id, kind, format!("scripted {kind:?} failure"))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn streaming(&self) -> bool {
        self.streaming
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        match self.next_step(prompt) {
            Step::Reply(text) => Ok(text),
            Step::Fail(kind) => Err(self.error(kind)),
            Step::Fragments(parts, _) => Ok(parts.concat()),
            Step::Panic => panic!("scripted panic"),
        }
    }

    fn generate_stream<'a>(&'a self, prompt: &'a Prompt) -> TextStream<'a> {
        let items: Vec<Result<String, ProviderError>> = match self.next_step(prompt) {
            Step::Reply(text) => vec![Ok(text)],
            Step::Fail(kind) => vec![Err(self.error(kind))],
            Step::Fragments(parts, then) => parts
                .into_iter()
                .map(Ok)
                .chain(then.map(|kind| Err(self.error(kind))))
                .collect(),
            Step::Panic => panic!("scripted panic"),
        };
        Box::pin(futures::stream::iter(items))
    }
}
