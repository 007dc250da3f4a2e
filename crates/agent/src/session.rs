//! A conversation: one transcript fed through the loop one message at a time.

use taskloom_core::transcript::{Entry, Transcript};

use crate::evaluator::{Evaluation, EvaluationLoop};

pub struct Session {
    agent: EvaluationLoop,
    transcript: Transcript,
}

impl Session {
    /// Start a session. A non-empty system prompt becomes the first entry.
    pub fn new(agent: EvaluationLoop, system_prompt: Option<&str>) -> Self {
        let mut transcript = Transcript::new();
        if let Some(prompt) = system_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            transcript.push(Entry::system(prompt));
        }
        Self { agent, transcript }
    }

    pub async fn send(&mut self, input: &str) -> Evaluation {
        self.agent.evaluate(input, &mut self.transcript).await
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn agent(&self) -> &EvaluationLoop {
        &self.agent
    }
}
