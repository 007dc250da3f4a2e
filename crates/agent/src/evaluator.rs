//! The evaluation loop — the heart of taskloom.
//!
//! One call to [`EvaluationLoop::evaluate`] handles one user message:
//!
//! 1. **Append** the input to the transcript
//! 2. **Classify** it; `reply` skips straight to step 5
//! 3. **Execute** the chosen action, then every subtask if it produced a plan
//! 4. **Re-evaluate** (optional): render what just happened, ask whether
//!    another action is needed, and execute it; repeat until the classifier
//!    answers `reply` or the round limit is hit
//! 5. **Synthesize** the final reply and append it
//!
//! Every failure along the way degrades instead of aborting, so the
//! transcript always ends with an assistant message that has content.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use taskloom_config::AppConfig;
use taskloom_core::capability::{ActionId, ActionRegistry};
use taskloom_core::event::{DomainEvent, EventBus};
use taskloom_core::provider::{DEFAULT_TIMEOUT, Provider};
use taskloom_core::transcript::{Entry, Transcript};
use tracing::{debug, info, warn};

use crate::classifier::{Intent, IntentClassifier};
use crate::completion::Completion;
use crate::executor::{ActionOutput, Execution, Executor};
use crate::formatter::{Summarizer, render};
use crate::planner::{PlanResult, Planner};

const ANALYZE_PROMPT: &str = "Analyze the above text highlighting the relevant information. If there are errors, suggest solutions to fix them.";

const CLARIFY_PROMPT: &str = "Return an appropriate answer to the user given the context above.";

/// Appended when synthesis itself fails.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I could not produce an answer right now. Please try again.";

/// Behavior switches for the loop.
#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    /// Ask whether another action is needed after acting
    pub re_evaluate: bool,
    /// Summarize intermediate text before feeding it back
    pub postprocess: bool,
    /// Carry earlier subtask results into later subtask instructions
    pub subtask_context: bool,
    pub max_re_evaluations: usize,
    /// Model for classification, planning and argument filling
    pub functions_model: String,
    /// Model for synthesis, analysis and summarization
    pub llm_model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            re_evaluate: false,
            postprocess: false,
            subtask_context: false,
            max_re_evaluations: 5,
            functions_model: "functions".into(),
            llm_model: "gpt-4".into(),
            temperature: 0.1,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EvaluationOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            re_evaluate: config.agent.re_evaluate,
            postprocess: config.agent.postprocess,
            subtask_context: config.agent.subtask_context,
            max_re_evaluations: config.agent.max_re_evaluations,
            functions_model: config.models.functions.clone(),
            llm_model: config.models.llm.clone(),
            temperature: config.temperature,
            timeout: config.request_timeout(),
        }
    }
}

/// What one `evaluate` call did.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The synthesized reply, also the last transcript entry
    pub reply: String,
    /// Every action executed, subtasks included, in order
    pub actions: Vec<ActionId>,
    pub re_evaluation_rounds: usize,
    /// Whether any step fell back to a default
    pub degraded: bool,
}

/// Book-keeping for one top-level call.
#[derive(Default)]
struct Turn {
    actions: Vec<ActionId>,
    rounds: usize,
    degraded: bool,
}

/// The decision-and-execution loop.
pub struct EvaluationLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ActionRegistry>,
    event_bus: Arc<EventBus>,
    options: EvaluationOptions,
}

impl EvaluationLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ActionRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            registry,
            event_bus,
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_re_evaluate(mut self, enabled: bool) -> Self {
        self.options.re_evaluate = enabled;
        self
    }

    pub fn with_postprocess(mut self, enabled: bool) -> Self {
        self.options.postprocess = enabled;
        self
    }

    pub fn with_subtask_context(mut self, enabled: bool) -> Self {
        self.options.subtask_context = enabled;
        self
    }

    /// Set the maximum number of re-evaluation rounds per call. Zero is treated as one.
    pub fn with_max_re_evaluations(mut self, max: usize) -> Self {
        self.options.max_re_evaluations = max.max(1);
        self
    }

    pub fn with_models(mut self, functions: impl Into<String>, llm: impl Into<String>) -> Self {
        self.options.functions_model = functions.into();
        self.options.llm_model = llm.into();
        self
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    fn completion(&self, model: &str) -> Completion {
        Completion::new(self.provider.clone(), model)
            .with_temperature(self.options.temperature)
            .with_timeout(self.options.timeout)
    }

    fn classifier(&self) -> IntentClassifier {
        IntentClassifier::new(self.completion(&self.options.functions_model))
    }

    fn executor(&self) -> Executor {
        let functions = self.completion(&self.options.functions_model);
        Executor::new(functions.clone(), Planner::new(functions))
    }

    fn summarizer(&self) -> Option<Summarizer> {
        self.options
            .postprocess
            .then(|| Summarizer::new(self.completion(&self.options.llm_model)))
    }

    /// Handle one user message, appending everything to `transcript`.
    pub async fn evaluate(&self, input: &str, transcript: &mut Transcript) -> Evaluation {
        let mut turn = Turn::default();
        let summarizer = self.summarizer();
        let executor = self.executor();

        transcript.push(Entry::user(input));
        let produced_from = transcript.len();

        let intent = self
            .classify(&format!("Request: {input}"), false, &mut turn)
            .await;

        if intent.action == ActionId::Reply {
            info!("No action needed, replying");
            let reply = self.synthesize(transcript, false, &mut turn).await;
            return turn.finish(reply);
        }

        self.act(input, &intent, transcript, &executor, summarizer.as_ref(), &mut turn)
            .await;

        if self.options.re_evaluate {
            self.re_evaluate(produced_from, transcript, &executor, summarizer.as_ref(), &mut turn)
                .await;
        }

        let reply = self.synthesize(transcript, true, &mut turn).await;
        turn.finish(reply)
    }

    /// Classify `context`, degrading every failure to `reply`.
    async fn classify(&self, context: &str, re_evaluation: bool, turn: &mut Turn) -> Intent {
        let intent = match self.classifier().classify(context, &self.registry).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, re_evaluation, "Classification degraded to reply");
                self.event_bus.publish(DomainEvent::ClassificationDegraded {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                turn.degraded = true;
                Intent::reply()
            }
        };

        if let Some(observation) = &intent.observation {
            info!(action = %intent.action, %observation, "Classifier observation");
        }
        self.event_bus.publish(DomainEvent::IntentClassified {
            action: intent.action,
            confidence: intent.confidence,
            re_evaluation,
            timestamp: Utc::now(),
        });
        intent
    }

    /// Execute the intent's action and, for a plan, each of its subtasks.
    async fn act(
        &self,
        input: &str,
        intent: &Intent,
        transcript: &mut Transcript,
        executor: &Executor,
        summarizer: Option<&Summarizer>,
        turn: &mut Turn,
    ) {
        info!(action = %intent.action, reasoning = %intent.reasoning, "Executing action");

        let reasoning = Summarizer::maybe(summarizer, intent.reasoning.clone()).await;
        let instruction = format!("Request: {input}\nReasoning: {reasoning}");

        let execution = executor
            .execute(intent.action, &instruction, &self.registry)
            .await;
        self.record(&execution, turn);
        transcript.extend(execution.entries);

        if let ActionOutput::Plan(plan) = execution.output {
            self.event_bus.publish(DomainEvent::PlanProduced {
                subtasks: plan.len(),
                timestamp: Utc::now(),
            });
            self.run_plan(input, &plan, transcript, executor, summarizer, turn)
                .await;
        }
    }

    /// Execute subtasks strictly in plan order.
    async fn run_plan(
        &self,
        input: &str,
        plan: &PlanResult,
        transcript: &mut Transcript,
        executor: &Executor,
        summarizer: Option<&Summarizer>,
        turn: &mut Turn,
    ) {
        if plan.is_empty() {
            info!("Plan has no subtasks");
            return;
        }

        let mut results = String::new();
        for (index, subtask) in plan.subtasks.iter().enumerate() {
            info!(index, action = %subtask.action, instruction = %subtask.instruction, "Running subtask");

            let mut instruction = format!("Context: {input}\n");
            if self.options.subtask_context && !results.is_empty() {
                instruction.push_str(&format!("Subtask results: {results}\n"));
            }
            let request = Summarizer::maybe(summarizer, subtask.instruction.clone()).await;
            instruction.push_str(&format!("Request: {request}"));

            let execution = executor
                .execute(subtask.action, &instruction, &self.registry)
                .await;
            self.record(&execution, turn);

            results.push_str(&render(&execution.entries));
            results = Summarizer::maybe(summarizer, results).await;

            transcript.extend(execution.entries);
        }
    }

    /// Bounded re-evaluation: keep acting until the classifier says `reply`.
    async fn re_evaluate(
        &self,
        mut produced_from: usize,
        transcript: &mut Transcript,
        executor: &Executor,
        summarizer: Option<&Summarizer>,
        turn: &mut Turn,
    ) {
        let max_rounds = self.options.max_re_evaluations.max(1);

        for round in 1..=max_rounds {
            info!(round, "Re-evaluating whether another action is needed");
            turn.rounds = round;

            let rendered = render(transcript.since(produced_from));
            let rendered = Summarizer::maybe(summarizer, rendered).await + "\n";

            transcript.push(Entry::user(rendered.clone()));
            produced_from = transcript.len();

            let observation = self.analyze(transcript).await;
            let context = format!(
                "Decide from the output below if we have to do another action:\n```\n{rendered}\n```\n\nObservation: {observation}"
            );

            let intent = self.classify(&context, true, turn).await;
            if intent.action == ActionId::Reply {
                info!(round, "Request completed, replying");
                return;
            }

            self.act(&rendered, &intent, transcript, executor, summarizer, turn)
                .await;
        }

        warn!(rounds = max_rounds, "Re-evaluation limit reached, replying");
        self.event_bus.publish(DomainEvent::ReEvaluationCapped {
            rounds: max_rounds,
            timestamp: Utc::now(),
        });
        turn.degraded = true;
    }

    /// Ask the LLM to analyze the transcript. Nothing is appended.
    async fn analyze(&self, transcript: &Transcript) -> String {
        let mut messages = transcript.entries().to_vec();
        messages.push(Entry::system(ANALYZE_PROMPT));

        match self.completion(&self.options.llm_model).text(messages).await {
            Ok(response) => {
                let observation = response.content.unwrap_or_default();
                debug!(%observation, "Observation");
                observation
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed, continuing without an observation");
                String::new()
            }
        }
    }

    /// Produce the final reply and append it.
    async fn synthesize(&self, transcript: &mut Transcript, framed: bool, turn: &mut Turn) -> String {
        if framed {
            transcript.push(Entry::system(CLARIFY_PROMPT));
        }

        let model = self.options.llm_model.clone();
        let response = self
            .completion(&model)
            .text(transcript.entries().to_vec())
            .await;

        let (reply, degraded) = match response {
            Ok(response) => match response.content.filter(|c| !c.trim().is_empty()) {
                Some(content) => (content, false),
                None => {
                    warn!("Synthesis returned no content, using fallback reply");
                    (FALLBACK_REPLY.to_string(), true)
                }
            },
            Err(e) => {
                warn!(error = %e, "Synthesis failed, using fallback reply");
                (FALLBACK_REPLY.to_string(), true)
            }
        };

        info!(reply = %reply, "Reply synthesized");
        self.event_bus.publish(DomainEvent::ReplySynthesized {
            model,
            degraded,
            timestamp: Utc::now(),
        });
        turn.degraded |= degraded;

        transcript.push(Entry::assistant(reply.clone()));
        reply
    }

    fn record(&self, execution: &Execution, turn: &mut Turn) {
        let success = execution.output.is_success();
        self.event_bus.publish(DomainEvent::ActionExecuted {
            action: execution.action,
            success,
            duration_ms: execution.duration_ms,
            timestamp: Utc::now(),
        });
        turn.actions.push(execution.action);
        turn.degraded |= !success;
    }
}

impl Turn {
    fn finish(self, reply: String) -> Evaluation {
        Evaluation {
            reply,
            actions: self.actions,
            re_evaluation_rounds: self.rounds,
            degraded: self.degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        FailingProvider, RecordingCapability, RecordingProvider, SequentialMockProvider,
        echo_descriptor, echo_descriptor_with,
    };
    use taskloom_core::capability::ActionDescriptor;
    use taskloom_core::provider::{FunctionChoice, ProviderRequest, ProviderResponse};
    use taskloom_core::transcript::Role;

    fn intent(action: &str) -> ProviderResponse {
        ProviderResponse::function(
            "intent",
            &serde_json::json!({"action": action, "reasoning": format!("use {action}")}),
        )
    }

    fn call(name: &str, args: serde_json::Value) -> ProviderResponse {
        ProviderResponse::function(name, &args)
    }

    fn build(provider: Arc<dyn Provider>, registry: ActionRegistry) -> EvaluationLoop {
        EvaluationLoop::new(provider, Arc::new(registry), Arc::new(EventBus::default()))
    }

    fn roles(transcript: &Transcript) -> Vec<Role> {
        transcript.entries().iter().map(Entry::role).collect()
    }

    #[tokio::test]
    async fn reply_intent_synthesizes_directly() {
        let provider = Arc::new(RecordingProvider::new(vec![
            intent("reply"),
            ProviderResponse::text("It is sunny."),
        ]));
        let agent = build(provider.clone(), ActionRegistry::reply_only());
        let mut transcript = Transcript::new();

        let outcome = agent.evaluate("what's the weather", &mut transcript).await;

        assert_eq!(outcome.reply, "It is sunny.");
        assert!(outcome.actions.is_empty());
        assert_eq!(roles(&transcript), vec![Role::User, Role::Assistant]);

        // Direct replies see only the transcript, without the clarify framing.
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages, vec![Entry::user("what's the weather")]);
        assert_eq!(requests[1].model, "gpt-4");
        assert_eq!(requests[1].function_call, FunctionChoice::Auto);
    }

    #[tokio::test]
    async fn failing_provider_still_answers() {
        let agent = build(Arc::new(FailingProvider), ActionRegistry::reply_only());
        let mut transcript = Transcript::new();

        let outcome = agent.evaluate("hello", &mut transcript).await;

        assert!(outcome.degraded);
        let last = transcript.last().unwrap();
        assert_eq!(last.role(), Role::Assistant);
        assert_eq!(last.content(), Some(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn degraded_classification_is_published() {
        let event_bus = Arc::new(EventBus::default());
        let mut rx = event_bus.subscribe();
        let provider = Arc::new(SequentialMockProvider::new(vec![
            intent("teleport"),
            ProviderResponse::text("ok"),
        ]));
        let agent = EvaluationLoop::new(provider, Arc::new(ActionRegistry::reply_only()), event_bus);

        let outcome = agent.evaluate("hi", &mut Transcript::new()).await;
        assert!(outcome.degraded);

        let event = rx.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::ClassificationDegraded { reason, .. } if reason.contains("teleport")));
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            &*event,
            DomainEvent::IntentClassified { action: ActionId::Reply, .. }
        ));
    }

    #[tokio::test]
    async fn single_action_then_clarify() {
        let capability = Arc::new(RecordingCapability::replying("Memories found in the database:\n- blue\n"));
        let registry = ActionRegistry::new([echo_descriptor_with(ActionId::SearchMemory, capability.clone())]);
        let provider = Arc::new(RecordingProvider::new(vec![
            intent("search_memory"),
            call("search_memory", serde_json::json!({"text": "favorite color"})),
            ProviderResponse::text("Your favorite color is blue."),
        ]));
        let agent = build(provider.clone(), registry);
        let mut transcript = Transcript::new();

        let outcome = agent.evaluate("what's my favorite color?", &mut transcript).await;

        assert_eq!(outcome.actions, vec![ActionId::SearchMemory]);
        assert_eq!(
            roles(&transcript),
            vec![Role::User, Role::Assistant, Role::Function, Role::System, Role::Assistant]
        );
        assert_eq!(transcript.entries()[3].content(), Some(CLARIFY_PROMPT));

        let requests = provider.requests();
        assert_eq!(
            requests[1].messages[1].content(),
            Some("Request: what's my favorite color?\nReasoning: use search_memory\nFunction call: ")
        );
        assert_eq!(requests[2].messages.len(), 4);
    }

    #[tokio::test]
    async fn plan_subtasks_run_in_order() {
        let registry = ActionRegistry::new([
            echo_descriptor(ActionId::SearchInternet),
            echo_descriptor(ActionId::WriteFile),
            echo_descriptor(ActionId::SaveMemory),
            ActionDescriptor::plan(),
        ]);
        let provider = Arc::new(SequentialMockProvider::new(vec![
            intent("plan"),
            call("plan", serde_json::json!({"description": "three steps"})),
            call(
                "plan",
                serde_json::json!({"subtasks": [
                    {"reasoning": "A", "function": "search_internet"},
                    {"reasoning": "B", "function": "write_file"},
                    {"reasoning": "C", "function": "save_memory"}
                ]}),
            ),
            call("search_internet", serde_json::json!({"text": "a"})),
            call("write_file", serde_json::json!({"text": "b"})),
            call("save_memory", serde_json::json!({"text": "c"})),
            ProviderResponse::text("All done."),
        ]));
        let agent = build(provider, registry);
        let mut transcript = Transcript::new();

        let outcome = agent.evaluate("do three things", &mut transcript).await;

        assert_eq!(
            outcome.actions,
            vec![
                ActionId::Plan,
                ActionId::SearchInternet,
                ActionId::WriteFile,
                ActionId::SaveMemory
            ]
        );
        let results: Vec<_> = transcript
            .entries()
            .iter()
            .filter_map(|e| match e {
                Entry::Function { name, .. } => Some(*name),
                _ => None,
            })
            .collect();
        assert_eq!(
            results,
            vec![
                ActionId::Plan,
                ActionId::SearchInternet,
                ActionId::WriteFile,
                ActionId::SaveMemory
            ]
        );
        assert_eq!(outcome.reply, "All done.");
    }

    #[tokio::test]
    async fn empty_plan_adds_no_subtask_entries() {
        let registry = ActionRegistry::new([echo_descriptor(ActionId::SearchInternet), ActionDescriptor::plan()]);
        let provider = Arc::new(SequentialMockProvider::new(vec![
            intent("plan"),
            call("plan", serde_json::json!({"description": "nothing"})),
            call("plan", serde_json::json!({"subtasks": []})),
            ProviderResponse::text("Nothing to do."),
        ]));
        let agent = build(provider, registry);
        let mut transcript = Transcript::new();

        let outcome = agent.evaluate("idle", &mut transcript).await;

        assert_eq!(outcome.actions, vec![ActionId::Plan]);
        assert_eq!(
            roles(&transcript),
            vec![Role::User, Role::Assistant, Role::Function, Role::System, Role::Assistant]
        );
        assert_eq!(outcome.reply, "Nothing to do.");
    }

    async fn run_search_then_write(subtask_context: bool) -> Vec<ProviderRequest> {
        let registry = ActionRegistry::new([
            echo_descriptor_with(
                ActionId::SearchInternet,
                Arc::new(RecordingCapability::replying("Internet search results:\n- Top hit. Source: X - https://x.dev\n")),
            ),
            echo_descriptor(ActionId::WriteFile),
            ActionDescriptor::plan(),
        ]);
        let provider = Arc::new(RecordingProvider::new(vec![
            intent("plan"),
            call("plan", serde_json::json!({"description": "search then save"})),
            call(
                "plan",
                serde_json::json!({"subtasks": [
                    {"reasoning": "search the web for X", "function": "search_internet"},
                    {"reasoning": "save the top result to a file", "function": "write_file"}
                ]}),
            ),
            call("search_internet", serde_json::json!({"text": "X"})),
            call("write_file", serde_json::json!({"text": "Top hit"})),
            ProviderResponse::text("Saved."),
        ]));
        build(provider.clone(), registry)
            .with_subtask_context(subtask_context)
            .evaluate("search the web for X and save the top result to a file", &mut Transcript::new())
            .await;
        provider.requests()
    }

    #[tokio::test]
    async fn subtask_context_carries_earlier_results() {
        let requests = run_search_then_write(true).await;
        let write_prompt = requests[4].messages[1].content().unwrap();
        assert_eq!(
            write_prompt,
            "Context: search the web for X and save the top result to a file\n\
             Subtask results: {\"name\":\"search_internet\",\"arguments\":{\"text\":\"X\"}}\n\
             Function result: Internet search results:\n- Top hit. Source: X - https://x.dev\n\n\n\
             Request: save the top result to a file\nFunction call: "
        );
    }

    #[tokio::test]
    async fn without_subtask_context_subtasks_are_independent() {
        let requests = run_search_then_write(false).await;
        let write_prompt = requests[4].messages[1].content().unwrap();
        assert_eq!(
            write_prompt,
            "Context: search the web for X and save the top result to a file\n\
             Request: save the top result to a file\nFunction call: "
        );
    }

    #[tokio::test]
    async fn re_evaluation_stops_on_reply() {
        let registry = ActionRegistry::new([echo_descriptor(ActionId::SearchInternet)]);
        let provider = Arc::new(RecordingProvider::new(vec![
            intent("search_internet"),
            call("search_internet", serde_json::json!({"text": "rust"})),
            ProviderResponse::text("The search found what was needed."),
            intent("reply"),
            ProviderResponse::text("Here you go."),
        ]));
        let agent = build(provider.clone(), registry).with_re_evaluate(true);
        let mut transcript = Transcript::new();

        let outcome = agent.evaluate("search rust", &mut transcript).await;

        assert_eq!(outcome.re_evaluation_rounds, 1);
        assert_eq!(outcome.reply, "Here you go.");
        assert_eq!(provider.requests().len(), 5);
        assert_eq!(
            roles(&transcript),
            vec![
                Role::User,
                Role::Assistant,
                Role::Function,
                Role::User,
                Role::System,
                Role::Assistant
            ]
        );
        let synthesized = transcript
            .entries()
            .iter()
            .filter(|e| e.role() == Role::Assistant && e.content().is_some())
            .count();
        assert_eq!(synthesized, 1);

        // The rendering of the action excludes the user message that triggered it.
        assert_eq!(
            transcript.entries()[3].content(),
            Some("{\"name\":\"search_internet\",\"arguments\":{\"text\":\"rust\"}}\nFunction result: search_internet done\n\n")
        );
        let classify = &provider.requests()[3];
        let context = classify.messages[1].content().unwrap();
        assert!(context.starts_with("Decide from the output below if we have to do another action:\n```\n"));
        assert!(context.contains("\n\nObservation: The search found what was needed.\nFunction call: "));
    }

    #[tokio::test]
    async fn re_evaluation_is_bounded() {
        let registry = ActionRegistry::new([echo_descriptor(ActionId::SearchInternet)]);
        let mut script = vec![
            intent("search_internet"),
            call("search_internet", serde_json::json!({"text": "again"})),
        ];
        for _ in 0..2 {
            script.push(ProviderResponse::text("keep going"));
            script.push(intent("search_internet"));
            script.push(call("search_internet", serde_json::json!({"text": "again"})));
        }
        script.push(ProviderResponse::text("Stopped."));

        let event_bus = Arc::new(EventBus::default());
        let mut rx = event_bus.subscribe();
        let agent = EvaluationLoop::new(
            Arc::new(SequentialMockProvider::new(script)),
            Arc::new(registry),
            event_bus,
        )
        .with_re_evaluate(true)
        .with_max_re_evaluations(2);

        let outcome = agent.evaluate("loop forever", &mut Transcript::new()).await;

        assert_eq!(outcome.re_evaluation_rounds, 2);
        assert_eq!(outcome.actions.len(), 3);
        assert_eq!(outcome.reply, "Stopped.");
        assert!(outcome.degraded);

        let mut capped = false;
        while let Ok(event) = rx.try_recv() {
            capped |= matches!(&*event, DomainEvent::ReEvaluationCapped { rounds: 2, .. });
        }
        assert!(capped);
    }

    #[tokio::test]
    async fn postprocess_summarizes_reasoning() {
        let registry = ActionRegistry::new([echo_descriptor(ActionId::SaveMemory)]);
        let provider = Arc::new(RecordingProvider::new(vec![
            intent("save_memory"),
            ProviderResponse::text("short reasoning"),
            call("save_memory", serde_json::json!({"text": "x"})),
            ProviderResponse::text("Saved."),
        ]));
        let agent = build(provider.clone(), registry).with_postprocess(true);

        agent.evaluate("remember x", &mut Transcript::new()).await;

        let requests = provider.requests();
        assert!(requests[1].messages[0]
            .content()
            .unwrap()
            .starts_with("Summarize the following text"));
        assert_eq!(
            requests[2].messages[1].content(),
            Some("Request: remember x\nReasoning: short reasoning\nFunction call: ")
        );
    }

    #[tokio::test]
    async fn transcript_is_shared_across_calls() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            intent("reply"),
            ProviderResponse::text("first"),
            intent("reply"),
            ProviderResponse::text("second"),
        ]));
        let agent = build(provider, ActionRegistry::reply_only());
        let mut transcript = Transcript::new();
        transcript.push(Entry::system("be brief"));

        agent.evaluate("one", &mut transcript).await;
        agent.evaluate("two", &mut transcript).await;

        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript.entries()[0], Entry::system("be brief"));
        assert_eq!(transcript.last().unwrap().content(), Some("second"));
    }

    #[test]
    fn options_follow_config() {
        let mut config = AppConfig::default();
        config.agent.re_evaluate = true;
        config.agent.max_re_evaluations = 3;
        config.models.llm = "llama".into();

        let options = EvaluationOptions::from_config(&config);
        assert!(options.re_evaluate);
        assert_eq!(options.max_re_evaluations, 3);
        assert_eq!(options.llm_model, "llama");
        assert_eq!(options.timeout, Duration::from_secs(1200));
    }
}
