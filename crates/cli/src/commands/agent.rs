//! `taskloom agent` — Interactive or single-prompt chat mode.

use std::sync::Arc;

use clap::Args;
use taskloom_agent::{EvaluationLoop, EvaluationOptions, Session};
use taskloom_config::AppConfig;
use taskloom_core::event::EventBus;
use taskloom_core::provider::Provider;
use taskloom_providers::OpenAiCompatProvider;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::speech::Speaker;

#[derive(Debug, Args)]
pub struct AgentArgs {
    /// Answer a single prompt instead of entering interactive mode
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// System prompt placed at the start of the conversation
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Ask whether another action is needed after each action
    #[arg(long)]
    pub re_evaluate: bool,

    /// Summarize intermediate results before feeding them back
    #[arg(long)]
    pub postprocess: bool,

    /// Carry earlier subtask results into later subtasks
    #[arg(long)]
    pub subtask_context: bool,

    /// Upper bound on re-evaluation rounds per message
    #[arg(long)]
    pub max_re_evaluations: Option<usize>,

    /// OpenAI-compatible endpoint, including the /v1 suffix
    #[arg(long, env = "TASKLOOM_API_BASE")]
    pub api_base: Option<String>,

    /// Model used for classification, planning and argument filling
    #[arg(long)]
    pub functions_model: Option<String>,

    /// Model used for replies and summaries
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Speak every reply through the text-to-speech endpoint
    #[arg(long)]
    pub speak: bool,
}

impl AgentArgs {
    /// Layer the flags over the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(prompt) = &self.system_prompt {
            config.agent.system_prompt = Some(prompt.clone());
        }
        config.agent.re_evaluate |= self.re_evaluate;
        config.agent.postprocess |= self.postprocess;
        config.agent.subtask_context |= self.subtask_context;
        if let Some(max) = self.max_re_evaluations {
            config.agent.max_re_evaluations = max;
        }
        if let Some(base) = &self.api_base {
            config.api_base = base.clone();
        }
        if let Some(model) = &self.functions_model {
            config.models.functions = model.clone();
        }
        if let Some(model) = &self.llm_model {
            config.models.llm = model.clone();
        }
        config.speech.enabled |= self.speak;
    }
}

pub async fn run(args: AgentArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    args.apply(&mut config);
    config.validate()?;

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config));
    let memory = super::build_memory(&config, provider.clone());
    let registry = Arc::new(taskloom_tools::default_registry(&config, memory));

    let event_bus = Arc::new(EventBus::default());
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(?event, "Domain event");
        }
    });

    let agent = EvaluationLoop::new(provider, registry.clone(), event_bus)
        .with_options(EvaluationOptions::from_config(&config));
    let mut session = Session::new(agent, config.agent.system_prompt.as_deref());
    let speaker = config.speech.enabled.then(|| Speaker::from_config(&config.speech));

    if let Some(prompt) = args.prompt {
        info!(%prompt, "Prompt mode");
        let outcome = session.send(&prompt).await;
        println!("{}", outcome.reply);
        if let Some(speaker) = &speaker {
            speaker.speak(&outcome.reply).await;
        }
        return Ok(());
    }

    let names: Vec<&str> = registry.iter().map(|a| a.id.as_str()).collect();
    info!(actions = %names.join(", "), "Interactive mode");

    println!();
    println!("  taskloom — interactive mode");
    println!("  Endpoint:  {}", config.api_base);
    println!("  Models:    {} (functions), {} (replies)", config.models.functions, config.models.llm);
    println!("  Actions:   {}", names.join(", "));
    println!("  Type 'exit' or press Ctrl+D to quit.");
    println!();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let outcome = session.send(input).await;
        println!("{}", outcome.reply);
        println!();
        if let Some(speaker) = &speaker {
            speaker.speak(&outcome.reply).await;
        }
    }

    println!("Goodbye!");
    Ok(())
}
