//! `taskloom actions` — List the actions the agent can take.

use std::sync::Arc;

use taskloom_config::AppConfig;
use taskloom_core::capability::Handler;
use taskloom_core::provider::Provider;
use taskloom_providers::OpenAiCompatProvider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config));
    let registry = taskloom_tools::default_registry(&config, super::build_memory(&config, provider));

    println!("{:<16} {:<10} {:<10} DESCRIPTION", "ACTION", "PLANNABLE", "KIND");
    for action in registry.iter() {
        let kind = match action.handler {
            Handler::Terminal => "terminal",
            Handler::Planner => "planner",
            Handler::Capability(_) => "capability",
        };
        println!(
            "{:<16} {:<10} {:<10} {}",
            action.id.as_str(),
            if action.plannable { "yes" } else { "no" },
            kind,
            action.description
        );
    }

    Ok(())
}
