//! `taskloom onboard` — First-time setup.

use taskloom_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("taskloom — First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    let config = AppConfig::default();
    if !config.tools.persistent_dir.exists() {
        std::fs::create_dir_all(&config.tools.persistent_dir)?;
        println!("Created data directory: {}", config.tools.persistent_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Point api_base at your OpenAI-compatible endpoint (LocalAI by default)");
    println!("  2. Set api_key, or export TASKLOOM_API_KEY, if the endpoint needs one");
    println!("  3. Run: taskloom agent\n");

    Ok(())
}
