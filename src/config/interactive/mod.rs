
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, ProviderConfig};
use crate::gemini::{GeminiClient, api_key_from_env};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 PDF Chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Provider Configuration").bold().yellow());
    eprintln!("Configure the hosted model used for embeddings and answers.");
    eprintln!();

    configure_provider(&mut config.provider)?;
    configure_chunking(&mut config)?;

    config
        .validate()
        .context("The entered configuration is not valid")?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_provider_connection(&config) {
        eprintln!("{}", style("✓ Provider connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the provider").yellow()
        );
        eprintln!(
            "You can continue, but make sure {} is set before processing documents.",
            config.provider.api_key_env
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.provider.base_url).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.provider.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.provider.chat_model).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.provider.embedding_dimension).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.provider.batch_size).cyan());
    eprintln!("  Top K: {}", style(config.provider.top_k).cyan());
    eprintln!(
        "  Temperature: {}",
        style(config.provider.temperature).cyan()
    );
    eprintln!(
        "  API Key Variable: {}",
        style(&config.provider.api_key_env).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Chunking Settings:").bold().yellow());
    eprintln!(
        "  Max Chunk Size: {} characters",
        style(config.chunking.max_chunk_size).cyan()
    );
    eprintln!(
        "  Overlap Size: {} characters",
        style(config.chunking.overlap_size).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::load_from(Config::default_dir()?).unwrap_or_default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_provider(provider: &mut ProviderConfig) -> Result<()> {
    provider.base_url = Input::new()
        .with_prompt("Provider base URL")
        .default(provider.base_url.clone())
        .interact_text()?;

    provider.embedding_model = Input::new()
        .with_prompt("Embedding model")
        .default(provider.embedding_model.clone())
        .interact_text()?;

    provider.chat_model = Input::new()
        .with_prompt("Chat model")
        .default(provider.chat_model.clone())
        .interact_text()?;

    provider.embedding_dimension = Input::new()
        .with_prompt("Embedding dimension")
        .default(provider.embedding_dimension)
        .interact_text()?;

    provider.top_k = Input::new()
        .with_prompt("Chunks retrieved per question (top-k)")
        .default(provider.top_k)
        .interact_text()?;

    provider.api_key_env = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(provider.api_key_env.clone())
        .interact_text()?;

    Ok(())
}

fn configure_chunking(config: &mut Config) -> Result<()> {
    eprintln!();
    eprintln!("{}", style("Chunking Configuration").bold().yellow());

    config.chunking.max_chunk_size = Input::new()
        .with_prompt("Max chunk size (characters)")
        .default(config.chunking.max_chunk_size)
        .interact_text()?;

    config.chunking.overlap_size = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(config.chunking.overlap_size)
        .interact_text()?;

    Ok(())
}

fn test_provider_connection(config: &Config) -> bool {
    let Ok(api_key) = api_key_from_env(&config.provider.api_key_env) else {
        eprintln!(
            "{}",
            style(format!(
                "Skipping connectivity test: {} is not set.",
                config.provider.api_key_env
            ))
            .yellow()
        );
        return false;
    };

    GeminiClient::new(config, api_key)
        .and_then(|client| client.health_check())
        .is_ok()
}
