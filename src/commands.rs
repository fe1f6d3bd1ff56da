use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::PdfChatError;
use crate::chat::ChatModel;
use crate::config::Config;
use crate::embeddings::TextEmbedder;
use crate::extract::PdfSource;
use crate::gemini::GeminiClient;
use crate::index::{DEFAULT_SNAPSHOT_NAME, VectorStore};
use crate::session::ChatSession;

/// Build a session against the configured hosted provider.
fn open_session(config: Config) -> Result<ChatSession> {
    let client = GeminiClient::from_env(&config)?;
    let embedder: Arc<dyn TextEmbedder> = Arc::new(client.clone());
    let chat_model: Arc<dyn ChatModel> = Arc::new(client);
    Ok(ChatSession::new(config, embedder, chat_model))
}

fn load_sources(paths: &[PathBuf]) -> Result<Vec<PdfSource>> {
    paths.iter().map(PdfSource::from_path).collect()
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn process_into_session(session: &mut ChatSession, paths: &[PathBuf]) -> Result<()> {
    let sources = load_sources(paths)?;

    let bar = spinner("Processing PDFs...");
    let summary = session.process_documents(&sources).await;
    bar.finish_and_clear();

    let summary = summary?;
    if summary.rebuilt {
        println!(
            "{}",
            style(format!(
                "✓ Indexed {} chunks from {} PDF file(s)",
                summary.chunks, summary.documents
            ))
            .green()
        );
    } else {
        println!(
            "{}",
            style("✓ Documents unchanged; reusing the existing index").green()
        );
    }
    Ok(())
}

async fn answer_once(session: &mut ChatSession, question: &str) -> Result<()> {
    let bar = spinner("Processing your question...");
    let answer = session.answer_question(question).await;
    bar.finish_and_clear();

    match answer {
        Ok(answer) => {
            println!("{}", style("🤖 Answer").bold().green());
            println!("{}", answer.text);
        }
        Err(PdfChatError::IndexNotBuilt) => {
            println!(
                "{}",
                style("Please process PDF files before asking questions.").yellow()
            );
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Build and persist the index for the given PDFs.
#[inline]
pub async fn process_documents(paths: Vec<PathBuf>) -> Result<()> {
    if paths.is_empty() {
        println!(
            "{}",
            style("Please provide at least one PDF file to process.").yellow()
        );
        return Ok(());
    }

    let config = Config::load()?;
    let mut session = open_session(config)?;
    process_into_session(&mut session, &paths).await
}

/// Answer a single question, processing the given PDFs first when provided.
#[inline]
pub async fn ask(question: String, paths: Vec<PathBuf>) -> Result<()> {
    if question.trim().is_empty() {
        println!("{}", style("Please ask a question.").yellow());
        return Ok(());
    }

    let config = Config::load()?;
    let mut session = open_session(config)?;

    if !paths.is_empty() {
        process_into_session(&mut session, &paths).await?;
    }

    answer_once(&mut session, &question).await
}

/// Interactive chat loop over the given PDFs.
///
/// In-loop commands: `clear` resets the conversation, `export [path]` writes
/// the conversation CSV, `exit` leaves the loop.
#[inline]
pub async fn chat(paths: Vec<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let mut session = open_session(config)?;

    println!("{}", style("📄 PDF Chat").bold().cyan());
    println!("Ask questions about your uploaded PDF documents.");
    println!();

    if paths.is_empty() {
        println!(
            "{}",
            style("No PDFs given; answering from the last processed index if one exists.").yellow()
        );
    } else {
        process_into_session(&mut session, &paths).await?;
    }

    println!("Type a question, or 'clear', 'export [path]', 'exit'.");
    println!();

    loop {
        let line: String = Input::new()
            .with_prompt("❓")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;
        let line = line.trim();

        match line {
            "" => {}
            "exit" | "quit" => break,
            "clear" => {
                session.clear_history();
                println!("{}", style("Conversation cleared.").green());
            }
            _ if line == "export" || line.starts_with("export ") => {
                let path = line
                    .strip_prefix("export")
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .unwrap_or("conversation_history.csv");
                export_history(&session, path)?;
            }
            question => {
                if let Err(e) = answer_once(&mut session, question).await {
                    println!("{}", style(format!("Error: {e}")).red());
                }
                println!();
            }
        }
    }

    Ok(())
}

fn export_history(session: &ChatSession, path: &str) -> Result<()> {
    if session.history().is_empty() {
        println!("{}", style("Nothing to export yet.").yellow());
        return Ok(());
    }

    let file =
        File::create(path).with_context(|| format!("Failed to create export file: {path}"))?;
    session.export_history(file)?;
    info!("Exported conversation history to {}", path);
    println!(
        "{}",
        style(format!("✓ Conversation history exported to {path}")).green()
    );
    Ok(())
}

/// Show configuration, provider, and index snapshot health.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 PDF Chat Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Provider Status:");
    match GeminiClient::from_env(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!("   ✅ Provider: Connected ({})", config.provider.base_url);
                println!("   📋 Embedding Model: {}", config.provider.embedding_model);
                println!("   💬 Chat Model: {}", config.provider.chat_model);
            }
            Err(e) => {
                println!("   ⚠️  Provider: Reachable but unhealthy - {e}");
            }
        },
        Err(e) => {
            println!("   ❌ Provider: Not available - {e}");
        }
    }

    println!();
    println!("🔍 Index Snapshot:");
    match GeminiClient::from_env(&config) {
        Ok(client) => {
            match VectorStore::load(&config.vectors_path(), DEFAULT_SNAPSHOT_NAME, &client).await {
                Ok(store) => match store.count().await {
                    Ok(count) => println!("   ✅ Snapshot present with {count} chunks"),
                    Err(e) => println!("   ⚠️  Snapshot present but unreadable - {e}"),
                },
                Err(PdfChatError::IndexNotBuilt) => {
                    println!("   📭 No index built yet");
                    println!("   💡 Use 'pdf-chat process <file.pdf>' to build one");
                }
                Err(e) => println!("   ❌ Snapshot check failed - {e}"),
            }
        }
        Err(_) => {
            println!("   ⚠️  Cannot check snapshot compatibility without provider credentials");
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'pdf-chat process <files…>' to index your PDFs");
    println!("   • Use 'pdf-chat chat <files…>' to start asking questions");
    println!("   • Use 'pdf-chat config' to adjust provider settings");

    Ok(())
}
