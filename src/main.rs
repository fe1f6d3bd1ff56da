use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_chat::Result;
use pdf_chat::commands::{ask, chat, process_documents, show_status};
use pdf_chat::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(about = "Ask questions about your PDF documents, grounded in a local semantic index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the hosted model provider and chunking settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Extract, chunk, embed, and index PDF files
    Process {
        /// PDF files to index
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,
    },
    /// Ask a single question about your PDFs
    Ask {
        /// The question to answer
        question: String,
        /// PDF files to index first (omit to reuse the last processed index)
        pdfs: Vec<PathBuf>,
    },
    /// Start an interactive chat over your PDFs
    Chat {
        /// PDF files to index first (omit to reuse the last processed index)
        pdfs: Vec<PathBuf>,
    },
    /// Show provider and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Process { pdfs } => {
            process_documents(pdfs).await?;
        }
        Commands::Ask { question, pdfs } => {
            ask(question, pdfs).await?;
        }
        Commands::Chat { pdfs } => {
            chat(pdfs).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
