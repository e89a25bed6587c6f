//! Interactive chat binary
//!
//! Run with: cargo run -p convo-rag -- --show-refined

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use console::style;
use convo_rag::{
    config::ChatConfig,
    providers::{GeminiClient, LlmProvider},
    ChatSession, Error, TranscriptEntry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "convo-rag")]
#[command(about = "Chat with a knowledge base: refined queries, retrieved context, grounded answers")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the refined query before each answer
    #[arg(long)]
    show_refined: bool,

    /// List the models the LLM service reports and exit
    #[arg(long)]
    list_models: bool,

    /// Override the number of neighbours requested from the index
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with answers
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convo_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ChatConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(top_k) = cli.top_k {
        config.vector_db.top_k = top_k;
    }

    if cli.list_models {
        return list_models(&config).await;
    }

    let mut session = match ChatSession::from_config(&config) {
        Ok(session) => session,
        Err(e @ Error::Config(_)) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to start chat session"),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Answer model: {}", config.llm.answer_model);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Index: {}", config.vector_db.index_name);
    tracing::info!(
        "Session {} started at {}",
        session.id(),
        session.started_at().format("%Y-%m-%d %H:%M:%S UTC")
    );

    println!("{}", style("Pookie Chatbot").cyan().bold());
    println!(
        "{}",
        style("Type a question. /history shows the conversation, /clear resets it, /quit exits.").dim()
    );
    println!("\n{} {}\n", style("Bot:").green().bold(), session.memory().greeting());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", style("You:").blue().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("{}\n", style("Conversation cleared.").dim());
                continue;
            }
            "/history" => {
                print_transcript(&session);
                continue;
            }
            _ => {}
        }

        match session.submit(input).await {
            Ok(outcome) => {
                if cli.show_refined {
                    println!(
                        "{} {}",
                        style("Refined query:").dim(),
                        style(&outcome.refined_query).italic()
                    );
                }
                if outcome.context.is_degraded() {
                    println!(
                        "{}",
                        style("(no knowledge base passages were used for this answer)").dim()
                    );
                }
                println!("{} {}\n", style("Bot:").green().bold(), outcome.answer);
            }
            Err(e) => {
                eprintln!("{} {}\n", style("Error:").red().bold(), e);
            }
        }
    }

    Ok(())
}

async fn list_models(config: &ChatConfig) -> anyhow::Result<()> {
    let client = GeminiClient::new(&config.llm).context("Cannot list models")?;
    let models = client.list_models().await?;

    println!("{}", style("Available models:").bold());
    for model in &models {
        let marker = if model.supports_generation() {
            style("generateContent").green()
        } else {
            style("-").dim()
        };
        println!("  {:<40} {}", model.name, marker);
    }
    Ok(())
}

fn print_transcript(session: &ChatSession) {
    println!(
        "{}",
        style(format!(
            "Session {} (started {})",
            session.id(),
            session.started_at().format("%Y-%m-%d %H:%M")
        ))
        .dim()
    );
    for entry in session.memory().transcript() {
        match entry {
            TranscriptEntry::Bot(text) => println!("{} {}", style("Bot:").green().bold(), text),
            TranscriptEntry::User(text) => println!("{} {}", style("You:").blue().bold(), text),
        }
    }
    println!();
}
