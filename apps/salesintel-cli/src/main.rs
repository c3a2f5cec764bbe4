use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use salesintel_core::config::Config;

mod commands;
mod wiring;

#[derive(Parser)]
#[command(name = "salesintel")]
#[command(about = "Natural-language queries and semantic notes search over sales data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed one piece of text and store it for a source record
    Index {
        /// lead_note, customer_note, campaign_content, sales_note or insight
        #[arg(long = "type")]
        doc_type: String,
        #[arg(long)]
        source_table: String,
        #[arg(long)]
        source_id: i64,
        /// JSON object stored alongside the document
        #[arg(long)]
        metadata: Option<String>,
        /// Keep existing documents for the source instead of replacing them
        #[arg(long)]
        append: bool,
        content: String,
    },
    /// Bulk-index a JSONL file of documents
    Import {
        path: PathBuf,
        /// Documents embedded per oracle call
        #[arg(long, default_value_t = 64)]
        batch_size: usize,
    },
    /// Similarity search over stored documents
    Search {
        query: String,
        #[arg(long = "type")]
        doc_type: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Print the token-budgeted context block for a query
    Context {
        query: String,
        #[arg(long = "type")]
        doc_type: Option<String>,
        #[arg(long)]
        budget: Option<usize>,
    },
    /// Remove documents by source record or by document id
    Delete {
        #[arg(long, requires = "source_id", conflicts_with = "id")]
        source_table: Option<String>,
        #[arg(long, requires = "source_table")]
        source_id: Option<i64>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Run the safety validator on a query string
    Validate { query: String },
    /// Ask questions about the sales data
    Chat {
        /// Send one message and exit instead of starting a session
        #[arg(long, short)]
        message: Option<String>,
        #[arg(long)]
        conversation: Option<String>,
        /// Prefix each question with related notes from the vector store
        #[arg(long)]
        rag: bool,
        /// Restrict --rag notes to one document type
        #[arg(long = "type", requires = "rag")]
        doc_type: Option<String>,
    },
    /// Generate a narrative insight from a metrics snapshot (JSON file)
    Insight {
        /// weekly_sales, campaign_performance, revenue_forecast or lead_analysis
        kind: String,
        #[arg(long)]
        metrics: PathBuf,
        /// Add related notes from the vector store to the prompt
        #[arg(long)]
        with_notes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;

    match cli.command {
        Commands::Index { doc_type, source_table, source_id, metadata, append, content } => {
            commands::documents::index(&settings, &doc_type, &source_table, source_id, metadata.as_deref(), append, &content)
                .await?
        }
        Commands::Import { path, batch_size } => commands::documents::import(&settings, &path, batch_size).await?,
        Commands::Search { query, doc_type, limit, threshold } => {
            commands::retrieval::search(&settings, &query, doc_type.as_deref(), limit, threshold).await?
        }
        Commands::Context { query, doc_type, budget } => {
            commands::retrieval::context(&settings, &query, doc_type.as_deref(), budget).await?
        }
        Commands::Delete { source_table, source_id, id } => {
            commands::documents::delete(&settings, source_table.as_deref().zip(source_id), id.as_deref()).await?
        }
        Commands::Validate { query } => commands::chat::validate(&settings, &query)?,
        Commands::Chat { message, conversation, rag, doc_type } => {
            let opts = commands::chat::ChatOptions { rag, doc_type: doc_type.as_deref() };
            commands::chat::chat(&settings, message.as_deref(), conversation.as_deref(), opts).await?
        }
        Commands::Insight { kind, metrics, with_notes } => {
            commands::insight::insight(&settings, &kind, &metrics, with_notes).await?
        }
    }

    Ok(())
}
