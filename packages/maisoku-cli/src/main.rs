//! CLI for running flyer batches and publishing their listings
//!
//! Input documents are text files with pages separated by form feeds
//! (`\f`), as produced by `pdftotext`. Rendered pages named
//! `{stem}_page_{n}.png` next to a document are picked up with `--images`.

mod config;
mod store;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maisoku::{
    ai::shared_client, progress_channel, publish_listings, security::AICredentials,
    BatchProcessor, BatchRequest, BatchResult, DocumentInput, ListingExtractor, MaisokuError,
    MemoryObjectStore, NotionDestination, ObjectStore, ProgressReceiver, Throttle,
    VisionClassifier,
};

use crate::config::Config;
use crate::store::LocalObjectStore;

#[derive(Parser)]
#[command(name = "maisoku")]
#[command(about = "Detect, deduplicate and extract rental listings from flyers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process text documents as one batch and print the result as JSON
    Process {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Reuse an existing session id
        #[arg(long)]
        session: Option<String>,

        /// Write the result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Persist documents and page images under this directory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Classify `{stem}_page_{n}.png` images next to each document
        #[arg(long)]
        images: bool,
    },

    /// Publish the listings of a saved batch result to Notion
    Publish {
        result: PathBuf,

        /// Notion database id (defaults to NOTION_DATABASE_ID)
        #[arg(long)]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,maisoku=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Process {
            files,
            session,
            output,
            store_dir,
            images,
        } => cmd_process(&config, &files, session, output, store_dir, images).await,
        Commands::Publish { result, database } => cmd_publish(&config, &result, database).await,
    }
}

async fn cmd_process(
    config: &Config,
    files: &[PathBuf],
    session: Option<String>,
    output: Option<PathBuf>,
    store_dir: Option<PathBuf>,
    images: bool,
) -> Result<()> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        documents.push(load_document(path, images).await?);
    }
    let request = match session {
        Some(session) => BatchRequest::for_session(session, documents),
        None => BatchRequest::new(documents),
    };

    let (extractor, classifier) = services(config)?;
    let store: Arc<dyn ObjectStore> = match store_dir {
        Some(dir) => Arc::new(LocalObjectStore::new(dir)),
        None => Arc::new(MemoryObjectStore::new()),
    };

    let (tx, rx) = progress_channel();
    let progress = tokio::spawn(log_progress(rx));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling batch");
                cancel.cancel();
            }
        }
    });

    let processor = BatchProcessor::new(extractor, classifier, store)
        .with_config(config.pipeline())
        .with_progress(tx)
        .with_cancellation(cancel);

    let result = processor.process_batch(request).await;
    drop(processor);
    let _ = progress.await;

    let result = match result {
        Err(MaisokuError::Cancelled) => anyhow::bail!("batch cancelled"),
        other => other.context("batch failed")?,
    };

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), listings = result.listings.len(), "Wrote batch result");
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn cmd_publish(config: &Config, result_path: &Path, database: Option<String>) -> Result<()> {
    let raw = tokio::fs::read_to_string(result_path)
        .await
        .with_context(|| format!("failed to read {}", result_path.display()))?;
    let result: BatchResult =
        serde_json::from_str(&raw).context("file is not a batch result")?;

    let token = config
        .notion_api_token
        .as_deref()
        .context("NOTION_API_TOKEN must be set")?;
    let database_id = database
        .or_else(|| config.notion_database_id.clone())
        .context("pass --database or set NOTION_DATABASE_ID")?;

    let destination = NotionDestination::new(token)?;
    let throttle = Throttle::new(config.pipeline().publish_delay);
    let (tx, rx) = progress_channel();
    let progress = tokio::spawn(log_progress(rx));

    let report = publish_listings(
        &destination,
        &database_id,
        result.listings.iter().map(|record| &record.listing),
        &throttle,
        Some(&tx),
    )
    .await;
    drop(tx);
    let _ = progress.await;
    let report = report?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_success() {
        warn!(failed = report.failed.len(), "Some listings were not published");
    }

    Ok(())
}

async fn log_progress(mut rx: ProgressReceiver) {
    while let Some(event) = rx.recv().await {
        info!(
            stage = ?event.stage,
            processed = event.processed,
            total = event.total,
            "{}%",
            event.percent()
        );
    }
}

/// Extraction and vision services: OpenAI when configured, else offline.
fn services(config: &Config) -> Result<(Arc<dyn ListingExtractor>, Arc<dyn VisionClassifier>)> {
    let Some(api_key) = config.openai_api_key.as_deref() else {
        warn!("OPENAI_API_KEY not set, listings will come from pattern extraction only");
        let offline = Arc::new(Offline);
        let extractor: Arc<dyn ListingExtractor> = offline.clone();
        let classifier: Arc<dyn VisionClassifier> = offline;
        return Ok((extractor, classifier));
    };

    let mut credentials = AICredentials::new(api_key, config.openai_model.clone())?;
    if let Some(url) = &config.openai_base_url {
        credentials = credentials.with_base_url(url.clone());
    }

    let client = shared_client(&credentials)?;
    let extractor: Arc<dyn ListingExtractor> = client.clone();
    let classifier: Arc<dyn VisionClassifier> = client;
    Ok((extractor, classifier))
}

/// Stand-in service used without credentials; every call fails.
struct Offline;

#[async_trait]
impl ListingExtractor for Offline {
    async fn extract(&self, _text: &str, _page_index: usize) -> maisoku::Result<String> {
        Err(MaisokuError::service("no extraction service configured"))
    }
}

#[async_trait]
impl VisionClassifier for Offline {
    async fn classify(&self, _image_base64: &str) -> maisoku::Result<String> {
        Err(MaisokuError::service("no vision service configured"))
    }
}

/// Read a form-feed paginated text file, plus its rendered pages if asked.
async fn load_document(path: &Path, with_images: bool) -> Result<DocumentInput> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = String::from_utf8_lossy(&bytes);
    let page_count = raw.matches('\u{c}').count() + 1;
    let text = raw.replace('\u{c}', "\n");

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut document = DocumentInput::new(name, text)
        .with_page_count(page_count)
        .with_bytes(bytes);

    if with_images {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        for page in 1..=page_count {
            let image = dir.join(format!("{}_page_{}.png", stem, page));
            match tokio::fs::read(&image).await {
                Ok(png) => document = document.with_page_image(png),
                Err(_) => break,
            }
        }
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_document_counts_form_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flyer.txt");
        tokio::fs::write(&path, "物件名: A\n\u{c}物件名: B\n").await.unwrap();
        tokio::fs::write(dir.path().join("flyer_page_1.png"), b"png1").await.unwrap();

        let document = load_document(&path, true).await.unwrap();

        assert_eq!(document.name, "flyer.txt");
        assert_eq!(document.page_count, 2);
        assert!(!document.text.contains('\u{c}'));
        // Images stop at the first missing page.
        assert_eq!(document.page_images, vec![b"png1".to_vec()]);
    }
}
