//! Session state and pipeline orchestration.
//!
//! [`SessionContext`] owns everything a working session accumulates — the
//! retriever handle, chat history, and generated artifacts. The core
//! components stay stateless; each operation takes the session by reference.
//!
//! [`process_documents`] is the full ingestion flow:
//! save → load → split → embed+index → cleanup.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::chunk;
use crate::config::Config;
use crate::embedding::OpenAiEmbedder;
use crate::index::{self, Retriever};
use crate::ingest::{self, Upload};
use crate::models::{ChatHistory, FlashcardSet, LessonPlan, Quiz};

/// Mutable state for one working session.
///
/// Artifacts are transient and rebuildable; only the index behind the
/// retriever is persisted.
#[derive(Default)]
pub struct SessionContext {
    pub retriever: Option<Retriever>,
    pub chat_history: ChatHistory,
    pub flashcards: FlashcardSet,
    pub quiz: Option<Quiz>,
    pub lesson_plan: Option<LessonPlan>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Run the full ingestion pipeline over a set of uploads and bind the
/// resulting retriever into the session.
///
/// Per-file extraction failures are skipped and counted; an indexing or
/// embedding failure aborts and leaves the session's retriever unchanged.
/// The scratch area is cleared only after indexing has consumed it.
pub async fn process_documents(
    config: &Config,
    session: &mut SessionContext,
    uploads: &[Upload],
) -> Result<()> {
    ingest::save_uploads(config, uploads)?;
    let outcome = ingest::load_documents(config)?;

    if outcome.documents.is_empty() {
        ingest::cleanup_scratch(config)?;
        bail!("no readable documents found in upload");
    }

    let chunks = chunk::split_documents(
        &outcome.documents,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    let store = index::open_index(config).await?;
    let embedder = Arc::new(OpenAiEmbedder::from_config(&config.openai)?);
    let retriever = index::index_chunks(
        store,
        embedder,
        &chunks,
        config.openai.batch_size,
        config.retrieval.k,
    )
    .await?;

    ingest::cleanup_scratch(config)?;
    session.retriever = Some(retriever);

    println!("process");
    println!("  documents loaded: {}", outcome.documents.len());
    if outcome.skipped > 0 {
        println!("  documents skipped: {}", outcome.skipped);
    }
    println!("  chunks indexed: {}", chunks.len());
    println!("ok");

    Ok(())
}

/// Reconstruct a retriever over the persisted index, without re-ingesting
/// or re-embedding anything.
pub async fn open_retriever(config: &Config) -> Result<Retriever> {
    let store = index::open_index(config).await?;
    let embedder = Arc::new(OpenAiEmbedder::from_config(&config.openai)?);
    Ok(Retriever::new(store, embedder, config.retrieval.k))
}

/// Delete all indexed content and drop the session's retriever binding.
pub async fn clear_index(config: &Config, session: &mut SessionContext) -> Result<()> {
    let store = index::open_index(config).await?;
    store.clear().await?;
    session.retriever = None;
    Ok(())
}
