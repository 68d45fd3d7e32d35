//! Vector index backends and retrieval.
//!
//! The [`VectorIndex`] trait abstracts the persisted store of
//! `(chunk, embedding)` entries. Two backends implement the same contract:
//!
//! - **[`SqliteIndex`]** — durable local index; embeddings stored as
//!   little-endian f32 BLOBs, ranking done in-process by cosine similarity.
//! - **[`RemoteIndex`]** — hosted HTTP index (Pinecone-style REST); ranking
//!   is delegated to the service.
//!
//! Entries are owned by the index and only surface through retrieval
//! results. Repeated indexing **appends**: prior contents remain queryable
//! until [`VectorIndex::clear`] is called explicitly.
//!
//! At most one writer per index location at a time; retrievals may run
//! alongside each other but callers must not interleave them with `clear`
//! against the same location.
//!
//! [`Retriever`] binds an index to an embedder and a fixed result width,
//! exposing top-k semantic lookup by query text.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::{Config, RemoteIndexConfig};
use crate::db;
use crate::embedding::{self, Embedder};
use crate::migrate;
use crate::models::Chunk;

/// A chunk retrieved from the index with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Persisted store of `(chunk, embedding)` entries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append entries to the index. Prior contents remain queryable.
    async fn append(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<()>;

    /// The top `k` entries by similarity to `query`, highest first. Equal
    /// similarities resolve by insertion order (earliest first).
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Mean of all stored vectors, if the backend can compute it. Used as
    /// the deterministic stand-in for empty-query retrieval.
    async fn centroid(&self) -> Result<Option<Vec<f32>>>;

    /// Delete all entries, leaving an empty queryable index. Tolerates the
    /// storage location not yet existing.
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64>;
}

// ============ Local SQLite index ============

/// Durable local index backed by SQLite.
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (creating if missing) the index database at `path` and ensure
    /// its schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn append(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            let blob = embedding::vec_to_blob(vector);
            sqlx::query(
                r#"
                INSERT INTO index_entries
                    (chunk_id, source, chunk_index, text, hash, embedding, dims, model, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.source)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(&blob)
            .bind(vector.len() as i64)
            .bind(model)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            "SELECT position, chunk_id, source, chunk_index, text, hash, embedding \
             FROM index_entries ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        struct Candidate {
            position: i64,
            scored: ScoredChunk,
        }

        let mut candidates: Vec<Candidate> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = embedding::blob_to_vec(&blob);
                let score = embedding::cosine_similarity(query, &vector);
                Candidate {
                    position: row.get("position"),
                    scored: ScoredChunk {
                        chunk: Chunk {
                            id: row.get("chunk_id"),
                            source: row.get("source"),
                            chunk_index: row.get("chunk_index"),
                            text: row.get("text"),
                            hash: row.get("hash"),
                        },
                        score,
                    },
                }
            })
            .collect();

        // Similarity descending; ties resolve to the earliest-indexed entry.
        candidates.sort_by(|a, b| {
            b.scored
                .score
                .partial_cmp(&a.scored.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        candidates.truncate(k);

        Ok(candidates.into_iter().map(|c| c.scored).collect())
    }

    async fn centroid(&self) -> Result<Option<Vec<f32>>> {
        let rows = sqlx::query("SELECT embedding FROM index_entries")
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut sum: Vec<f32> = Vec::new();
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let vector = embedding::blob_to_vec(&blob);
            if sum.is_empty() {
                sum = vec![0.0; vector.len()];
            }
            for (s, v) in sum.iter_mut().zip(vector.iter()) {
                *s += v;
            }
        }

        let n = rows.len() as f32;
        for s in sum.iter_mut() {
            *s /= n;
        }
        Ok(Some(sum))
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM index_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

// ============ Remote hosted index ============

/// Hosted HTTP index speaking a Pinecone-style REST protocol.
///
/// Chunk text and metadata travel in the vector metadata so retrieval
/// results can be reconstructed without a second lookup. The service owns
/// ranking; this backend cannot compute a centroid, so empty-query
/// retrieval falls back to embedding the (space-substituted) query.
pub struct RemoteIndex {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteIndex {
    pub fn new(config: &RemoteIndexConfig, timeout_secs: u64) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            bail!("Remote index error {} on {}: {}", status, path, body_text);
        }

        Ok(resp.json().await.unwrap_or(serde_json::json!({})))
    }
}

#[async_trait]
impl VectorIndex for RemoteIndex {
    async fn append(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let payload: Vec<serde_json::Value> = chunks
            .iter()
            .zip(vectors.iter())
            .map(|(chunk, vector)| {
                serde_json::json!({
                    "id": chunk.id,
                    "values": vector,
                    "metadata": {
                        "source": chunk.source,
                        "chunk_index": chunk.chunk_index,
                        "text": chunk.text,
                        "hash": chunk.hash,
                        "model": model,
                    },
                })
            })
            .collect();

        self.post("/vectors/upsert", serde_json::json!({ "vectors": payload }))
            .await?;
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let json = self
            .post(
                "/query",
                serde_json::json!({
                    "vector": query,
                    "topK": k,
                    "includeMetadata": true,
                }),
            )
            .await?;

        let matches = json
            .get("matches")
            .and_then(|m| m.as_array())
            .cloned()
            .unwrap_or_default();

        let results = matches
            .iter()
            .map(|m| {
                let meta = m.get("metadata").cloned().unwrap_or(serde_json::json!({}));
                let text_of = |key: &str| {
                    meta.get(key)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                };
                ScoredChunk {
                    chunk: Chunk {
                        id: m
                            .get("id")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        source: text_of("source"),
                        chunk_index: meta
                            .get("chunk_index")
                            .and_then(|v| v.as_i64())
                            .unwrap_or(0),
                        text: text_of("text"),
                        hash: text_of("hash"),
                    },
                    score: m.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
                }
            })
            .collect();

        Ok(results)
    }

    async fn centroid(&self) -> Result<Option<Vec<f32>>> {
        Ok(None)
    }

    async fn clear(&self) -> Result<()> {
        self.post("/vectors/delete", serde_json::json!({ "deleteAll": true }))
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let json = self
            .post("/describe_index_stats", serde_json::json!({}))
            .await?;
        Ok(json
            .get("totalVectorCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }
}

// ============ Retriever ============

/// Top-k semantic lookup bound to one index and one embedder.
///
/// `k` is fixed at creation; artifact generation widens the pool with
/// [`Retriever::retrieve_k`].
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>, k: usize) -> Self {
        Self { index, embedder, k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Top-k chunks for `query`, similarity descending.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        self.retrieve_k(query, self.k).await
    }

    /// Same as [`retrieve`](Self::retrieve) with an explicit width.
    ///
    /// An empty query samples across all indexed content: the index
    /// centroid stands in for the query vector (no capability call), and an
    /// empty index yields an empty result rather than an error.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if self.index.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_vec = if query.trim().is_empty() {
            match self.index.centroid().await? {
                Some(center) => center,
                None => embedding::embed_query(self.embedder.as_ref(), query).await?,
            }
        } else {
            embedding::embed_query(self.embedder.as_ref(), query).await?
        };

        let scored = self.index.search(&query_vec, k).await?;
        Ok(scored.into_iter().map(|s| s.chunk).collect())
    }
}

// ============ Indexing pipeline ============

/// Embed chunks in batches and append them to the index, returning a
/// retriever over the result.
///
/// A capability or storage failure aborts the whole operation; entries from
/// completed batches remain (the index is append-only until cleared).
pub async fn index_chunks(
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chunks: &[Chunk],
    batch_size: usize,
    k: usize,
) -> Result<Retriever> {
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        index.append(batch, &vectors, embedder.model_name()).await?;
    }

    Ok(Retriever::new(index, embedder, k))
}

/// Open the configured index backend.
pub async fn open_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    match config.index.backend.as_str() {
        "local" => Ok(Arc::new(SqliteIndex::open(&config.index.path).await?)),
        "remote" => {
            let remote = config
                .index
                .remote
                .as_ref()
                .ok_or_else(|| anyhow!("index.backend = \"remote\" but [index.remote] missing"))?;
            Ok(Arc::new(RemoteIndex::new(
                remote,
                config.openai.timeout_secs,
            )?))
        }
        other => bail!("Unknown index backend: '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic test embedder: looks vectors up by exact text.
    struct FakeEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        dims: usize,
    }

    impl FakeEmbedder {
        fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
            let dims = pairs.first().map(|(_, v)| v.len()).unwrap_or(2);
            Self {
                vectors: pairs
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.clone()))
                    .collect(),
                dims,
            }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        fn model_name(&self) -> &str {
            "fake"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.vectors
                        .get(t)
                        .cloned()
                        .unwrap_or_else(|| vec![0.0; self.dims])
                })
                .collect())
        }
    }

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source: "notes.pdf".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    async fn open_temp_index() -> (tempfile::TempDir, SqliteIndex) {
        let tmp = tempfile::TempDir::new().unwrap();
        let index = SqliteIndex::open(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        (tmp, index)
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity_descending() {
        let (_tmp, index) = open_temp_index().await;
        let chunks = vec![chunk("a", "far"), chunk("b", "near"), chunk("c", "mid")];
        let vectors = vec![
            vec![0.0, 1.0],  // orthogonal to query
            vec![1.0, 0.0],  // identical direction
            vec![1.0, 1.0],  // in between
        ];
        index.append(&chunks, &vectors, "fake").await.unwrap();

        let results = index.search(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_equal_similarity_ties_break_by_insertion_order() {
        let (_tmp, index) = open_temp_index().await;
        let chunks = vec![chunk("first", "same"), chunk("second", "same")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        index.append(&chunks, &vectors, "fake").await.unwrap();

        let results = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].chunk.id, "first");
        assert_eq!(results[1].chunk.id, "second");
    }

    #[tokio::test]
    async fn test_search_is_deterministic() {
        let (_tmp, index) = open_temp_index().await;
        let chunks: Vec<Chunk> = (0..6)
            .map(|i| chunk(&format!("c{}", i), &format!("text {}", i)))
            .collect();
        let vectors: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32, (6 - i) as f32]).collect();
        index.append(&chunks, &vectors, "fake").await.unwrap();

        let first = index.search(&[1.0, 2.0], 4).await.unwrap();
        let second = index.search(&[1.0, 2.0], 4).await.unwrap();
        let ids = |rs: &[ScoredChunk]| {
            rs.iter()
                .map(|r| r.chunk.id.clone())
                .collect::<Vec<String>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_clear_leaves_empty_queryable_index() {
        let (_tmp, index) = open_temp_index().await;
        index
            .append(&[chunk("a", "x")], &[vec![1.0, 0.0]], "fake")
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
        // Clearing an already-empty index is fine.
        index.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_centroid_is_mean_of_vectors() {
        let (_tmp, index) = open_temp_index().await;
        assert!(index.centroid().await.unwrap().is_none());

        let chunks = vec![chunk("a", "x"), chunk("b", "y")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        index.append(&chunks, &vectors, "fake").await.unwrap();

        let center = index.centroid().await.unwrap().unwrap();
        assert!((center[0] - 0.5).abs() < 1e-6);
        assert!((center[1] - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_reindex_appends_rather_than_replaces() {
        let (_tmp, index) = open_temp_index().await;
        let index: Arc<dyn VectorIndex> = Arc::new(index);
        let embedder = Arc::new(FakeEmbedder::new(&[
            ("alpha", vec![1.0, 0.0]),
            ("beta", vec![0.0, 1.0]),
        ]));

        index_chunks(
            index.clone(),
            embedder.clone(),
            &[chunk("a", "alpha")],
            16,
            7,
        )
        .await
        .unwrap();
        index_chunks(index.clone(), embedder, &[chunk("b", "beta")], 16, 7)
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_query_on_empty_index_returns_empty() {
        let (_tmp, index) = open_temp_index().await;
        let retriever = Retriever::new(Arc::new(index), Arc::new(FakeEmbedder::new(&[])), 7);
        let results = retriever.retrieve("").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_samples_via_centroid() {
        let (_tmp, index) = open_temp_index().await;
        let chunks = vec![chunk("a", "alpha"), chunk("b", "beta")];
        let vectors = vec![vec![1.0, 0.1], vec![0.9, 0.2]];
        index.append(&chunks, &vectors, "fake").await.unwrap();

        // The fake embedder would return zeros for ""; the centroid path
        // must produce real results without consulting it.
        let retriever = Retriever::new(Arc::new(index), Arc::new(FakeEmbedder::new(&[])), 7);
        let results = retriever.retrieve("").await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_retriever_respects_fixed_k() {
        let (_tmp, index) = open_temp_index().await;
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| chunk(&format!("c{}", i), &format!("t{}", i)))
            .collect();
        let vectors: Vec<Vec<f32>> = (0..5).map(|i| vec![1.0, i as f32 * 0.1]).collect();
        index.append(&chunks, &vectors, "fake").await.unwrap();

        let retriever = Retriever::new(
            Arc::new(index),
            Arc::new(FakeEmbedder::new(&[("q", vec![1.0, 0.0])])),
            2,
        );
        assert_eq!(retriever.retrieve("q").await.unwrap().len(), 2);
        assert_eq!(retriever.retrieve_k("q", 4).await.unwrap().len(), 4);
    }
}
