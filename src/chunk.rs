//! Fixed-size overlapping text chunker.
//!
//! Splits document content into consecutive character windows of at most
//! `chunk_size` characters, each sharing `chunk_overlap` characters with its
//! predecessor. Chunks preserve their source document's metadata and order.
//!
//! Each chunk receives a fresh UUID plus a SHA-256 hash of its text for
//! staleness detection in the index.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, Document};

/// Split documents into chunks. All chunks of one document precede all
/// chunks of the next; chunk indices restart at 0 per document.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in documents {
        for (i, window) in split_text(&doc.content, chunk_size, chunk_overlap)
            .into_iter()
            .enumerate()
        {
            chunks.push(make_chunk(&doc.source, i as i64, &window));
        }
    }
    chunks
}

/// Split text into windows of at most `size` characters; consecutive windows
/// overlap by exactly `overlap` characters. `overlap < size` is validated at
/// config load, never here.
///
/// Content shorter than `size` yields exactly one window equal to the whole
/// content (an empty text still yields one empty window, so every document
/// produces at least one chunk).
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return vec![text.to_string()];
    }

    let step = size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    windows
}

fn make_chunk(source: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
