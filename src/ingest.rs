//! Scratch-area handling for uploaded documents.
//!
//! Uploads are written to a dedicated scratch directory under fresh unique
//! names, loaded into normalized [`Document`]s via text extraction, and the
//! scratch area is cleared once indexing has consumed them. Scratch contents
//! are never assumed stable across calls.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract;
use crate::models::Document;

/// An uploaded file: raw bytes plus the name the user gave it.
///
/// Transient — exists only for the duration of the ingestion call.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read upload: {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { filename, bytes })
    }
}

/// Outcome of a [`load_documents`] pass.
#[derive(Debug)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    /// Files present in the scratch area that could not be parsed.
    pub skipped: usize,
}

/// Write uploads into the scratch area.
///
/// Every call generates fresh names (original stem + UUID, original
/// extension preserved), so existing scratch files are never overwritten.
pub fn save_uploads(config: &Config, uploads: &[Upload]) -> Result<Vec<PathBuf>> {
    let dir = &config.storage.scratch_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create scratch dir: {}", dir.display()))?;

    let mut saved = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let original = Path::new(&upload.filename);
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let ext = original
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");

        let path = dir.join(format!("{}-{}.{}", stem, Uuid::new_v4(), ext));
        std::fs::write(&path, &upload.bytes)
            .with_context(|| format!("Failed to write scratch file: {}", path.display()))?;
        saved.push(path);
    }

    Ok(saved)
}

/// Load eligible scratch files into normalized documents.
///
/// Eligibility is the configured include-glob filter. Files that fail
/// extraction are skipped with a warning and counted — successfully parsed
/// documents are never lost to a bad neighbor.
pub fn load_documents(config: &Config) -> Result<LoadOutcome> {
    let dir = &config.storage.scratch_dir;
    if !dir.exists() {
        return Ok(LoadOutcome {
            documents: Vec::new(),
            skipped: 0,
        });
    }

    let include_set = build_globset(&config.ingest.include_globs)?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if include_set.is_match(relative) {
            paths.push(entry.path().to_path_buf());
        }
    }
    // Deterministic load order regardless of directory iteration order.
    paths.sort();

    let mut documents = Vec::new();
    let mut skipped = 0usize;
    for path in &paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match extract::extract_file(path) {
            Ok(content) => {
                let metadata_json =
                    serde_json::json!({ "path": path.display().to_string() }).to_string();
                documents.push(Document {
                    content,
                    source: filename,
                    metadata_json,
                });
            }
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", filename, e);
                skipped += 1;
            }
        }
    }

    Ok(LoadOutcome { documents, skipped })
}

/// Delete every file in the scratch area.
///
/// Idempotent: an empty or missing scratch area is a no-op.
pub fn cleanup_scratch(config: &Config) -> Result<()> {
    let dir = &config.storage.scratch_dir;
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, IngestConfig, StorageConfig};

    fn test_config(scratch: &Path, globs: &[&str]) -> Config {
        Config {
            storage: StorageConfig {
                scratch_dir: scratch.to_path_buf(),
            },
            index: Default::default(),
            chunking: Default::default(),
            ingest: IngestConfig {
                include_globs: globs.iter().map(|g| g.to_string()).collect(),
            },
            retrieval: Default::default(),
            generation: Default::default(),
            openai: Default::default(),
        }
    }

    #[test]
    fn test_save_generates_fresh_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path(), &["**/*.pdf"]);
        let upload = Upload {
            filename: "biology.pdf".to_string(),
            bytes: b"fake".to_vec(),
        };

        let first = save_uploads(&config, &[upload.clone()]).unwrap();
        let second = save_uploads(&config, &[upload]).unwrap();
        assert_ne!(first[0], second[0]);
        assert!(first[0].exists() && second[0].exists());
        assert_eq!(first[0].extension().unwrap(), "pdf");
    }

    #[test]
    fn test_load_skips_corrupt_files_but_keeps_good_ones() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path(), &["**/*.pdf", "**/*.txt"]);
        std::fs::write(tmp.path().join("bad.pdf"), b"not a pdf").unwrap();
        std::fs::write(tmp.path().join("good.txt"), "cell division notes").unwrap();

        let outcome = load_documents(&config).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].content, "cell division notes");
        assert_eq!(outcome.documents[0].source, "good.txt");
    }

    #[test]
    fn test_load_respects_include_globs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path(), &["**/*.txt"]);
        std::fs::write(tmp.path().join("keep.txt"), "kept").unwrap();
        std::fs::write(tmp.path().join("ignore.csv"), "a,b").unwrap();

        let outcome = load_documents(&config).unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn test_load_on_missing_dir_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(&tmp.path().join("never-created"), &["**/*.pdf"]);
        let outcome = load_documents(&config).unwrap();
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn test_cleanup_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path(), &["**/*.txt"]);
        std::fs::write(tmp.path().join("a.txt"), "x").unwrap();

        cleanup_scratch(&config).unwrap();
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        // Second pass over the now-empty area must not fail.
        cleanup_scratch(&config).unwrap();

        // And a missing area is also a no-op.
        let gone = test_config(&tmp.path().join("missing"), &["**/*.txt"]);
        cleanup_scratch(&gone).unwrap();
    }
}
