//! Flashcard set export and import.
//!
//! The exchange format is `{"flashcards": [...]}` — import reconstructs an
//! equivalent in-memory set, export is the exact inverse. Writes to a file
//! path (creating parents) or stdout for piping.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::FlashcardSet;

/// Serialize a flashcard set to its canonical JSON shape.
pub fn to_json_string(set: &FlashcardSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(set)?)
}

/// Parse a flashcard set back from its canonical JSON shape.
pub fn from_json_str(json: &str) -> Result<FlashcardSet> {
    serde_json::from_str(json).with_context(|| "Failed to parse flashcard JSON")
}

/// Export a flashcard set as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes to
/// stdout.
pub fn run_export(set: &FlashcardSet, output: Option<&Path>) -> Result<()> {
    let json = to_json_string(set)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} flashcards to {}", set.len(), path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Import a flashcard set from a JSON file.
pub fn run_import(path: &Path) -> Result<FlashcardSet> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    from_json_str(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flashcard;

    fn sample_set() -> FlashcardSet {
        FlashcardSet {
            flashcards: vec![
                Flashcard {
                    input_expression: "osmosis".into(),
                    output_expression: "diffusion of water across a membrane".into(),
                    example_usage: "water entering a root hair cell".into(),
                    source: "biology.pdf".into(),
                },
                Flashcard {
                    input_expression: "ATP".into(),
                    output_expression: "the cell's energy currency".into(),
                    example_usage: "".into(),
                    source: "biology.pdf".into(),
                },
            ],
        }
    }

    #[test]
    fn test_export_import_file_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out").join("cards.json");
        let set = sample_set();

        run_export(&set, Some(&path)).unwrap();
        let restored = run_import(&path).unwrap();
        assert_eq!(set, restored);
    }

    #[test]
    fn test_json_string_roundtrip_field_by_field() {
        let set = sample_set();
        let restored = from_json_str(&to_json_string(&set).unwrap()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.flashcards[0], set.flashcards[0]);
        assert_eq!(restored.flashcards[1].example_usage, "");
    }

    #[test]
    fn test_import_rejects_wrong_shape() {
        assert!(from_json_str("[1, 2, 3]").is_err());
        assert!(from_json_str("{\"cards\": []}").is_err());
    }

    #[test]
    fn test_empty_set_roundtrip() {
        let set = FlashcardSet::new();
        let restored = from_json_str(&to_json_string(&set).unwrap()).unwrap();
        assert!(restored.is_empty());
    }
}
