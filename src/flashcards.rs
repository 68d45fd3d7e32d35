//! Flashcard generation over retrieved content.
//!
//! Pulls a candidate pool from the retriever (empty query, wide k), walks it
//! in retrieval order, and asks the model for one card per unseen chunk.
//! Per-item failures — malformed responses, cards with no input expression —
//! are skipped and the loop continues; only capability failures abort.
//! Each run produces a fresh set; the caller replaces, never merges.

use std::collections::HashSet;

use anyhow::Result;

use crate::completion::ChatModel;
use crate::generate::{self, FieldSpec, GenerationError};
use crate::index::Retriever;
use crate::models::{Flashcard, FlashcardSet};

/// Response schema for a single flashcard.
pub const FLASHCARD_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "input_expression",
        description: "The main concept or question",
    },
    FieldSpec {
        name: "output_expression",
        description: "The explanation or answer",
    },
    FieldSpec {
        name: "example_usage",
        description: "An example that illustrates the concept",
    },
    FieldSpec {
        name: "source",
        description: "Reference to source material",
    },
];

const FLASHCARD_INSTRUCTION: &str = "Generate a study flashcard based on the following content. \
     Create a clear concept-explanation pair that helps understand the key idea.";

/// Dedup key for one candidate chunk: its first 200 characters, trimmed.
pub fn fingerprint(text: &str) -> String {
    text.chars().take(200).collect::<String>().trim().to_string()
}

/// Generate up to `max_count` flashcards from the retriever's content.
///
/// Candidates are consumed in retrieval order. A chunk is skipped when its
/// fingerprint is empty or already produced a card this run; a candidate is
/// skipped (not counted) when the model's response is malformed or yields an
/// invalid card. The set replaces any previous one entirely.
pub async fn generate_flashcards(
    model: &dyn ChatModel,
    retriever: &Retriever,
    candidate_k: usize,
    max_count: usize,
) -> Result<FlashcardSet> {
    let candidates = retriever.retrieve_k("", candidate_k).await?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut cards: Vec<Flashcard> = Vec::new();

    for chunk in &candidates {
        if cards.len() >= max_count {
            break;
        }

        let print = fingerprint(&chunk.text);
        if print.is_empty() || seen.contains(&print) {
            continue;
        }

        match generate::generate(model, &chunk.text, FLASHCARD_INSTRUCTION, FLASHCARD_SCHEMA).await
        {
            Ok(record) => {
                let mut card = Flashcard {
                    input_expression: generate::field_str(&record, "input_expression"),
                    output_expression: generate::field_str(&record, "output_expression"),
                    example_usage: generate::field_str(&record, "example_usage"),
                    source: generate::field_str(&record, "source"),
                };
                if !card.is_valid() {
                    continue;
                }
                if card.source.is_empty() {
                    card.source = chunk.source.clone();
                }
                seen.insert(print);
                cards.push(card);
            }
            Err(GenerationError::MalformedResponse(reason)) => {
                eprintln!("Warning: skipping malformed flashcard response: {}", reason);
                continue;
            }
            Err(GenerationError::Capability(e)) => return Err(e),
        }
    }

    Ok(FlashcardSet { flashcards: cards })
}
