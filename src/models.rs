//! Core data models used throughout CramKit.
//!
//! These types represent the documents and chunks that flow through the
//! ingestion pipeline, and the study artifacts (flashcards, quizzes, lesson
//! plans) produced from them.

use serde::{Deserialize, Serialize};

/// Normalized document produced by loading an uploaded file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Extracted plain text.
    pub content: String,
    /// Originating filename, carried through to chunks and generated
    /// artifacts for provenance.
    pub source: String,
    /// Extra loader metadata as a JSON object string.
    pub metadata_json: String,
}

/// A bounded fragment of a document's content — the unit of embedding
/// and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Source filename inherited from the parent document.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A generated study flashcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(default)]
    pub input_expression: String,
    #[serde(default)]
    pub output_expression: String,
    #[serde(default)]
    pub example_usage: String,
    #[serde(default)]
    pub source: String,
}

impl Flashcard {
    /// A card with no input expression carries nothing to study and is
    /// discarded by the generation loop rather than stored.
    pub fn is_valid(&self) -> bool {
        !self.input_expression.is_empty()
    }
}

/// Ordered flashcards from one generation run.
///
/// Serializes to the canonical exchange shape `{"flashcards": [...]}`;
/// import is the exact inverse of export. A set is cleared and rebuilt on
/// every generation request, never merged across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub flashcards: Vec<Flashcard>,
}

impl FlashcardSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flashcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flashcards.is_empty()
    }
}

/// A generated practice quiz.
///
/// The three sequences are positionally aligned: index *i* across all three
/// describes one question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    pub difficulty: Vec<String>,
}

impl Quiz {
    /// Build a quiz from possibly ragged sequences, truncating all three to
    /// their common length so the alignment invariant holds.
    pub fn aligned(
        mut questions: Vec<String>,
        mut answers: Vec<String>,
        mut difficulty: Vec<String>,
    ) -> Self {
        let n = questions.len().min(answers.len()).min(difficulty.len());
        questions.truncate(n);
        answers.truncate(n);
        difficulty.truncate(n);
        Self {
            questions,
            answers,
            difficulty,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A generated 7-day lesson plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonPlan {
    /// Day-segmented learning objectives and activities.
    pub week_plan: String,
    pub topics: String,
    pub resources: String,
}

/// One question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub query: String,
    pub answer: String,
}

/// Append-only conversation log for one working session.
///
/// Lives only as long as the session; never persisted.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, query: &str, answer: &str) {
        self.turns.push(ChatTurn {
            query: query.to_string(),
            answer: answer.to_string(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
