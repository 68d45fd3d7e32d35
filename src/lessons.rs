//! Quiz and lesson-plan generation.
//!
//! Both artifacts are singular per session: one completion call over the
//! concatenation of everything the retriever returns for an empty query, no
//! retry, no dedup. A malformed response fails the operation (there is no
//! per-item loop to absorb it).

use anyhow::Result;

use crate::completion::ChatModel;
use crate::generate::{self, FieldSpec};
use crate::index::Retriever;
use crate::models::{LessonPlan, Quiz};

/// Response schema for a practice quiz.
pub const QUIZ_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "questions",
        description: "List of quiz questions",
    },
    FieldSpec {
        name: "answers",
        description: "Corresponding answers with explanations",
    },
    FieldSpec {
        name: "difficulty",
        description: "Difficulty level of each question",
    },
];

/// Response schema for a 7-day lesson plan.
pub const LESSON_PLAN_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "week_plan",
        description: "Daily learning objectives and activities for 7 days",
    },
    FieldSpec {
        name: "topics",
        description: "Main topics to be covered",
    },
    FieldSpec {
        name: "resources",
        description: "Additional learning resources and tips",
    },
];

const QUIZ_INSTRUCTION: &str = "Generate a quiz based on this content. \
     Create varied question types (multiple choice, short answer, etc.)";

const PLAN_INSTRUCTION: &str = "Create a 7-day lesson plan from this content. \
     Break down the material into daily learning objectives.";

/// Everything the retriever returns for an empty query, joined with
/// newlines in rank order.
async fn gather_content(retriever: &Retriever) -> Result<String> {
    let chunks = retriever.retrieve("").await?;
    Ok(chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Generate a practice quiz from the indexed content.
///
/// The three response sequences are truncated to their common length so the
/// positional alignment invariant always holds.
pub async fn generate_quiz(model: &dyn ChatModel, retriever: &Retriever) -> Result<Quiz> {
    let content = gather_content(retriever).await?;
    let record = generate::generate(model, &content, QUIZ_INSTRUCTION, QUIZ_SCHEMA).await?;

    Ok(Quiz::aligned(
        generate::field_list(&record, "questions"),
        generate::field_list(&record, "answers"),
        generate::field_list(&record, "difficulty"),
    ))
}

/// Generate a 7-day lesson plan from the indexed content.
pub async fn generate_lesson_plan(
    model: &dyn ChatModel,
    retriever: &Retriever,
) -> Result<LessonPlan> {
    let content = gather_content(retriever).await?;
    let record = generate::generate(model, &content, PLAN_INSTRUCTION, LESSON_PLAN_SCHEMA).await?;

    Ok(LessonPlan {
        week_plan: generate::field_str(&record, "week_plan"),
        topics: generate::field_str(&record, "topics"),
        resources: generate::field_str(&record, "resources"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::index::{index_chunks, SqliteIndex, VectorIndex};
    use crate::models::Chunk;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct UniformEmbedder;

    #[async_trait]
    impl Embedder for UniformEmbedder {
        fn model_name(&self) -> &str {
            "fake"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// Chat model that returns one canned response and records the prompt.
    struct CannedModel {
        response: String,
        last_prompt: Mutex<String>,
    }

    impl CannedModel {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                last_prompt: Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            Ok(self.response.clone())
        }
    }

    async fn retriever_over(texts: &[&str]) -> (tempfile::TempDir, Retriever) {
        let tmp = tempfile::TempDir::new().unwrap();
        let index: Arc<dyn VectorIndex> = Arc::new(
            SqliteIndex::open(&tmp.path().join("index.sqlite"))
                .await
                .unwrap(),
        );
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                id: format!("c{}", i),
                source: "notes.pdf".to_string(),
                chunk_index: i as i64,
                text: t.to_string(),
                hash: String::new(),
            })
            .collect();
        let retriever = index_chunks(index, Arc::new(UniformEmbedder), &chunks, 16, 7)
            .await
            .unwrap();
        (tmp, retriever)
    }

    #[tokio::test]
    async fn test_quiz_sequences_stay_aligned() {
        let (_tmp, retriever) = retriever_over(&["the krebs cycle", "glycolysis"]).await;
        let model = CannedModel::new(
            "```json\n{\"questions\": [\"q1\", \"q2\", \"q3\"], \"answers\": [\"a1\", \"a2\"], \"difficulty\": [\"easy\", \"hard\", \"hard\"]}\n```",
        );

        let quiz = generate_quiz(&model, &retriever).await.unwrap();
        assert_eq!(quiz.questions.len(), quiz.answers.len());
        assert_eq!(quiz.answers.len(), quiz.difficulty.len());
        assert_eq!(quiz.len(), 2);
    }

    #[tokio::test]
    async fn test_quiz_prompt_contains_all_retrieved_chunks() {
        let (_tmp, retriever) = retriever_over(&["the krebs cycle", "glycolysis"]).await;
        let model = CannedModel::new(
            "```json\n{\"questions\": [], \"answers\": [], \"difficulty\": []}\n```",
        );

        generate_quiz(&model, &retriever).await.unwrap();
        let prompt = model.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("the krebs cycle"));
        assert!(prompt.contains("glycolysis"));
        assert!(prompt.contains("```json"));
    }

    #[tokio::test]
    async fn test_quiz_malformed_response_fails_operation() {
        let (_tmp, retriever) = retriever_over(&["material"]).await;
        let model = CannedModel::new("no structure whatsoever");
        assert!(generate_quiz(&model, &retriever).await.is_err());
    }

    #[tokio::test]
    async fn test_lesson_plan_fields_populated_with_defaults() {
        let (_tmp, retriever) = retriever_over(&["material"]).await;
        let model = CannedModel::new(
            "```json\n{\"week_plan\": \"Day 1: read. Day 2: review.\"}\n```",
        );

        let plan = generate_lesson_plan(&model, &retriever).await.unwrap();
        assert!(plan.week_plan.contains("Day 1"));
        // Fields the model omitted come back as empty defaults, not errors.
        assert_eq!(plan.topics, "");
        assert_eq!(plan.resources, "");
    }
}
