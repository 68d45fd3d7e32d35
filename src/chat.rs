//! Context-grounded question answering.
//!
//! Retrieves context for the query, composes a prompt instructing the model
//! to answer strictly from that context, and returns the raw model output —
//! no post-parsing, no schema, no retry. Empty or refusal-style answers are
//! passed through for the caller to judge.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::completion::ChatModel;
use crate::index::Retriever;
use crate::models::ChatHistory;

/// Answer one question strictly from retrieved context.
pub async fn answer(model: &dyn ChatModel, retriever: &Retriever, query: &str) -> Result<String> {
    let chunks = retriever.retrieve(query).await?;
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = format!(
        "Answer the question based only on the following context:\n\n{}\n\nQuestion: {}",
        context, query
    );
    model.complete(&prompt).await
}

/// Interactive question loop over stdin.
///
/// Each exchange is appended to the session history. Exits on EOF or an
/// `exit`/`quit` line. The `>` prompt is only printed when stdin is a
/// terminal, keeping piped input clean.
pub async fn run_repl(
    model: &dyn ChatModel,
    retriever: &Retriever,
    history: &mut ChatHistory,
) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }

        let reply = answer(model, retriever, query).await?;
        println!("{}", reply);
        history.push(query, &reply);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::index::{SqliteIndex, VectorIndex};
    use crate::models::Chunk;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fake"
        }
        fn dims(&self) -> usize {
            self.0.len()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    struct EchoModel {
        last_prompt: Mutex<String>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            Ok("grounded answer".to_string())
        }
    }

    #[tokio::test]
    async fn test_answer_prompt_embeds_context_and_question() {
        let tmp = tempfile::TempDir::new().unwrap();
        let index = SqliteIndex::open(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        let chunks = vec![
            Chunk {
                id: "a".into(),
                source: "notes.pdf".into(),
                chunk_index: 0,
                text: "osmosis moves water across membranes".into(),
                hash: String::new(),
            },
            Chunk {
                id: "b".into(),
                source: "notes.pdf".into(),
                chunk_index: 1,
                text: "diffusion follows concentration gradients".into(),
                hash: String::new(),
            },
        ];
        index
            .append(&chunks, &[vec![1.0, 0.0], vec![0.8, 0.2]], "fake")
            .await
            .unwrap();

        let retriever = Retriever::new(
            Arc::new(index),
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            7,
        );
        let model = EchoModel {
            last_prompt: Mutex::new(String::new()),
        };

        let reply = answer(&model, &retriever, "what is osmosis?").await.unwrap();
        assert_eq!(reply, "grounded answer");

        let prompt = model.last_prompt.lock().unwrap().clone();
        assert!(prompt.starts_with("Answer the question based only on the following context:"));
        assert!(prompt.contains("osmosis moves water across membranes"));
        assert!(prompt.contains("diffusion follows concentration gradients"));
        assert!(prompt.ends_with("Question: what is osmosis?"));
        // Context appears in rank order: best match first.
        let osmosis_at = prompt.find("osmosis moves").unwrap();
        let diffusion_at = prompt.find("diffusion follows").unwrap();
        assert!(osmosis_at < diffusion_at);
    }
}
