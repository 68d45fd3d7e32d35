//! # CramKit
//!
//! A retrieval-grounded study assistant.
//!
//! CramKit ingests uploaded documents (PDF, DOCX, plain text), chunks and
//! embeds them into a persistent vector index, and uses the indexed content
//! to drive three generative features: grounded question answering,
//! flashcard generation, and quiz / lesson-plan generation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Uploads  │──▶│  Ingestion    │──▶│   Vector    │
//! │ PDF/DOCX │   │ Extract+Chunk │   │   Index     │
//! └──────────┘   └──────────────┘   └──────┬──────┘
//!                                          │ Retriever
//!                     ┌────────────────────┼──────────────────┐
//!                     ▼                    ▼                  ▼
//!               ┌──────────┐        ┌───────────┐      ┌───────────┐
//!               │   Chat   │        │ Flashcards │      │ Quiz/Plan │
//!               │ (answer) │        │  (cards)   │      │ (lessons) │
//!               └──────────┘        └───────────┘      └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cram init                          # create scratch area and index
//! cram process notes.pdf slides.pdf  # ingest and index documents
//! cram ask "what is osmosis?"        # grounded one-shot answer
//! cram flashcards generate           # build a flashcard set
//! cram quiz                          # generate a practice quiz
//! cram plan                          # generate a 7-day lesson plan
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types and study artifacts |
//! | [`ingest`] | Scratch-area upload handling |
//! | [`extract`] | PDF/DOCX/plain-text extraction |
//! | [`chunk`] | Fixed-size overlapping chunker |
//! | [`embedding`] | Embedding capability + vector utilities |
//! | [`completion`] | Language-model completion capability |
//! | [`index`] | Vector index backends and retrieval |
//! | [`generate`] | Schema-shaped structured generation |
//! | [`flashcards`] | Flashcard orchestration |
//! | [`lessons`] | Quiz and lesson-plan orchestration |
//! | [`chat`] | Grounded question answering |
//! | [`session`] | Session state and pipeline orchestration |
//! | [`export`] | Flashcard JSON export/import |

pub mod chat;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod export;
pub mod extract;
pub mod flashcards;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod lessons;
pub mod migrate;
pub mod models;
pub mod session;
