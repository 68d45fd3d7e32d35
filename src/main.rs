//! # CramKit CLI (`cram`)
//!
//! The `cram` binary is the interface to CramKit. It covers the whole
//! study pipeline: document ingestion, grounded Q&A, and artifact
//! generation (flashcards, quizzes, lesson plans).
//!
//! ## Usage
//!
//! ```bash
//! cram --config ./config/cram.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cram init` | Create the scratch area and the persisted index |
//! | `cram process <files>...` | Ingest, chunk, embed, and index documents |
//! | `cram ask "<question>"` | Answer one question from indexed content |
//! | `cram chat` | Interactive Q&A session with history |
//! | `cram flashcards generate` | Build a fresh flashcard set |
//! | `cram flashcards import <path>` | Load and display an exported set |
//! | `cram quiz` | Generate a practice quiz |
//! | `cram plan` | Generate a 7-day lesson plan |
//! | `cram status` | Show index backend and entry count |
//! | `cram clear` | Delete all indexed content |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cramkit::completion::OpenAiChat;
use cramkit::config::{self, Config};
use cramkit::models::{FlashcardSet, LessonPlan, Quiz};
use cramkit::{chat, export, flashcards, index, ingest, lessons, session};

/// CramKit CLI — a retrieval-grounded study assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Capability credentials come from the environment
/// (`OPENAI_API_KEY`; `PINECONE_API_KEY` for the remote index backend).
#[derive(Parser)]
#[command(
    name = "cram",
    about = "CramKit — a retrieval-grounded study assistant",
    version,
    long_about = "CramKit ingests uploaded documents, indexes them for semantic search, and \
    uses the indexed content to answer questions and generate flashcards, quizzes, and \
    lesson plans."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cram.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the scratch area and the persisted index.
    ///
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest documents: save to scratch, extract text, chunk, embed,
    /// and append to the index.
    ///
    /// Unreadable files are skipped with a warning; the scratch area is
    /// cleared once indexing completes.
    Process {
        /// Files to ingest (PDF, DOCX, TXT, MD).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer a single question strictly from the indexed content.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Interactive question-answering session.
    ///
    /// Reads questions from stdin until EOF or `exit`; each exchange is
    /// kept in the session history.
    Chat,

    /// Flashcard generation and exchange.
    Flashcards {
        #[command(subcommand)]
        action: FlashcardsAction,
    },

    /// Generate a practice quiz from the indexed content.
    Quiz,

    /// Generate a 7-day lesson plan from the indexed content.
    Plan,

    /// Show the index backend and entry count.
    Status,

    /// Delete all indexed content, leaving an empty queryable index.
    Clear,
}

/// Flashcard subcommands.
#[derive(Subcommand)]
enum FlashcardsAction {
    /// Generate a fresh flashcard set (replaces any previous set).
    Generate {
        /// Maximum cards to produce (defaults to generation.max_flashcards).
        #[arg(long)]
        count: Option<usize>,

        /// Also export the set as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a previously exported set and display it.
    Import {
        /// Path to a `{"flashcards": [...]}` JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            run_init(&cfg).await?;
        }
        Commands::Process { files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                uploads.push(ingest::Upload::from_path(path)?);
            }
            let mut session_ctx = session::SessionContext::new();
            session::process_documents(&cfg, &mut session_ctx, &uploads).await?;
        }
        Commands::Ask { question } => {
            let retriever = session::open_retriever(&cfg).await?;
            let model = OpenAiChat::from_config(&cfg.openai)?;
            let reply = chat::answer(&model, &retriever, &question).await?;
            println!("{}", reply);
        }
        Commands::Chat => {
            let retriever = session::open_retriever(&cfg).await?;
            let model = OpenAiChat::from_config(&cfg.openai)?;
            let mut session_ctx = session::SessionContext::new();
            chat::run_repl(&model, &retriever, &mut session_ctx.chat_history).await?;
            if !session_ctx.chat_history.is_empty() {
                eprintln!("({} exchanges this session)", session_ctx.chat_history.len());
            }
        }
        Commands::Flashcards { action } => match action {
            FlashcardsAction::Generate { count, output } => {
                let retriever = session::open_retriever(&cfg).await?;
                let model = OpenAiChat::from_config(&cfg.openai)?;
                let max_count = count.unwrap_or(cfg.generation.max_flashcards);

                let set = flashcards::generate_flashcards(
                    &model,
                    &retriever,
                    cfg.retrieval.candidate_k,
                    max_count,
                )
                .await?;

                let mut session_ctx = session::SessionContext::new();
                session_ctx.flashcards = set;

                println!("Generated {} flashcards.", session_ctx.flashcards.len());
                println!();
                print_flashcards(&session_ctx.flashcards);

                if let Some(path) = output {
                    export::run_export(&session_ctx.flashcards, Some(&path))?;
                }
            }
            FlashcardsAction::Import { path } => {
                let set = export::run_import(&path)?;
                println!("Imported {} flashcards.", set.len());
                println!();
                print_flashcards(&set);
            }
        },
        Commands::Quiz => {
            let retriever = session::open_retriever(&cfg).await?;
            let model = OpenAiChat::from_config(&cfg.openai)?;
            let mut session_ctx = session::SessionContext::new();
            session_ctx.quiz = Some(lessons::generate_quiz(&model, &retriever).await?);
            if let Some(ref quiz) = session_ctx.quiz {
                print_quiz(quiz);
            }
        }
        Commands::Plan => {
            let retriever = session::open_retriever(&cfg).await?;
            let model = OpenAiChat::from_config(&cfg.openai)?;
            let mut session_ctx = session::SessionContext::new();
            session_ctx.lesson_plan =
                Some(lessons::generate_lesson_plan(&model, &retriever).await?);
            if let Some(ref plan) = session_ctx.lesson_plan {
                print_lesson_plan(plan);
            }
        }
        Commands::Status => {
            run_status(&cfg).await?;
        }
        Commands::Clear => {
            let mut session_ctx = session::SessionContext::new();
            session::clear_index(&cfg, &mut session_ctx).await?;
            println!("Index cleared.");
        }
    }

    Ok(())
}

async fn run_init(cfg: &Config) -> Result<()> {
    std::fs::create_dir_all(&cfg.storage.scratch_dir)?;
    // Opening the local backend creates the database and its schema; the
    // remote backend needs no initialization.
    let store = index::open_index(cfg).await?;
    let entries = store.count().await.unwrap_or(0);
    println!("Initialized.");
    println!("  scratch: {}", cfg.storage.scratch_dir.display());
    println!("  index:   {} ({} entries)", cfg.index.backend, entries);
    Ok(())
}

async fn run_status(cfg: &Config) -> Result<()> {
    let store = index::open_index(cfg).await?;
    let entries = store.count().await?;

    println!("CramKit — Index Status");
    println!("======================");
    println!();
    println!("  backend:  {}", cfg.index.backend);
    if cfg.index.backend == "local" {
        println!("  location: {}", cfg.index.path.display());
    }
    println!("  entries:  {}", entries);
    Ok(())
}

fn print_flashcards(set: &FlashcardSet) {
    for (i, card) in set.flashcards.iter().enumerate() {
        println!("--- Card {} ---", i + 1);
        println!("Q: {}", card.input_expression);
        println!("A: {}", card.output_expression);
        if !card.example_usage.is_empty() {
            println!("Example: {}", card.example_usage);
        }
        if !card.source.is_empty() {
            println!("Source: {}", card.source);
        }
        println!();
    }
}

fn print_quiz(quiz: &Quiz) {
    if quiz.is_empty() {
        println!("The model produced no quiz questions.");
        return;
    }
    println!("--- Practice Quiz ---");
    for (i, ((question, answer), difficulty)) in quiz
        .questions
        .iter()
        .zip(quiz.answers.iter())
        .zip(quiz.difficulty.iter())
        .enumerate()
    {
        println!();
        println!("Question {} ({})", i + 1, difficulty);
        println!("{}", question);
        println!("Answer: {}", answer);
    }
}

fn print_lesson_plan(plan: &LessonPlan) {
    println!("--- 7-Day Study Plan ---");
    println!("{}", plan.week_plan);
    println!();
    println!("--- Main Topics ---");
    println!("{}", plan.topics);
    println!();
    println!("--- Additional Resources ---");
    println!("{}", plan.resources);
}
