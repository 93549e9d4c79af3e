//! CLI module for the legal QA pipeline
//!
//! Provides the `ask` subcommand, which runs a question through the
//! full pipeline against the configured generation backend.

pub mod ask;

use clap::{Parser, Subcommand};

/// Legal QA - retrieval-augmented legal question answering
#[derive(Parser)]
#[command(name = "legal-qa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer a legal question
    Ask(ask::AskArgs),
}
