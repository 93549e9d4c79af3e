use clap::Parser;
use legal_qa::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ask(args) => cli::ask::run(args).await,
    }
}
