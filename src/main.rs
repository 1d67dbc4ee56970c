use cascade_select::cli::{self, Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Walk(args) => cli::walk::run(args).await,
        Command::Levels => cli::levels::run().await,
    }
}
