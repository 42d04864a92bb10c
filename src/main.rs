use clap::Parser;
use iam_key_core::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Demo => cli::demo::run(cli.metrics).await,
        Command::Replay(args) => cli::replay::run(args, cli.metrics).await,
    }
}
