use clap::Parser;
use codescope_cli::Cli;
use codescope_cli::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cli.run().await
}
