use clap::Parser;

mod cli;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    // `serve` installs its own subscriber once the log file is known.
    if !matches!(cli.command, cli::Command::Serve(_)) {
        logging::init_cli(cli.verbose);
    }
    let ctx = commands::RunContext::from_cli(&cli)?;
    commands::run_command(cli.command, &ctx).await
}
