// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use playkit::command::{self, Command};
use playkit::config::SdkConfig;

/// Sign in to the platform and manage the stored session for a game.
#[derive(Debug, Parser)]
#[command(name = "playkit", version, about)]
struct Cli {
    #[command(flatten)]
    config: SdkConfig,

    /// Log filter (tracing EnvFilter syntax).
    #[arg(long, default_value = "info", env = "PLAYKIT_LOG")]
    log_level: String,

    /// Log format: text or json.
    #[arg(long, default_value = "text", env = "PLAYKIT_LOG_FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&cli);

    let code = command::run(&cli.command, cli.config.clone()).await;
    std::process::exit(code);
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}
