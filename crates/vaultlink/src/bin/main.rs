//! vaultlink CLI

use clap::Parser;
use vaultlink::{Args, build_config, execute, log_filter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = build_config(&args).await?;

    // stdout carries results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config))
        .with_writer(std::io::stderr)
        .init();

    log::debug!("vaultlink v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Configuration: {:?}", config);

    let output = execute(args, &config).await?;
    if output.ends_with('\n') {
        print!("{}", output);
    } else {
        println!("{}", output);
    }

    Ok(())
}
