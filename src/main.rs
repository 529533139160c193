use clap::Parser;
use replaytrader::cli::{Cli, run};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> std::process::ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {e}");
    }

    run(Cli::parse())
}
