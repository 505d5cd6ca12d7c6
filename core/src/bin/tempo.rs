/// Tempo command-line interface
///
/// Runs, inspects and validates Tempo scripts. Set `RUST_LOG=tempo_core=debug`
/// to see module resolution and call tracing on stderr.
use tempo_core::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
