use std::path::PathBuf;

use eldr::{argv, error::LoaderError, loader};
use tracing::error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: loader <path-to-elf> [args...]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Printed on every invocation, including a successful one: matches the
    // original loader's behavior exactly rather than gating it on argc.
    eprintln!("{USAGE}");

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        return;
    }

    let path = PathBuf::from(&args[1]);
    argv::install(&args[1..]);

    if let Err(err) = loader::manual_map(&path) {
        log_load_failure(&err);
    }
}

fn log_load_failure(err: &LoaderError) {
    error!(error = %err, "failed to load guest image");
}
