use clap::Parser;
use tracing_subscriber::EnvFilter;

use translation_merge::{merge, Opts};

fn main() {
    let opts = Opts::parse();

    let filter = match opts.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("translation_merge=info"),
        _ => EnvFilter::new("translation_merge=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = merge(&opts) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
