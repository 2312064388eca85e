//! Serves the translation merge as a web form.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use clap_web_form::{server, FormConfig, ServerConfig};
use tracing_subscriber::EnvFilter;

use translation_merge::merge_web_form;

#[derive(Parser, Debug)]
#[command(name = "serve_form", about = "Serve translation-merge as a web form")]
struct ServeArgs {
    /// Form configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Directory holding one workspace per submission
    #[arg(short, long, default_value = "temp")]
    temp_root: PathBuf,

    /// Show the underlying error text on failure pages
    #[arg(long)]
    verbose_errors: bool,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = 64)]
    max_upload_mib: usize,

    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = ServeArgs::parse();

    let filter = if args.debug {
        EnvFilter::new("clap_web_form=debug,translation_merge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => FormConfig::from_toml_file(path),
        None => Ok(FormConfig::default()),
    };
    let form = match config.and_then(merge_web_form) {
        Ok(form) => form,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let server_config = ServerConfig {
        temp_root: args.temp_root,
        verbose_errors: args.verbose_errors,
        max_upload_bytes: args.max_upload_mib * 1024 * 1024,
    };

    if let Err(e) = server::serve(form, server_config, args.listen).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
