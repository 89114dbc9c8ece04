use clap::Parser;
use tracing_subscriber::EnvFilter;
use weread_readwise::config::{Cli, Config};
use weread_readwise::readwise::ReadwiseClient;
use weread_readwise::sync::{SyncOptions, Syncer};
use weread_readwise::unpack_error;
use weread_readwise::weread::WeReadSession;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // .env is optional and only feeds ${VAR} placeholders in the config file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("weread-readwise starting");

    let cfg = Config::resolve(args.config_path.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?args.config_path, "failed to load config file");
        std::process::exit(1);
    });

    let source = WeReadSession::new(&cfg.weread, &args.weread_cookie).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), "failed to set up weread session");
        std::process::exit(1);
    });
    let sink = ReadwiseClient::new(&cfg.readwise, &args.readwise_token).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), "failed to set up readwise client");
        std::process::exit(1);
    });

    let syncer = Syncer::new(source, sink, SyncOptions::from_config(&cfg));
    match syncer.run().await {
        Ok(stats) => {
            tracing::info!(uploaded = stats.uploaded, highlights = stats.highlights_sent, "weread-readwise done");
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "sync aborted");
            std::process::exit(1);
        }
    }
}
