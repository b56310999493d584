use openapi_lsp::{create_service, discover_settings};
use tower_lsp::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cwd = std::env::current_dir().unwrap_or_default();
    let (settings, settings_dir) = discover_settings(&cwd);

    // stdout carries the protocol, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.log_level()))
        .unwrap_or_else(|_| EnvFilter::new(openapi_lsp::settings::DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings_dir = %settings_dir.display(),
        "starting OpenAPI language server"
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = create_service();
    Server::new(stdin, stdout, socket).serve(service).await;
}
