use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webhook_sentinel::config::Settings;
use webhook_sentinel::server::{build_router, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhook_sentinel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional settings file; defaults apply when SENTINEL_CONFIG is unset.
    let config_path = std::env::var_os("SENTINEL_CONFIG").map(std::path::PathBuf::from);
    let settings = match Settings::load_optional(config_path.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load settings");
            std::process::exit(1);
        }
    };

    if let Some(parent) = settings.db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(error = %e, path = %parent.display(), "Failed to create data directory");
            std::process::exit(1);
        }
    }

    let addr = settings.listen_addr;
    let app = build_router(AppState::new(settings));

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
