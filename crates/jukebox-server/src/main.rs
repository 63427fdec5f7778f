mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use jukebox_api::auth::{AppState, AppStateInner};
use jukebox_mailer::{LogTransport, MailQueue, RelayTransport, run_worker};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox=debug,jukebox_api=debug,jukebox_db=debug,jukebox_mailer=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = jukebox_db::Database::open(&PathBuf::from(&config.db_path))?;

    // Mail worker
    let (mail, mail_rx) = MailQueue::new();
    match &config.mail_relay_url {
        Some(url) => {
            info!("Mail relay: {}", url);
            let transport = RelayTransport::new(url.clone())?;
            tokio::spawn(run_worker(mail_rx, transport, config.mail_retry));
        }
        None => {
            info!("No mail relay configured, mail goes to the log");
            tokio::spawn(run_worker(mail_rx, LogTransport, config.mail_retry));
        }
    }
    if !config.mail.enabled {
        info!("Mail notifications disabled");
    }

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        mail,
        mail_settings: config.mail.clone(),
        web_path: config.web_path.clone(),
    });

    let app = jukebox_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Jukebox server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
