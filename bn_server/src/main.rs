//! Brain Notes HTTP server.
//!
//! Loads configuration, applies database migrations, starts the mail
//! queue and serves the API until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use brain_notes::{
    auth::AccountManager,
    db::{Database, PgUserRepository},
    mail::{LogMailer, MailSink, NotificationQueue, QueueSettings, SmtpMailer},
    notes::{NoteManager, PgNoteRepository},
};
use bn_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run the Brain Notes server

USAGE:
  bn_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/brain_notes]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SECRET_KEY               Token signing secret (required, at least 32 chars)
  PASSWORD_PEPPER          Password hashing pepper (optional, at least 16 chars)
  APP_URL                  Public base URL used in mailed links
  MAIL_SERVER              SMTP relay; mail is only logged without MAIL_USERNAME
  METRICS_BIND             Prometheus scrape address, disabled when unset
  (See README.md for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Metrics exporter listening on {}", addr);
    }

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to apply migrations")?;
    info!("Database connected and migrated");

    let sink: Arc<dyn MailSink> = if config.mail.is_configured() {
        info!("Mail delivery via {}:{}", config.mail.server, config.mail.port);
        Arc::new(SmtpMailer::new(&config.mail).context("Invalid mail configuration")?)
    } else {
        warn!("MAIL_USERNAME not set, outgoing mail will only be logged");
        Arc::new(LogMailer)
    };
    let (queue, mail_worker) = NotificationQueue::spawn(sink, QueueSettings::from(&config.mail));

    let accounts = AccountManager::new(
        config.auth.clone(),
        Arc::new(PgUserRepository::new(db.pool().clone())),
        Arc::new(queue),
    );
    let notes = NoteManager::new(Arc::new(PgNoteRepository::new(db.pool().clone())));
    let state = AppState::new(accounts, notes, Some(db.clone()), config.cookies);

    let app = api::create_router(state).layer(api::cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    // The router owned the last queue handle; let pending mail go out.
    if tokio::time::timeout(std::time::Duration::from_secs(10), mail_worker)
        .await
        .is_err()
    {
        warn!("Mail queue did not drain before shutdown");
    }
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
