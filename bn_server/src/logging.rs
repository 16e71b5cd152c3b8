//! Structured logging setup.
//!
//! Library crates log through the `log` facade; `tracing-subscriber`
//! forwards those records together with the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use bn_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Record a failed login or a rejected token under the `security` target
///
/// `subject` is the username the client claimed, when there is one;
/// `request_id` ties the event to the access log lines of the request.
///
/// ```
/// use bn_server::logging::log_security_event;
///
/// log_security_event(
///     "login_failed",
///     Some("alice"),
///     Some("6f1c0a4e-request"),
///     "Invalid username or password",
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    subject: Option<&str>,
    request_id: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        target: "security",
        event_type,
        subject,
        request_id,
        "{}",
        message
    );
}
