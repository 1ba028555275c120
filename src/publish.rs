//! Event publishing abstraction with feature-gated implementation.
//!
//! This module provides a unified interface for publishing events to a message bus.
//! When the `publish` feature is enabled, events are sent to RabbitMQ via the
//! `awful_publish` crate. When disabled, all functions and macros are no-ops,
//! allowing the main code to call them unconditionally without `#[cfg]` directives
//! scattered throughout the codebase.
//!
//! # Design Pattern
//!
//! This module uses "duck typing" via macros to provide a consistent API regardless
//! of whether the feature is enabled. The [`publish_info!`] and [`publish_error!`]
//! macros expand to either real publishing calls or empty blocks depending on the
//! feature flag.
//!
//! # Non-Intrusive Design
//!
//! This module uses `awful_publish::init_global()` for initialization and
//! `awful_publish::publish()` for sending events. The `publish()` function
//! sends events directly to RabbitMQ without going through the tracing subscriber,
//! ensuring no interference with the application's existing logging setup.
//!
//! # Events Published
//!
//! When enabled, the application publishes the following events:
//!
//! | Event Kind | Description |
//! |------------|-------------|
//! | `application.started` | Application startup with version and subcommand |
//! | `application.failed` | Unreadable site or category configuration, or unwritable storage root |
//! | `crawl.started` | Beginning a crawl over every configured site |
//! | `crawl.site.failed` | One site could not be crawled; the others continue |
//! | `crawl.completed` | Crawl finished with success, failure, and new-article counts |
//! | `summarize.started` | Beginning the map stage |
//! | `summarize.completed` | Digest snapshot produced |
//! | `summarize.failed` | The summarization service or storage failed |
//!
//! # Usage
//!
//! ```ignore
//! use crate::{publish, publish_error, publish_info};
//!
//! // Initialize the message bus (no-op if feature disabled)
//! publish::init(Some(&"amqp://localhost:5672".to_string()), "events").await;
//!
//! // Publish events using macros (no-op if feature disabled)
//! publish_info!(
//!     "retail_news",
//!     event_kind = "crawl.started",
//!     sites = 12,
//!     "Starting crawl"
//! );
//!
//! publish_error!(
//!     "retail_news",
//!     event_kind = "summarize.failed",
//!     error = "model unavailable",
//!     "Summarization failed"
//! );
//! ```
//!
//! # Feature Flag
//!
//! Enable with: `cargo build --features publish`
//!
//! Requires access to the private `awful_publish` repository.

/// Initialize the message bus connection.
///
/// Connects to an AMQP broker (e.g., RabbitMQ) and starts the background
/// publisher task.
///
/// # Arguments
///
/// * `amqp_url` - Optional AMQP connection URL (e.g., `amqp://localhost:5672`)
/// * `exchange` - The exchange name to publish events to
///
/// # Returns
///
/// * `true` if the connection was established successfully
/// * `false` if no URL was provided or connection failed
///
/// # Behavior
///
/// * **Feature enabled**: Attempts to connect; logs warning on failure but
///   allows the application to continue without event publishing
/// * **Feature disabled**: Always returns `false` (no-op)
#[cfg(feature = "publish")]
pub async fn init(amqp_url: Option<&String>, exchange: &str) -> bool {
    use awful_publish::BusConfig;
    use tracing::{info, warn};

    if let Some(url) = amqp_url {
        let config = BusConfig::new(url.clone(), exchange.to_string());
        if let Err(e) = awful_publish::init_global(config).await {
            warn!(error = %e, "Failed to initialize message bus; continuing without event publishing");
            false
        } else {
            info!(exchange = %exchange, "Message bus initialized");
            true
        }
    } else {
        false
    }
}

/// Initialize the message bus connection (no-op when `publish` feature is disabled).
#[cfg(not(feature = "publish"))]
pub async fn init(_amqp_url: Option<&String>, _exchange: &str) -> bool {
    false
}

/// Publish an info-level event to the message bus.
///
/// This macro calls `awful_publish::publish()` directly when the `publish` feature
/// is enabled. When disabled, it expands to an empty block.
///
/// # Syntax
///
/// Uses tracing-style syntax with `field = value` pairs followed by a message literal:
///
/// ```ignore
/// publish_info!(service, field1 = value1, field2 = value2, "message");
/// ```
///
/// # Arguments
///
/// * `$service` - The service identifier (e.g., `"retail_news"`)
/// * `$key = $value` - Key-value pairs for event fields (supports dotted keys like `foo.bar`)
/// * `$msg` - The event message (must be a string literal)
///
/// # Example
///
/// ```ignore
/// publish_info!(
///     "retail_news",
///     event_kind = "crawl.completed",
///     succeeded = 11,
///     failed = 1,
///     "Crawl completed"
/// );
/// ```
#[cfg(feature = "publish")]
#[macro_export]
macro_rules! publish_info {
    ($service:expr, $($($k:ident).+ = $val:expr),+ , $msg:literal) => {
        awful_publish::publish(
            $service,
            tracing::Level::INFO,
            $msg,
            vec![$(
                (stringify!($($k).+), serde_json::json!($val)),
            )+],
        )
    };
    ($service:expr, $msg:literal) => {
        awful_publish::publish(
            $service,
            tracing::Level::INFO,
            $msg,
            vec![],
        )
    };
}

/// Publish an info-level event (no-op when `publish` feature is disabled).
#[cfg(not(feature = "publish"))]
#[macro_export]
macro_rules! publish_info {
    ($service:expr, $($tt:tt)*) => {};
}

/// Publish an error-level event to the message bus.
///
/// This macro calls `awful_publish::publish()` directly when the `publish` feature
/// is enabled. When disabled, it expands to an empty block.
///
/// # Syntax
///
/// Uses tracing-style syntax with `field = value` pairs followed by a message literal:
///
/// ```ignore
/// publish_error!(service, field1 = value1, field2 = value2, "message");
/// ```
///
/// # Arguments
///
/// * `$service` - The service identifier (e.g., `"retail_news"`)
/// * `$key = $value` - Key-value pairs for event fields (supports dotted keys like `foo.bar`)
/// * `$msg` - The event message (must be a string literal)
///
/// # Example
///
/// ```ignore
/// publish_error!(
///     "retail_news",
///     event_kind = "crawl.site.failed",
///     site = "Retail Dive",
///     "Site crawl failed"
/// );
/// ```
#[cfg(feature = "publish")]
#[macro_export]
macro_rules! publish_error {
    ($service:expr, $($($k:ident).+ = $val:expr),+ , $msg:literal) => {
        awful_publish::publish(
            $service,
            tracing::Level::ERROR,
            $msg,
            vec![$(
                (stringify!($($k).+), serde_json::json!($val)),
            )+],
        )
    };
    ($service:expr, $msg:literal) => {
        awful_publish::publish(
            $service,
            tracing::Level::ERROR,
            $msg,
            vec![],
        )
    };
}

/// Publish an error-level event (no-op when `publish` feature is disabled).
#[cfg(not(feature = "publish"))]
#[macro_export]
macro_rules! publish_error {
    ($service:expr, $($tt:tt)*) => {};
}
