//! Process-wide tracing setup.
//!
//! Warnings and errors, including the failure trace of a rejected or failed
//! delivery, go to stderr. Everything else goes to stdout.

use tracing::Level;
use tracing_subscriber::fmt::writer::{MakeWriterExt, OrElse, WithMaxLevel};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Writer sending `WARN` and `ERROR` events to `errors` and the rest to
/// `other`.
pub fn split_writer<E, O>(errors: E, other: O) -> OrElse<WithMaxLevel<E>, O>
where
    E: for<'w> MakeWriter<'w>,
    O: for<'w> MakeWriter<'w>,
{
    errors.with_max_level(Level::WARN).or_else(other)
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "algorithms_keeper_service={level},algorithms_keeper_core={level},tower_http={level}",
            level = logging.level
        )
        .into()
    });

    let writer = split_writer(std::io::stderr, std::io::stdout);
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(logging.ansi)
                    .with_writer(writer),
            )
            .init();
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
