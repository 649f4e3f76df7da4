pub mod analyzer;
pub mod app;
pub mod auth;
pub mod commands;
pub mod config;
pub mod documents;
mod error;
pub mod history;
pub mod keychain;

pub use error::NutriLifeError;

/// Install the global tracing subscriber.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// The filter defaults to `info` and honours `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
