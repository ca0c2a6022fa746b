//! Subscriber setup for the engine's `tracing` events

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber built from `config`.
///
/// `level` is either a bare level or a full `EnvFilter` directive; an invalid
/// directive falls back to `info`. Only the first call installs anything.
pub fn init(config: &LoggingConfig) {
    let filter = || EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    // Already installed by an earlier call or by the host application
    let _ = tracing::subscriber::set_global_default(subscriber);
}
