//! Tracing setup.
//!
//! Logging starts with the default [`LoggingConfig`] so that configuration
//! errors are visible, then switches to the loaded configuration through a
//! reload handle. `RUST_LOG`, when set, overrides both.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

/// Crates whose events are filtered at `logging.level`.
const LMSGATE_TARGETS: [&str; 3] = ["lmsgate_server", "lmsgate_auth", "lmsgate_auth_postgres"];

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Builds the `EnvFilter` directive string for a logging configuration:
/// `dependency_level` as the default, `level` for the lmsgate crates, then
/// the extra directives in order.
#[must_use]
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.dependency_level.to_ascii_lowercase()];
    let level = config.level.to_ascii_lowercase();
    directives.extend(LMSGATE_TARGETS.iter().map(|target| format!("{target}={level}")));
    directives.extend(config.directives.iter().cloned());
    directives.join(",")
}

/// Installs the global subscriber with the default logging configuration.
pub fn init_tracing() {
    let filter = rust_log_filter()
        .unwrap_or_else(|| EnvFilter::new(filter_directives(&LoggingConfig::default())));

    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();
}

/// Switches the installed subscriber to `config`, unless `RUST_LOG` is set.
pub fn apply_logging_config(config: &LoggingConfig) {
    if rust_log_filter().is_some() {
        tracing::debug!("RUST_LOG is set, ignoring the logging section");
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };

    let directives = filter_directives(config);
    match EnvFilter::try_new(&directives) {
        Ok(filter) => match handle.reload(filter) {
            Ok(()) => tracing::debug!(filter = %directives, "Logging configuration applied"),
            Err(e) => tracing::warn!(error = %e, "Could not apply logging configuration"),
        },
        Err(e) => tracing::warn!(error = %e, filter = %directives, "Invalid logging filter"),
    }
}

fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var_os(EnvFilter::DEFAULT_ENV)?;
    EnvFilter::try_from_default_env().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives() {
        assert_eq!(
            filter_directives(&LoggingConfig::default()),
            "warn,lmsgate_server=info,lmsgate_auth=info,lmsgate_auth_postgres=info"
        );
    }

    #[test]
    fn extra_directives_come_last() {
        let config = LoggingConfig {
            level: "DEBUG".into(),
            dependency_level: "error".into(),
            directives: vec!["sqlx=info".into(), "lmsgate_auth::oauth=trace".into()],
        };
        let directives = filter_directives(&config);
        assert_eq!(
            directives,
            "error,lmsgate_server=debug,lmsgate_auth=debug,lmsgate_auth_postgres=debug,\
             sqlx=info,lmsgate_auth::oauth=trace"
        );
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
