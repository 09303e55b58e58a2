//! Logging setup for the pipeline.
//!
//! Levels come from [`LoggingConfig`] unless `RUST_LOG` is set, which
//! wins outright:
//!
//! ```bash
//! RUST_LOG=semgraph::resolve=debug my-tool
//! ```

use crate::config::LoggingConfig;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::EnvFilter;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Flatten the config into an env-filter directive string, e.g.
/// `warn,semgraph::resolve=debug`. Modules are sorted so the directive
/// string is stable.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = config.default.clone();
    let mut modules: Vec<(&String, &String)> = config.modules.iter().collect();
    modules.sort();
    for (module, level) in modules {
        let _ = write!(directives, ",{module}={level}");
    }
    directives
}

/// Install the global subscriber. Later calls, and racing initializers
/// in tests, are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    // try_init: another subscriber may already be installed by the
    // embedding application; that one wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(uptime())
        .with_target(true)
        .try_init();
}

/// Initialize with defaults; convenience for tests and examples.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_are_stable_and_sorted() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("semgraph::resolve".to_string(), "debug".to_string());
        config
            .modules
            .insert("semgraph::index".to_string(), "trace".to_string());
        assert_eq!(
            filter_directives(&config),
            "warn,semgraph::index=trace,semgraph::resolve=debug"
        );
    }

    #[test]
    fn default_config_is_just_the_level() {
        assert_eq!(filter_directives(&LoggingConfig::default()), "warn");
    }
}
