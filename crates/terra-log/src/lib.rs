//! Structured logging for the terrain generator.
//!
//! Library crates log through the `log` facade; this crate installs a
//! `tracing` subscriber that also captures those records. Console output is
//! uptime-stamped, and debug builds can additionally write JSON lines to a
//! file.

use std::path::Path;

use terra_config::TerraConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Initialize the global tracing subscriber.
///
/// Filter precedence: `RUST_LOG`, then the config's `debug.log_level`, then
/// [`DEFAULT_FILTER`]. When `debug_build` is set and `log_dir` is writable, a
/// JSON file layer is added at `<log_dir>/terra.log`.
///
/// # Examples
///
/// ```no_run
/// use terra_config::TerraConfig;
/// use terra_log::init_logging;
///
/// let config = TerraConfig::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&TerraConfig>) {
    let filter_str = filter_for(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join("terra.log"))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Filter string used when `RUST_LOG` is not set.
///
/// A bare level from the config (e.g. `"debug"`) keeps wgpu and naga at
/// `warn` so shader compilation does not flood the console.
fn filter_for(config: Option<&TerraConfig>) -> String {
    match config.map(|c| c.debug.log_level.trim()) {
        Some(level) if !level.is_empty() && !level.contains('=') => {
            format!("{level},wgpu=warn,naga=warn")
        }
        Some(level) if !level.is_empty() => level.to_string(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        let filter_str = format!("{}", default_env_filter());
        assert!(filter_str.contains("wgpu=warn"));
        assert!(filter_str.contains("naga=warn"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_filter_without_config_is_default() {
        assert_eq!(filter_for(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_bare_level_keeps_gpu_crates_quiet() {
        let mut config = TerraConfig::default();
        config.debug.log_level = "debug".to_string();
        assert_eq!(filter_for(Some(&config)), "debug,wgpu=warn,naga=warn");
    }

    #[test]
    fn test_directive_level_used_verbatim() {
        let mut config = TerraConfig::default();
        config.debug.log_level = "warn,terra_gpu=trace".to_string();
        assert_eq!(filter_for(Some(&config)), "warn,terra_gpu=trace");
    }

    #[test]
    fn test_empty_level_falls_back_to_default() {
        let mut config = TerraConfig::default();
        config.debug.log_level = "  ".to_string();
        assert_eq!(filter_for(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        for filter_str in [
            "info",
            "debug,terra_field=trace",
            "warn,terra_gpu=debug,terra_mesh=trace",
        ] {
            assert!(
                EnvFilter::try_from(filter_str).is_ok(),
                "Failed to parse filter: {filter_str}"
            );
        }
    }

    #[test]
    fn test_log_dir_can_be_created() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        std::fs::create_dir_all(&log_dir).unwrap();
        assert!(log_dir.is_dir());
    }
}
