use std::path::PathBuf;
use std::sync::OnceLock;

use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::configs::Config;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static RELOAD_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Initializes the process-wide logger: a colored console sink plus an
/// ANSI-free rotating file sink under the cache directory.
///
/// The severity gate comes from `WAVY_LOG` when set, otherwise from the
/// config. Call once at startup; the returned guard must stay alive for the
/// file sink to flush.
pub fn init(config: &Config) -> Option<WorkerGuard> {
    let log_level = config.logging.level.as_deref().unwrap_or("info");
    let filters = config.logging.filters.as_deref().unwrap_or("");

    let filter_str = if filters.is_empty() {
        log_level.to_string()
    } else {
        format!("{},{}", log_level, filters)
    };

    let env_filter =
        EnvFilter::try_from_env("WAVY_LOG").unwrap_or_else(|_| EnvFilter::new(filter_str));

    let (filter_layer, handle) = reload::Layer::new(env_filter);
    let _ = RELOAD_HANDLE.set(handle);

    let timer = OffsetTime::new(
        time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"),
    );

    let console_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(false);

    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_timer(timer)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_file(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// Adjusts the severity gate at runtime. No-op before `init`.
pub fn set_level(directives: &str) -> bool {
    match RELOAD_HANDLE.get() {
        Some(handle) => handle.reload(EnvFilter::new(directives)).is_ok(),
        None => false,
    }
}

fn file_writer(
    config: &Config,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = match config.logging.dir.as_deref() {
        Some(d) if !d.is_empty() => PathBuf::from(d),
        _ => cache_dir()?.join("wavy"),
    };
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(dir, "wavy-server.log");
    Some(tracing_appender::non_blocking(appender))
}

fn cache_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME") {
        let p = PathBuf::from(xdg);
        if !p.as_os_str().is_empty() {
            return Some(p);
        }
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache"))
}

#[cfg(test)]
mod tests {
    #[test]
    fn set_level_before_init_is_a_noop() {
        assert!(!super::set_level("debug"));
    }
}
