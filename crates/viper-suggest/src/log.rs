use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

struct TracingState {
    log_file: String,
    _guard: WorkerGuard,
}

static TRACING: OnceCell<TracingState> = OnceCell::new();

/// Install the global subscriber writing to `log_file_path`.
///
/// `log_level` is the default filter when `RUST_LOG` is not set, `info` when
/// omitted. Calling it again after a successful init changes nothing and
/// returns the path of the file already in use.
pub fn init_tracing(log_file_path: &str, log_level: Option<&str>) -> Result<String> {
    TRACING
        .get_or_try_init(|| {
            let path = PathBuf::from(log_file_path);
            let (dir, file_name) = split_log_path(&path)?;
            std::fs::create_dir_all(&dir).map_err(Error::CreateDir)?;

            let appender = tracing_appender::rolling::never(&dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let default_level = log_level.unwrap_or("info");
            let filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .map_err(|e| Error::InitTracing(format!("invalid log level {default_level:?}: {e}")))?;

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_names(true)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .try_init()
                .map_err(|e| Error::InitTracing(e.to_string()))?;

            let log_file = dir.join(&file_name).to_string_lossy().into_owned();
            tracing::info!(log_file = %log_file, "Tracing initialized");

            Ok(TracingState {
                log_file,
                _guard: guard,
            })
        })
        .map(|state| state.log_file.clone())
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InitTracing(format!("{} is not a file path", path.display())))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, file_name))
}

/// Route panics of any thread into the log before the default hook runs.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(
            thread = thread.name().unwrap_or("<unnamed>"),
            location = %location,
            "Panic: {info}"
        );
        default_hook(info);
    }));
}
