use crate::config::paths::{PathError, Paths};
use crate::config::schema::LoggingConfig;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_NAME: &str = "endpoint-status.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;
type FilteredRegistry = Layered<EnvFilter, Registry>;
type StderrLayered = Layered<Option<BoxedLayer<FilteredRegistry>>, FilteredRegistry>;

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: Level,
    pub log_to_file: bool,
    pub log_to_stderr: bool,
    pub json_format: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_to_file: false,
            log_to_stderr: true,
            json_format: false,
        }
    }
}

impl TracingConfig {
    /// Unknown level names fall back to `info`.
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        let level = Level::from_str(logging.level.trim()).unwrap_or(Level::INFO);
        Self {
            level,
            log_to_file: logging.file,
            json_format: logging.json,
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize state directory: {0}")]
    StateDir(#[from] PathError),

    #[error("Failed to open log file {path}: {source}")]
    LogFileOpen { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct TracingGuard {
    _default_guard: tracing::subscriber::DefaultGuard,
    log_file: Option<Arc<File>>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.log_file {
            let _ = (&**file).flush();
        }
    }
}

/// Installs a subscriber for the current thread until the guard is dropped.
pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    let env_filter = resolve_env_filter(config);

    let log_file = if config.log_to_file {
        let path = Paths::ensure_state_dir()?.join(LOG_FILE_NAME);
        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| TracingError::LogFileOpen { path, source })?;
        Some(Arc::new(file))
    } else {
        None
    };

    let stderr_layer: Option<BoxedLayer<FilteredRegistry>> = config
        .log_to_stderr
        .then(|| fmt_layer(std::io::stderr, config.json_format));
    let file_layer: Option<BoxedLayer<StderrLayered>> = log_file
        .as_ref()
        .map(|file| fmt_layer(Arc::clone(file), config.json_format));

    let default_guard = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .set_default();

    Ok(TracingGuard {
        _default_guard: default_guard,
        log_file,
    })
}

fn fmt_layer<S, W>(writer: W, json: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn resolve_env_filter(config: &TracingConfig) -> EnvFilter {
    if config.level == Level::DEBUG || config.level == Level::TRACE {
        EnvFilter::new(config.level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
    }
}
