//! # Logging & Tracing Infrastructure
//!
//! One global `tracing` subscriber per process. Workspace crates log at the
//! configured level while chatty dependencies (HTTP, SQLite, decoders) are held
//! at `warn`. When the host hands over a [`LoggerSink`], every event that
//! passes the filter is mirrored into it as a [`LogEntry`].
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::logging::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! ```
//!
//! Track locators can be multi-megabyte `data:` URIs or full device paths, so
//! they go through [`loggable_locator`] before landing in a field:
//!
//! ```ignore
//! tracing::debug!(source = %loggable_locator(&track.file_url), "Loading track");
//! ```

use crate::error::{Error, Result};
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use bridge_traits::playback::AudioSource;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Crates that follow the configured level.
const OWN_TARGETS: &[&str] = &[
    "mixtape",
    "core_runtime",
    "core_library",
    "core_playback",
    "core_service",
    "bridge_desktop",
];

/// Dependencies held at `warn`.
const QUIET_TARGETS: &[&str] = &["h2", "hyper", "reqwest", "rustls", "sqlx", "symphonia"];

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// One JSON object per event
    Json,
    /// Single line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Logging configuration.
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for workspace crates.
    pub level: LogLevel,
    /// Full `EnvFilter` directive string replacing the defaults.
    pub filter: Option<String>,
    /// Host sink receiving a copy of every event.
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close.
    pub enable_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("has_logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    fn directives(&self) -> String {
        if let Some(custom) = &self.filter {
            return custom.clone();
        }

        let level = self.level.as_str();
        OWN_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(self.directives())
            .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
    }

    fn span_events(&self) -> FmtSpan {
        if self.enable_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Install the global subscriber.
///
/// Fails with [`Error::Logging`] when a subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let mirror = SinkMirror {
        sink: config.logger_sink.clone(),
    };
    let base = tracing_subscriber::registry().with(filter).with(mirror);
    let stdout = tracing_subscriber::fmt::layer().with_span_events(config.span_events());

    let result = match config.format {
        LogFormat::Pretty => base.with(stdout.pretty()).try_init(),
        LogFormat::Json => base
            .with(stdout.json().flatten_event(true).with_current_span(config.enable_spans))
            .try_init(),
        LogFormat::Compact => base.with(stdout.compact()).try_init(),
    };

    result.map_err(|e| Error::Logging(format!("Subscriber already installed: {}", e)))
}

/// Copies events into the host [`LoggerSink`].
struct SinkMirror {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl<S> Layer<S> for SinkMirror
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        entry.fields = fields.values;
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span_id(span.name());
        }

        deliver(Arc::clone(sink), entry);
    }
}

/// Hand `entry` to the sink without blocking the logging thread when a
/// runtime is available; synchronously otherwise.
fn deliver(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            if let Err(e) = sink.log(entry).await {
                eprintln!("LoggerSink error: {}", e);
            }
        });
        return;
    }

    match tokio::runtime::Builder::new_current_thread().build() {
        Ok(runtime) => {
            if let Err(e) = runtime.block_on(sink.log(entry)) {
                eprintln!("LoggerSink error: {}", e);
            }
        }
        Err(e) => eprintln!("LoggerSink unavailable: {}", e),
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{:?}", value));
    }
}

impl FieldCollector {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Short form of a track locator for log fields.
///
/// Data URIs collapse to media type and size and paths to their file name.
/// Unparseable locators are replaced by a fixed marker.
pub fn loggable_locator(locator: &str) -> String {
    match AudioSource::from_locator(locator) {
        Ok(source) => source.to_string(),
        Err(_) => "<invalid locator>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for CapturingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Info
        }
    }

    fn mirrored(sink: &Arc<CapturingSink>) -> impl Subscriber + Send + Sync {
        let sink: Arc<dyn LoggerSink> = sink.clone();
        tracing_subscriber::registry().with(SinkMirror { sink: Some(sink) })
    }

    #[test]
    fn test_default_directives() {
        let directives = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .directives();
        assert!(directives.contains("core_library=debug"));
        assert!(directives.contains("core_playback=debug"));
        assert!(directives.contains("bridge_desktop=debug"));
        assert!(directives.contains("sqlx=warn"));
        assert!(!directives.contains("sqlx=debug"));
    }

    #[test]
    fn test_custom_filter_replaces_defaults() {
        let config = LoggingConfig::default().with_filter("core_library=trace");
        assert_eq!(config.directives(), "core_library=trace");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_invalid_custom_filter() {
        let config = LoggingConfig::default().with_filter("core_library=notalevel");
        assert!(matches!(config.env_filter(), Err(Error::Config(_))));
    }

    #[test]
    fn test_loggable_locator() {
        let data_uri = format!("data:audio/mpeg;base64,{}", "A".repeat(4096));
        assert_eq!(loggable_locator(&data_uri), "data:audio/mpeg (4096 bytes)");
        assert_eq!(
            loggable_locator("file:///storage/emulated/0/Music/song.mp3"),
            "song.mp3"
        );
        assert_eq!(
            loggable_locator("https://cdn.example.com/p.mp3"),
            "https://cdn.example.com/p.mp3"
        );
        assert_eq!(loggable_locator(""), "<invalid locator>");
    }

    #[test]
    fn test_sink_receives_event_fields() {
        let sink = Arc::new(CapturingSink::default());
        let _guard = tracing::subscriber::set_default(mirrored(&sink));

        tracing::warn!(target: "core_library", collection = "playlist", attempts = 2u64, "write failed");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_library");
        assert_eq!(entry.message, "write failed");
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.fields.get("collection"), Some(&"playlist".to_string()));
        assert_eq!(entry.fields.get("attempts"), Some(&"2".to_string()));
    }

    #[test]
    fn test_sink_min_level() {
        let sink = Arc::new(CapturingSink::default());
        let _guard = tracing::subscriber::set_default(mirrored(&sink));

        tracing::debug!("below the sink level");

        assert!(sink.entries.lock().unwrap().is_empty());
    }
}
