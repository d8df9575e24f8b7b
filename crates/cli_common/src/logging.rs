use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// The minimum level of logs to emit.
    /// Directives of the RUST_LOG environment variable take precedence.
    #[clap(long = "log.level", default_value = "info", env = "LOG_LEVEL", value_enum)]
    pub level: LogLevel,
    /// The format for logs. Defaults to `color` when stderr is a terminal, and `text` otherwise.
    #[clap(long = "log.format", env = "LOG_FORMAT", value_enum)]
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line, with event fields flattened into it.
    Json,
    /// Human readable text without colors.
    Text,
    /// Human readable text with colors.
    Color,
}

/// Installs a global tracing subscriber writing to stderr. Must be called at most once.
pub fn init_logging(args: &LogArgs) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(args.level).into())
        .from_env_lossy();

    let format = args.format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stderr) {
            LogFormat::Color
        } else {
            LogFormat::Text
        }
    });

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .json()
            .flatten_event(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .init(),
        LogFormat::Text | LogFormat::Color => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .with_ansi(format == LogFormat::Color)
            .with_target(false)
            .init(),
    }
}
