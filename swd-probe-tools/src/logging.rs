use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum LevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LevelFilter {
    fn into_tracing(self) -> tracing::level_filters::LevelFilter {
        match self {
            Self::Off => tracing::level_filters::LevelFilter::OFF,
            Self::Error => tracing::level_filters::LevelFilter::ERROR,
            Self::Warn => tracing::level_filters::LevelFilter::WARN,
            Self::Info => tracing::level_filters::LevelFilter::INFO,
            Self::Debug => tracing::level_filters::LevelFilter::DEBUG,
            Self::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Configures tracing and sets up the logging facility.
///
/// Log messages go to stderr, so register values printed on stdout stay parseable.
/// Without an explicit `level`, `RUST_LOG` is used, falling back to WARN.
pub fn setup_logging(level: Option<LevelFilter>) {
    let filter = match level {
        // Given on the command line, ignore RUST_LOG.
        Some(level) => EnvFilter::builder()
            .with_default_directive(level.into_tracing().into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
            .from_env_lossy(),
    };

    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
