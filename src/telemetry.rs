//! Telemetry initialization.
//!
//! Level comes from `RUST_LOG` when set, otherwise from the config flags:
//! - neither → `info` (progress lines, skips, warnings)
//! - `verbose` → `debug` for deploy-git (git output, state transitions)
//! - `debug` → `trace` for deploy-git
//!
//! Both formats write to stderr so stdout stays free for the JSON report.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, with span close events
    Json,
}

/// The filter directive used when `RUST_LOG` is unset.
#[must_use]
pub fn default_directive(verbose: bool, debug: bool) -> String {
    let level = if debug {
        "trace"
    } else if verbose {
        "debug"
    } else {
        return "info".to_owned();
    };
    format!("info,deploy_git={level},deploy_git_vcs={level}")
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place and print a warning.
pub fn init(format: LogFormat, verbose: bool, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, debug)));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("warning: logging already initialized: {e}");
    }
}
