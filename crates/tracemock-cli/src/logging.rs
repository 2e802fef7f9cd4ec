//! Subscriber setup for the CLI.
//!
//! Filter priority: `TRACEMOCK_LOG` > `RUST_LOG` > `-v` count.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TRACEMOCK_LOG";

/// Logs go to stderr; the run summary owns stdout.
pub fn init(verbose: u8) {
    let filter = build_filter(verbose, std::env::var(LOG_ENV).ok());
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .without_time()
        .compact();

    // a second init (tests) is not an error
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

fn build_filter(verbose: u8, project_directives: Option<String>) -> EnvFilter {
    if let Some(filter) = project_directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(default_directive(verbose))
}

pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "info");
        assert_eq!(default_directive(1), "debug");
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn project_directives_win() {
        let filter = build_filter(0, Some("tracemock_core=trace".to_string()));
        assert_eq!(filter.to_string(), "tracemock_core=trace");
    }
}
