//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

impl Args {
    /// The `tracing` level selected by the verbosity flags.
    pub fn tracing_level(&self) -> tracing::Level {
        match self.verbose.log_level() {
            Some(log::Level::Error) => tracing::Level::ERROR,
            Some(log::Level::Warn) => tracing::Level::WARN,
            Some(log::Level::Info) | None => tracing::Level::INFO,
            Some(log::Level::Debug) => tracing::Level::DEBUG,
            Some(log::Level::Trace) => tracing::Level::TRACE,
        }
    }
}

/// The version of the `vcf-slice` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the version of the `vcf-slice` crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        VERSION
    }
}

#[cfg(test)]
mod test {
    use clap_verbosity_flag::Verbosity;

    #[rstest::rstest]
    #[case(0, 0, tracing::Level::INFO)]
    #[case(1, 0, tracing::Level::DEBUG)]
    #[case(2, 0, tracing::Level::TRACE)]
    #[case(0, 1, tracing::Level::WARN)]
    #[case(0, 2, tracing::Level::ERROR)]
    fn tracing_level(#[case] verbose: u8, #[case] quiet: u8, #[case] expected: tracing::Level) {
        let args = super::Args {
            verbose: Verbosity::new(verbose, quiet),
        };

        assert_eq!(args.tracing_level(), expected);
    }

    #[test]
    fn worker_version() {
        assert_eq!(super::worker_version(), "x.y.z");
    }
}
