//! Command-line interface for Echobox
//!
//! Handles argument parsing and logging configuration.

use clap::Parser;
use log::LevelFilter;

/// Echobox - Voice recorder application
#[derive(Parser, Debug)]
#[command(name = "echobox")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace, -vvvv = including GUI internals
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    // Set echobox modules to requested verbosity level
    builder.filter_module("echobox", args.log_level());

    // GUI framework modules only at -vvvv (very verbose)
    if args.verbose >= 4 {
        builder.filter_module("naga", args.log_level());
        builder.filter_module("blade_graphics", args.log_level());
        builder.filter_module("gpui", args.log_level());
        builder.filter_module("fontdb", args.log_level());
    }

    builder.format_timestamp_millis().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let args = Args {
            verbose: 0,
            quiet: false,
        };
        assert_eq!(args.log_level(), LevelFilter::Warn);

        let args = Args {
            verbose: 2,
            quiet: false,
        };
        assert_eq!(args.log_level(), LevelFilter::Debug);

        let args = Args {
            verbose: 3,
            quiet: true,
        };
        assert_eq!(args.log_level(), LevelFilter::Error);
    }
}
