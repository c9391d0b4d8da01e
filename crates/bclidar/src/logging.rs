use clap::{ArgAction, Args, ValueEnum};
use tracing::level_filters::LevelFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const ORDER: [LogLevel; 6] = [
        LogLevel::Off,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// `steps` levels more verbose, capped at trace.
    fn raised(self, steps: u8) -> Self {
        let index = Self::ORDER.iter().position(|level| *level == self).unwrap_or(0);
        Self::ORDER[(index + usize::from(steps)).min(Self::ORDER.len() - 1)]
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Log flags shared by every subcommand. Logs go to stderr.
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Log output format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Base log level.
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "BCLIDAR_LOG_LEVEL",
        global = true
    )]
    pub log_level: LogLevel,

    /// One level more verbose per use (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable logging.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl LogArgs {
    pub fn effective_level(&self) -> LogLevel {
        if self.quiet {
            LogLevel::Off
        } else {
            self.log_level.raised(self.verbose)
        }
    }
}

/// Install the stderr subscriber. From debug on, records carry their
/// module and thread so scan-thread output can be told apart.
pub fn init_logging(args: &LogArgs) {
    let level = args.effective_level();
    let detailed = level >= LogLevel::Debug;
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from(level))
        .with_ansi(false)
        .with_target(detailed)
        .with_thread_names(detailed);

    let _ = match args.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(level: LogLevel, verbose: u8, quiet: bool) -> LogArgs {
        LogArgs {
            log_format: LogFormat::Text,
            log_level: level,
            verbose,
            quiet,
        }
    }

    #[test]
    fn verbose_raises_from_base_level() {
        assert_eq!(args(LogLevel::Warn, 0, false).effective_level(), LogLevel::Warn);
        assert_eq!(args(LogLevel::Warn, 1, false).effective_level(), LogLevel::Info);
        assert_eq!(args(LogLevel::Warn, 2, false).effective_level(), LogLevel::Debug);
        assert_eq!(args(LogLevel::Error, 9, false).effective_level(), LogLevel::Trace);
    }

    #[test]
    fn quiet_turns_logging_off() {
        assert_eq!(args(LogLevel::Trace, 0, true).effective_level(), LogLevel::Off);
    }

    #[test]
    fn level_maps_to_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::OFF);
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
    }
}
