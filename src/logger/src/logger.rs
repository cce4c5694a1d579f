use std::io::Write;

use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{Level, LevelFilter};
use env_logger::{Builder, Env, fmt::Color};
use once_cell::sync::OnceCell;

/// Environment variable used to override the log filter (e.g. `PLINKQC_LOG=pipeline=trace`)
pub const LOG_ENV_VAR: &str = "PLINKQC_LOG";

static INSTANCE: OnceCell<Logger> = OnceCell::new();

/// Global logger handle. Holds the `MultiProgress` through which every log line is routed,
/// so that progress bars and log records never overwrite each other.
#[derive(Debug)]
pub struct Logger {
    multi_pg: MultiProgress,
}

impl Logger {
    /// Initialize the global logger. Subsequent calls are no-ops.
    ///
    /// `verbosity`: 0 => Error | 1 => Warn | 2 => Info | 3 => Debug | 4+ => Trace
    pub fn init(verbosity: u8) {
        if INSTANCE.get().is_some() {
            return
        }

        let logger = Builder::new()
            .filter_level(Self::u8_to_loglevel(verbosity))
            .format(|buf, record| {
                // Errors carry the location at which they were logged.
                let (traceback, intense) = match record.level() {
                    Level::Error => (format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0)), true),
                    _            => (String::new(), false),
                };

                let mut arg_style = buf.style();
                arg_style.set_intense(intense);

                let mut level_style = buf.style();
                let color = match record.level() {
                    Level::Error => Color::Red,
                    Level::Warn  => Color::Yellow,
                    Level::Info  => Color::Green,
                    Level::Debug => Color::Blue,
                    Level::Trace => Color::Cyan
                };
                level_style.set_color(color).set_bold(true);

                writeln!(
                    buf,
                    "[{} {: <5} {}] {traceback}{}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    level_style.value(record.level()),
                    record.target(),
                    arg_style.value(record.args())
                )
            })
            .parse_env(Env::default().filter(LOG_ENV_VAR))
            .build();

        // The bridge does not forward the max level of the inner logger.
        let max_level = logger.filter();
        let multi_pg = MultiProgress::new();
        match LogWrapper::new(multi_pg.clone(), logger).try_init() {
            Ok(())  => log::set_max_level(max_level),
            Err(_)  => eprintln!("A global logger was already set. {LOG_ENV_VAR} and verbosity flags will be ignored."),
        }
        let _ = INSTANCE.set(Self{multi_pg});
    }

    fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
        match verbosity {
            0            => LevelFilter::Error,
            1            => LevelFilter::Warn,
            2            => LevelFilter::Info,
            3            => LevelFilter::Debug,
            4..= u8::MAX => LevelFilter::Trace
        }
    }

    pub fn set_level(verbosity: u8) {
        log::set_max_level(Self::u8_to_loglevel(verbosity));
    }

    /// Shared `MultiProgress`. Returns `None` if the logger was never initialized (e.g. within tests),
    /// in which case callers should fall back to a hidden progress bar.
    pub fn multi() -> Option<&'static MultiProgress> {
        INSTANCE.get().map(|logger| &logger.multi_pg)
    }
}
