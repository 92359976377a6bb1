use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Writes `level [component] message` lines to stderr so stdout stays clean
/// for batch files and JSON.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("{level} [{}] {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger. Verbose runs show every event, quiet runs only
/// warnings and errors. Calling it twice keeps the first logger.
pub fn init(verbose: bool) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
}

pub fn log_service_event(component: &str, service_id: &str, event: &str, message: &str) {
    log::info!(target: component, "[service:{}][{}] {}", service_id, event, message);
}
