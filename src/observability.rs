//! Observability and diagnostics for the container and the root-finding pipeline.
//!
//! Library code only talks to the `log` facade. The `log_metric!` macro emits a
//! structured key-value line at debug level and is compiled out of release builds.
//! `init_logging` installs an `env_logger` backend and is meant to be called once
//! by the binary, never by the library itself.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::SchunkError;

/// Logs a structured key-value metric line at debug level, only in debug builds.
///
/// # Example
/// ```
/// use superchunk::log_metric;
/// let nchunks = 4;
/// log_metric!("event"="append", "nchunks"=&nchunks);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            ::log::debug!("SUPERCHUNK_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs the global logger with a `[LEVEL] message` format.
///
/// Output goes to stderr, or is appended to `log_file` when one is given. Calling
/// this more than once is harmless: only the first call configures the logger.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), SchunkError> {
    // Open the file before entering the Once so an I/O error can be reported.
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
