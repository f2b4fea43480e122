//! src/logging.rs
//!
//! Opt-in diagnostics for hosts that load the library dynamically.
//!
//! Nothing is logged until the host calls [`CompressionInitLogging`], which
//! installs a `tracing-subscriber` formatter writing to stderr. The filter is
//! read from the `NATIVE_COMPRESS_LOG` environment variable when it is set
//! (`EnvFilter` directive syntax, e.g. `native_compress::zstd=trace`), and
//! otherwise derived from the numeric level passed in.

#![allow(non_snake_case)]

use compress::CompressError;

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "NATIVE_COMPRESS_LOG";

/// Highest accepted numeric level (trace).
pub const MAX_LOG_LEVEL: i32 = 5;

/// Installs the process-wide diagnostic subscriber.
///
/// `level` ranges from `0` (off) to `5` (trace): `1` error, `2` warn,
/// `3` info, `4` debug. Returns `1` when this call installed the subscriber,
/// `0` when nothing was installed (level `0` without an environment filter,
/// a subscriber already present, or a build without the `tracing` feature),
/// and `OutOfBounds` for a level outside `0..=5`.
#[unsafe(no_mangle)]
pub extern "C" fn CompressionInitLogging(level: i32) -> i32 {
    if !(0..=MAX_LOG_LEVEL).contains(&level) {
        return CompressError::OutOfBounds.code();
    }
    i32::from(install(level))
}

#[cfg(feature = "tracing")]
fn install(level: i32) -> bool {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    let default = match level {
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        4 => LevelFilter::DEBUG,
        5 => LevelFilter::TRACE,
        _ => LevelFilter::OFF,
    };
    if default == LevelFilter::OFF && std::env::var_os(LOG_ENV).is_none() {
        return false;
    }

    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(not(feature = "tracing"))]
fn install(_level: i32) -> bool {
    false
}
