use std::io;
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for command output.
///
/// 0 = warn, 1 (`-v`) = info, 2 (`-vv`) = debug, 3+ = trace. `-q` shows
/// errors only. `RUST_LOG`, when set, wins over both `-v` and `-q`.
pub fn init_logging(verbose_level: u8, quiet: bool) {
    let level = default_level(verbose_level, quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(false)
        .with_writer(io::stderr);

    Registry::default().with(filter).with(fmt_layer).init();
}

fn default_level(verbose_level: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose_level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
