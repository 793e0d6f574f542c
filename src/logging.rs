use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes tracing with a console layer and a JSON file layer.
///
/// File logs rotate daily under `logs/`. The env filter honors `RUST_LOG`
/// and defaults the crate itself to `info`.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "baumkataster.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("baumkataster=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    // Keep the appender guard alive for the process lifetime so buffered
    // log lines are flushed on exit.
    std::mem::forget(guard);
}
