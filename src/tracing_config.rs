use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with a console layer (INFO+) and a daily-rolling file
/// layer (DEBUG+) under ./logs.
///
/// The returned WorkerGuard must stay alive for the program lifetime; its
/// drop flushes the non-blocking file writer.
pub fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("./logs", "crowdfund_backend.log");

    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_filter(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Tracing initialized (console=INFO+, file=DEBUG+)");

    guard
}
