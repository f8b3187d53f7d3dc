use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global JSON subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling it twice is harmless: the
/// second call reports the existing subscriber and leaves it in place.
pub fn init_telemetry(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
    {
        tracing::debug!("Telemetry already initialised: {}", e);
    }
}
