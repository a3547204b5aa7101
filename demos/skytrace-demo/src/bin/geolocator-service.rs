use std::error::Error;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skytrace_demo::{config, geo::GeolocatorService, http, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pipeline = telemetry::init_pipeline("geolocator-service");
    let service = GeolocatorService::new(
        pipeline,
        config::with_default(config::GEOCODER_URL, config::DEFAULT_GEOCODER_URL),
    );

    let listen = config::with_default(config::SKYTRACE_LISTEN, "0.0.0.0:5001");
    let listener = TcpListener::bind(&listen).await?;
    tracing::info!(name: "geolocator_service.listening", addr = %listen, "listening");

    tokio::select! {
        _ = http::serve(listener, service.clone()) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    service.pipeline().shutdown().await?;
    Ok(())
}
