use std::error::Error;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skytrace_demo::{config, http, iss::IssDistanceService, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pipeline = telemetry::init_pipeline("iss-distance-service");
    let service = IssDistanceService::new(
        pipeline,
        config::with_default(config::ISS_API_URL, config::DEFAULT_ISS_API_URL),
    );

    let listen = config::with_default(config::SKYTRACE_LISTEN, "0.0.0.0:5000");
    let listener = TcpListener::bind(&listen).await?;
    tracing::info!(name: "iss_distance_service.listening", addr = %listen, "listening");

    tokio::select! {
        _ = http::serve(listener, service.clone()) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    service.pipeline().shutdown().await?;
    Ok(())
}
