use std::error::Error;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skytrace_demo::{config, gateway::Gateway, http, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let geolocator_url = config::required(config::GEOLOCATOR_SERVICE_URL)?;
    let iss_distance_url = config::required(config::ISS_DISTANCE_SERVICE_URL)?;

    let pipeline = telemetry::init_pipeline("gateway");
    let service = Gateway::new(pipeline, geolocator_url, iss_distance_url);

    let listen = config::with_default(config::SKYTRACE_LISTEN, "0.0.0.0:8000");
    let listener = TcpListener::bind(&listen).await?;
    tracing::info!(name: "gateway.listening", addr = %listen, "listening");

    tokio::select! {
        _ = http::serve(listener, service.clone()) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    service.pipeline().shutdown().await?;
    Ok(())
}
