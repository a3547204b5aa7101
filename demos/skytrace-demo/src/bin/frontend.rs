use std::error::Error;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skytrace_demo::{config, frontend::Frontend, http, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let gateway_url = config::required(config::GATEWAY_URL)?;

    let pipeline = telemetry::init_pipeline("frontend");
    let service = Frontend::new(pipeline, gateway_url);

    let listen = config::with_default(config::SKYTRACE_LISTEN, "0.0.0.0:3000");
    let listener = TcpListener::bind(&listen).await?;
    tracing::info!(name: "frontend.listening", addr = %listen, "listening");

    tokio::select! {
        _ = http::serve(listener, service.clone()) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    service.pipeline().shutdown().await?;
    Ok(())
}
