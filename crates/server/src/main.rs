//! Binary entry point for the upload-and-convert server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use html2epub_server::{app, config::ServerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("html2epub_server=info".parse().expect("directive")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let app = app().layer(tower_http::cors::CorsLayer::permissive());

    let addr = config.bind_addr();
    tracing::info!("html2epub server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind");
    axum::serve(listener, app).await.expect("serve");
}
