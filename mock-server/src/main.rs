use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    match std::env::var("REGISTRY_PASSWORD") {
        Ok(password) if !password.is_empty() => {
            tracing::info!(%addr, "listening with basic auth on mutations");
            mock_server::run_with_password(listener, &password).await
        }
        _ => {
            tracing::info!(%addr, "listening");
            mock_server::run(listener).await
        }
    }
}
