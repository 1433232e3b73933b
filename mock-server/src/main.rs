use anyhow::Result;
use mock_crm::MockConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("LOG_FORMAT").unwrap_or_default();

    match format.as_str() {
        "json" => tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init(),
        "pretty" => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init()
        }
        _ => tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let mut config = MockConfig::default();
    if let Ok(token) = std::env::var("MOCK_CRM_TOKEN") {
        config.token = token;
    }

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock crm listening");
    mock_crm::run_with(listener, config).await?;
    Ok(())
}
