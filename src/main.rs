use teamboard::config::Config;
use teamboard::routes;
use teamboard::state::AppState;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let addr = config.listen_addr();
    let app = routes::app(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "teamboard relay listening");
    axum::serve(listener, app).await
}
