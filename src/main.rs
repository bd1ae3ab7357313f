use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academic_records::api::router;
use academic_records::config::AppConfig;
use academic_records::db;
use academic_records::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "academic_records=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    info!(
        "policy: max {} courses per semester, {}-character access passwords ({:?})",
        config.admission.max_courses_per_semester,
        config.credential.password_length,
        config.credential.mode
    );

    let pool = db::connect(&config.database_url, 5).await?;

    let state = AppState::new(pool, &config);
    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
