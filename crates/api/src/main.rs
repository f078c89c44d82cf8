use adjutant_api::{build_router, state::AppState};
use adjutant_config::Settings;
use adjutant_db::{connect, indexes::ensure_indexes};
use adjutant_services::background::{Scheduler, register_tasks};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "adjutant_api=debug,adjutant_services=debug,adjutant_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config
    let settings = Settings::load()?;
    info!("Starting Adjutant API on {}:{}", settings.app.host, settings.app.port);

    // Connect to MongoDB
    let db = connect(&settings).await?;

    // Ensure indexes
    ensure_indexes(&db).await?;

    // Build app state
    let app_state = AppState::new(db, settings.clone());

    // Register and start the background scheduler
    let mut scheduler = Scheduler::new();
    register_tasks(&mut scheduler, app_state.task_context(), &settings.scheduler);
    let scheduler_handle = scheduler.start();

    // Build router
    let app = build_router(app_state);

    // Start server
    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    scheduler_handle.stop().await;

    Ok(())
}
