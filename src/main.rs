use recipe_api::{app, config::AppConfig, state::AppState, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let addr = config.listen_addr()?;
    let app_state = AppState::init(config).await?;

    if let Some(su) = app_state.config.superuser.as_ref() {
        users::manager::bootstrap_superuser(app_state.users.as_ref(), su)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrap superuser: {e}"))?;
    }

    let app = app::build_app(app_state);
    app::serve(app, addr).await
}
