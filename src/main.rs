use std::{sync::Arc, time::Duration};

use tracing_subscriber::EnvFilter;

use outfit_match::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, CatalogStore, InMemoryCatalog, PgCatalog},
    services::{
        images::HttpImageFetcher, providers::OpenAiClient, MatchPipeline, MatchSettings,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("outfit_match=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let catalog: Arc<dyn CatalogStore> = match &config.catalog_json_path {
        Some(path) => Arc::new(InMemoryCatalog::from_json_file(path)?),
        None => {
            let pool = create_pool(&config.database_url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(PgCatalog::new(pool))
        }
    };

    let model = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_api_url.clone(),
        config.intent_model.clone(),
        config.vision_model.clone(),
        config.model_max_tokens,
        Duration::from_secs(config.model_timeout_secs),
    )?);
    let images = Arc::new(
        HttpImageFetcher::new(
            Duration::from_secs(config.image_fetch_timeout_secs),
            &config.upload_dir,
        )?
        .with_max_bytes(config.max_image_bytes),
    );

    let pipeline = MatchPipeline::new(
        catalog.clone(),
        model,
        images,
        MatchSettings::from(&config),
    );

    tracing::info!(
        catalog = catalog.name(),
        intent_model = %config.intent_model,
        vision_model = %config.vision_model,
        "Pipeline initialized"
    );

    let state = AppState::new(pipeline, catalog, config.default_top_n);
    let app = create_router(state);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
