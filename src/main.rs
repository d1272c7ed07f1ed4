use actix_web::{middleware::Compress, web, App, HttpServer};
use actix_cors::Cors;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use msgboard::config::Settings;
use msgboard::openapi::ApiDoc;
use msgboard::repo::Repo;
use msgboard::routes::{config, AppState};
use msgboard::{BoardStore, SecurityHeaders};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = Settings::from_env()?;
    info!(boards = ?settings.boards.names(), "Bootstrapping message board");

    let repo = build_repo(&settings).await?;
    let codec = settings.credential_codec()?;
    let store = BoardStore::new(repo, settings.boards.clone(), codec)
        .with_timeout(settings.store_timeout);

    let openapi = ApiDoc::openapi();
    let state = AppState { store };
    let frontend_url = settings.frontend_url.clone();
    let enable_hsts = settings.enable_hsts;

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .max_age(3600);
        if let Some(front) = frontend_url.as_deref() {
            cors = cors.allowed_origin(front);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::new(enable_hsts))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(settings.bind_addr.as_str())?;

    info!("Listening on http://{}", settings.bind_addr);

    server.run().await?;
    Ok(())
}

async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    match settings.database_url.as_deref() {
        Some(db_url) => connect_postgres(settings, db_url).await,
        None => in_memory(),
    }
}

#[cfg(feature = "postgres-store")]
async fn connect_postgres(settings: &Settings, db_url: &str) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(settings.store_timeout)
        .connect(db_url)
        .await?;
    let repo = msgboard::repo::pg::PgRepo::new(pool);
    repo.migrate().await?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(repo))
}

#[cfg(not(feature = "postgres-store"))]
async fn connect_postgres(_settings: &Settings, _db_url: &str) -> anyhow::Result<Arc<dyn Repo>> {
    anyhow::bail!("DATABASE_URL is set but this build has no postgres-store support")
}

#[cfg(feature = "inmem-store")]
fn in_memory() -> anyhow::Result<Arc<dyn Repo>> {
    warn!("DATABASE_URL not set; threads are kept in memory and lost on restart");
    Ok(Arc::new(msgboard::repo::inmem::InMemRepo::new()))
}

#[cfg(not(feature = "inmem-store"))]
fn in_memory() -> anyhow::Result<Arc<dyn Repo>> {
    anyhow::bail!("DATABASE_URL must be set when the in-memory store is not compiled in")
}
