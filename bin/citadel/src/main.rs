//! # Citadel Binary
//!
//! The entry point that assembles the application based on compile-time features.

use actix_web::{web, App, HttpServer};
use citadel_api::configure_routes;
use citadel_api::handlers::AppState;
use citadel_api::middleware::{cors_policy, standard_middleware};
use citadel_config::Settings;
use citadel_core::{Forum, ForumPorts};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "db-sqlite")]
use citadel_db_sqlite::SqliteStore;

#[cfg(feature = "auth-argon2")]
use citadel_auth_argon2::Argon2Credentials;

#[cfg(not(all(feature = "db-sqlite", feature = "auth-argon2")))]
compile_error!("citadel needs the db-sqlite and auth-argon2 features");

/// `RUST_LOG` wins over the configured filter. `log` records emitted by
/// actix's request logger are bridged into tracing by `init()`.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings);
    if settings.uses_default_anonymous_secret() {
        warn!("anonymous_secret is the built-in default; set CITADEL_ANONYMOUS_SECRET");
    }

    // 1. Initialize Database Implementation
    let store = Arc::new(SqliteStore::new(&settings.database_url).await?);

    // 2. Initialize Auth Implementation
    let auth = Arc::new(Argon2Credentials::new());

    // 3. Wire the core behind the shared state
    let Settings {
        host,
        port,
        allowed_origins,
        anonymous_secret,
        ..
    } = settings;
    let forum = Forum::new(ForumPorts::from_store(store, auth), anonymous_secret);
    let state = web::Data::new(AppState { forum });

    info!("Citadel starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy(&allowed_origins))
            .wrap(standard_middleware())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
