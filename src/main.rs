use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use linkpulse::analytics::AnalyticsService;
use linkpulse::api::{self, AppState};
use linkpulse::clicks::ClickRecorder;
use linkpulse::clock::{Clock, SystemClock};
use linkpulse::config::Config;
use linkpulse::geo::{DisabledGeoLookup, GeoLookup, HttpGeoService};
use linkpulse::links::LinkService;
use linkpulse::redirect::{self, RedirectResolver, RedirectState};
use linkpulse::storage::{SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("linkpulse=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    info!("Using SQLite storage: {}", config.database.url);
    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let geo: Arc<dyn GeoLookup> = match config.geo.endpoint.as_deref() {
        Some(endpoint) => {
            info!("Geo lookup collaborator: {endpoint}");
            Arc::new(HttpGeoService::new(endpoint, config.geo.timeout())?)
        }
        None => {
            info!("Geo lookup disabled; clicks record Unknown geography");
            Arc::new(DisabledGeoLookup)
        }
    };

    let recorder = Arc::new(ClickRecorder::new(
        Arc::clone(&storage),
        geo,
        Arc::clone(&clock),
        config.shortener.dedup_window_secs(),
    ));

    let api_state = Arc::new(AppState {
        links: LinkService::new(
            Arc::clone(&storage),
            Arc::clone(&clock),
            config.shortener.code_length,
        ),
        analytics: AnalyticsService::new(Arc::clone(&storage), Arc::clone(&clock)),
    });
    let api_router = api::create_api_router(api_state);

    let redirect_state = Arc::new(RedirectState {
        resolver: RedirectResolver::new(Arc::clone(&storage), Arc::clone(&clock)),
        recorder,
    });
    let redirect_router = redirect::create_redirect_router(redirect_state);

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("API server listening on http://{}", api_addr);

    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("Redirect server listening on http://{}", redirect_addr);

    tokio::try_join!(
        axum::serve(api_listener, api_router),
        axum::serve(
            redirect_listener,
            redirect_router.into_make_service_with_connect_info::<SocketAddr>(),
        ),
    )?;

    Ok(())
}
