use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use readgate::classify::UserAgentClassifier;
use readgate::config::Config;
use readgate::db::{self, AppState, DbPool, queries};
use readgate::handlers;
use readgate::notify::{Notification, Notifier};

const SECONDS_PER_DAY: u64 = 86400;

#[derive(Debug, Parser)]
#[command(name = "readgate", about = "License and device admission service")]
struct Cli {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readgate=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    if config.internal_api_token.is_none() && !config.dev_mode {
        tracing::warn!("INTERNAL_API_TOKEN not set; /internal routes are disabled");
    }

    let pool = db::new_pool(&config.database_path, 8)
        .with_context(|| format!("opening database at {}", config.database_path))?;
    {
        let conn = pool.get()?;
        db::init_db(&conn)?;
    }

    let notifier = Notifier::new(&config);
    let state = AppState {
        db: pool.clone(),
        base_url: config.base_url.clone(),
        default_max_devices: config.default_max_devices,
        category_device_limit: config.category_device_limit,
        internal_api_token: config.internal_api_token.clone(),
        classifier: Arc::new(UserAgentClassifier::new()),
        notifier: notifier.clone(),
    };

    spawn_daily_summary(pool, notifier);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(4)
        .burst_size(20)
        .finish()
        .context("invalid rate limit configuration")?;

    let app = handlers::public_router()
        .layer(GovernorLayer::new(governor_conf))
        .merge(handlers::internal_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.addr();
    tracing::info!(addr = %addr, "readgate listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Once a day, mail the operator an aggregate of the last 24 hours.
/// Best effort: a failed run logs and waits for the next tick.
fn spawn_daily_summary(pool: DbPool, notifier: Notifier) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SECONDS_PER_DAY));
        // The first tick fires immediately; skip it so the summary
        // covers a full window.
        interval.tick().await;

        loop {
            interval.tick().await;
            let since = Utc::now().timestamp() - SECONDS_PER_DAY as i64;

            let stats = match pool.get() {
                Ok(conn) => match queries::activity_since(&conn, since) {
                    Ok(stats) => stats,
                    Err(e) => {
                        tracing::warn!(error = %e, "daily summary query failed");
                        continue;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "daily summary could not get a connection");
                    continue;
                }
            };

            notifier.dispatch(Notification::DailySummary { stats });
        }
    });
}
