use std::{process::ExitCode, sync::Arc};

use alert_engine::{
    AppState, config,
    services::{change_feed, db_init},
    stores::mongo::{self, MongoAlertStore, MongoNotificationStore, MongoPriceFeed},
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let db = match mongo::connect(&settings).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(db = %settings.mongodb_db, "connected to MongoDB");

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!("index setup failed: {}", e);
    }

    let state = AppState {
        settings: settings.clone(),
        alerts: Arc::new(MongoAlertStore::new(&db)),
        notifications: Arc::new(MongoNotificationStore::new(&db)),
    };
    let feed = MongoPriceFeed::new(&db);

    tracing::info!("alert engine started");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match change_feed::watch_price_updates(state, &feed, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
