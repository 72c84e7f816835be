use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc, oid::ObjectId},
    options::{ChangeStreamOptions, ClientOptions, FullDocumentType},
};

use super::{AlertStore, AlertStream, FeedStream, NotificationStore, PriceFeed};
use crate::{
    config::Settings,
    error::{EngineError, StoreError},
    models::{Alert, Notification},
};

pub const STOCKS: &str = "stocks";
pub const ALERTS: &str = "alerts";
pub const NOTIFICATIONS: &str = "notifications";

/// Connects and pings once; the connect timeout is the whole startup budget.
pub async fn connect(settings: &Settings) -> Result<Database, EngineError> {
    let mut opts = ClientOptions::parse(&settings.mongodb_uri)
        .await
        .map_err(|e| EngineError::Connect(e.to_string()))?;
    opts.max_pool_size = Some(settings.max_pool_size);
    opts.connect_timeout = Some(settings.connect_timeout);
    opts.server_selection_timeout = Some(settings.connect_timeout);
    opts.app_name = Some("alert-engine".to_string());

    let client = Client::with_options(opts).map_err(|e| EngineError::Connect(e.to_string()))?;
    let db = client.database(&settings.mongodb_db);

    tokio::time::timeout(settings.connect_timeout, db.run_command(doc! { "ping": 1 }, None))
        .await
        .map_err(|_| EngineError::Connect("ping timed out".to_string()))?
        .map_err(|e| EngineError::Connect(e.to_string()))?;

    Ok(db)
}

#[derive(Clone)]
pub struct MongoPriceFeed {
    stocks: Collection<Document>,
}

impl MongoPriceFeed {
    pub fn new(db: &Database) -> Self {
        Self {
            stocks: db.collection::<Document>(STOCKS),
        }
    }
}

#[async_trait]
impl PriceFeed for MongoPriceFeed {
    async fn subscribe(&self) -> Result<FeedStream, StoreError> {
        // Only updates that touched currentPrice; ask for the post-image.
        let pipeline = [doc! {
            "$match": {
                "operationType": "update",
                "updateDescription.updatedFields.currentPrice": { "$exists": true },
            }
        }];
        let opts = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .build();

        let stream = self.stocks.watch(pipeline, opts).await?;

        Ok(stream
            .map(|item| item.map(|event| event.full_document).map_err(StoreError::from))
            .boxed())
    }
}

#[derive(Clone)]
pub struct MongoAlertStore {
    alerts: Collection<Alert>,
}

impl MongoAlertStore {
    pub fn new(db: &Database) -> Self {
        Self {
            alerts: db.collection::<Alert>(ALERTS),
        }
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn find_active(&self, symbol: &str) -> Result<AlertStream, StoreError> {
        let cursor = self
            .alerts
            .find(doc! { "symbol": symbol, "isActive": true }, None)
            .await?;

        Ok(cursor.map(|res| res.map_err(StoreError::from)).boxed())
    }

    async fn deactivate(&self, id: ObjectId, at: DateTime) -> Result<bool, StoreError> {
        let res = self
            .alerts
            .update_one(
                doc! { "_id": id, "isActive": true },
                doc! { "$set": { "isActive": false, "triggeredAt": at } },
                None,
            )
            .await?;

        Ok(res.modified_count == 1)
    }
}

#[derive(Clone)]
pub struct MongoNotificationStore {
    notifications: Collection<Notification>,
}

impl MongoNotificationStore {
    pub fn new(db: &Database) -> Self {
        Self {
            notifications: db.collection::<Notification>(NOTIFICATIONS),
        }
    }
}

#[async_trait]
impl NotificationStore for MongoNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.insert_one(notification, None).await?;
        Ok(())
    }
}
