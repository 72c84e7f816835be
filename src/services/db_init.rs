use mongodb::{Database, IndexModel, bson::doc};

use crate::stores::mongo::{ALERTS, NOTIFICATIONS};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // alerts: the evaluator scan (symbol + isActive)
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "symbol": 1, "isActive": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // notifications: newest-first per recipient
    {
        let col = db.collection::<mongodb::bson::Document>(NOTIFICATIONS);
        let model = IndexModel::builder()
            .keys(doc! { "recipient": 1, "createdAt": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}
