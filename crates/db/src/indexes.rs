use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        "users",
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Emails
    create_indexes(
        db,
        "emails",
        vec![
            index_unique(bson::doc! { "message_id": 1 }),
            index(bson::doc! { "user_id": 1, "status": 1, "received_at": -1 }),
            index(bson::doc! { "user_id": 1, "priority": 1, "received_at": -1 }),
        ],
    )
    .await?;

    // Calendar events
    create_indexes(
        db,
        "calendar_events",
        vec![
            index_unique(bson::doc! { "google_event_id": 1 }),
            index(bson::doc! { "reminder_sent": 1, "start_at": 1 }),
            index(bson::doc! { "user_id": 1, "start_at": 1 }),
        ],
    )
    .await?;

    // Alerts
    create_indexes(
        db,
        "alerts",
        vec![
            index(bson::doc! { "user_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "user_id": 1, "alert_type": 1, "created_at": -1 }),
            index(bson::doc! { "status": 1, "scheduled_for": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
