use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use adjutant_db::models::{Email, EmailStatus};

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

pub struct EmailDao {
    pub base: BaseDao<Email>,
}

impl EmailDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Email::COLLECTION),
        }
    }

    pub async fn insert(&self, email: &Email) -> DaoResult<Email> {
        let id = self.base.insert_one(email).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_message_id(&self, message_id: &str) -> DaoResult<Option<Email>> {
        self.base.find_one(doc! { "message_id": message_id }).await
    }

    pub async fn find_filtered(
        &self,
        user_id: ObjectId,
        status: Option<EmailStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Email>> {
        let mut filter = doc! { "user_id": user_id };
        if let Some(status) = status {
            filter.insert("status", bson::to_bson(&status).map_err(bson::ser::Error::from)?);
        }
        self.base
            .find_paginated(filter, Some(doc! { "received_at": -1 }), params)
            .await
    }

    /// Recent emails still needing the user's attention, newest first;
    /// feeds the morning briefing.
    pub async fn find_recent_notable(
        &self,
        user_id: ObjectId,
        since: DateTime,
        limit: usize,
    ) -> DaoResult<Vec<Email>> {
        let mut emails = self
            .base
            .find_many(
                doc! {
                    "user_id": user_id,
                    "received_at": { "$gte": since },
                    "status": { "$in": ["unread", "important", "emergency"] },
                },
                Some(doc! { "received_at": -1 }),
            )
            .await?;
        emails.truncate(limit);
        Ok(emails)
    }

    pub async fn mark_read(&self, user_id: ObjectId, email_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": email_id, "user_id": user_id },
                doc! { "$set": { "status": "read" } },
            )
            .await
    }
}
