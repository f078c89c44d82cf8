use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use adjutant_db::models::{PushSubscription, User};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        full_name: String,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email,
            full_name,
            password_hash,
            is_active: true,
            mail_username: None,
            mail_password: None,
            imap_host: None,
            smtp_host: None,
            smtp_port: None,
            google_access_token: None,
            google_refresh_token: None,
            assistant_tone: "professional".to_string(),
            assistant_language: "en".to_string(),
            vip_senders: Vec::new(),
            emergency_keywords: Vec::new(),
            briefing_time: "08:00".to_string(),
            push_subscriptions: Vec::new(),
            phone_number: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_active(&self) -> DaoResult<Vec<User>> {
        self.base
            .find_many(doc! { "is_active": true }, Some(doc! { "created_at": 1 }))
            .await
    }

    pub async fn update_google_tokens(
        &self,
        user_id: ObjectId,
        access_token: String,
        refresh_token: Option<String>,
    ) -> DaoResult<bool> {
        let mut set = doc! { "google_access_token": access_token };
        if let Some(refresh) = refresh_token {
            set.insert("google_refresh_token", refresh);
        }
        self.base.update_by_id(user_id, doc! { "$set": set }).await
    }

    pub async fn update_settings(
        &self,
        user_id: ObjectId,
        vip_senders: Option<Vec<String>>,
        emergency_keywords: Option<Vec<String>>,
        briefing_time: Option<String>,
        phone_number: Option<String>,
    ) -> DaoResult<bool> {
        let mut update = bson::Document::new();
        if let Some(vips) = vip_senders {
            update.insert("vip_senders", vips);
        }
        if let Some(keywords) = emergency_keywords {
            update.insert("emergency_keywords", keywords);
        }
        if let Some(time) = briefing_time {
            update.insert("briefing_time", time);
        }
        if let Some(phone) = phone_number {
            update.insert("phone_number", phone);
        }

        if update.is_empty() {
            return Ok(false);
        }

        self.base
            .update_by_id(user_id, doc! { "$set": update })
            .await
    }

    pub async fn add_push_subscription(
        &self,
        user_id: ObjectId,
        subscription: &PushSubscription,
    ) -> DaoResult<bool> {
        self.base
            .update_by_id(
                user_id,
                doc! {
                    "$push": {
                        "push_subscriptions": bson::to_bson(subscription)
                            .map_err(bson::ser::Error::from)?,
                    }
                },
            )
            .await
    }
}
