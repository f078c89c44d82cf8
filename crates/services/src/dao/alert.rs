use async_trait::async_trait;
use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use adjutant_db::models::{Alert, AlertStatus, AlertType};
use serde::Serialize;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

#[derive(Debug, Clone, Serialize)]
pub struct AlertStats {
    pub total: u64,
    pub unread: u64,
    pub urgent_unread: u64,
    pub email_alerts: u64,
    pub meeting_alerts: u64,
}

/// Persistence boundary for alerts. All queries are scoped to one owner
/// except the cross-user sweep query; state transitions are expressed as
/// conditional updates so a transition out of a terminal state can never
/// happen, no matter who calls.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert(&self, alert: &Alert) -> DaoResult<Alert>;

    async fn find_for_user(&self, user_id: ObjectId, alert_id: ObjectId) -> DaoResult<Alert>;

    async fn find_filtered(
        &self,
        user_id: ObjectId,
        alert_type: Option<AlertType>,
        status: Option<AlertStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Alert>>;

    /// Pending and sent alerts, newest first.
    async fn find_unread(&self, user_id: ObjectId) -> DaoResult<Vec<Alert>>;

    /// Sweep query: pending alerts whose `scheduled_for` has elapsed.
    /// A null `scheduled_for` counts as immediately due.
    async fn find_due_pending(&self, now: DateTime) -> DaoResult<Vec<Alert>>;

    /// `pending -> sent`, stamping `sent_at` exactly once. Returns false
    /// when the alert was not pending (already sent, read or dismissed).
    async fn transition_sent(&self, alert_id: ObjectId, now: DateTime) -> DaoResult<bool>;

    /// `pending|sent -> read`, stamping `read_at`.
    async fn mark_read(&self, user_id: ObjectId, alert_id: ObjectId, now: DateTime)
    -> DaoResult<bool>;

    /// `pending|sent -> dismissed`, stamping `dismissed_at`.
    async fn dismiss(&self, user_id: ObjectId, alert_id: ObjectId, now: DateTime)
    -> DaoResult<bool>;

    /// Bulk `pending|sent -> read` for one owner; returns the number of
    /// alerts actually transitioned.
    async fn mark_all_read(&self, user_id: ObjectId, now: DateTime) -> DaoResult<u64>;

    /// Per-day idempotency guard for the morning briefing.
    async fn briefing_exists_since(&self, user_id: ObjectId, since: DateTime) -> DaoResult<bool>;

    async fn stats(&self, user_id: ObjectId) -> DaoResult<AlertStats>;
}

pub struct AlertDao {
    pub base: BaseDao<Alert>,
}

impl AlertDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Alert::COLLECTION),
        }
    }
}

#[async_trait]
impl AlertStore for AlertDao {
    async fn insert(&self, alert: &Alert) -> DaoResult<Alert> {
        let id = self.base.insert_one(alert).await?;
        self.base.find_by_id(id).await
    }

    async fn find_for_user(&self, user_id: ObjectId, alert_id: ObjectId) -> DaoResult<Alert> {
        self.base.find_by_id_for_user(user_id, alert_id).await
    }

    async fn find_filtered(
        &self,
        user_id: ObjectId,
        alert_type: Option<AlertType>,
        status: Option<AlertStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Alert>> {
        let mut filter = doc! { "user_id": user_id };
        if let Some(alert_type) = alert_type {
            filter.insert("alert_type", alert_type.as_str());
        }
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.base
            .find_paginated(filter, Some(doc! { "created_at": -1 }), params)
            .await
    }

    async fn find_unread(&self, user_id: ObjectId) -> DaoResult<Vec<Alert>> {
        self.base
            .find_many(
                doc! {
                    "user_id": user_id,
                    "status": { "$in": ["pending", "sent"] },
                },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }

    async fn find_due_pending(&self, now: DateTime) -> DaoResult<Vec<Alert>> {
        self.base
            .find_many(
                doc! {
                    "status": "pending",
                    "$or": [
                        { "scheduled_for": null },
                        { "scheduled_for": { "$lte": now } },
                    ],
                },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    async fn transition_sent(&self, alert_id: ObjectId, now: DateTime) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": alert_id, "status": "pending" },
                doc! { "$set": { "status": "sent", "sent_at": now } },
            )
            .await
    }

    async fn mark_read(
        &self,
        user_id: ObjectId,
        alert_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! {
                    "_id": alert_id,
                    "user_id": user_id,
                    "status": { "$in": ["pending", "sent"] },
                },
                doc! { "$set": { "status": "read", "read_at": now } },
            )
            .await
    }

    async fn dismiss(
        &self,
        user_id: ObjectId,
        alert_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! {
                    "_id": alert_id,
                    "user_id": user_id,
                    "status": { "$in": ["pending", "sent"] },
                },
                doc! { "$set": { "status": "dismissed", "dismissed_at": now } },
            )
            .await
    }

    async fn mark_all_read(&self, user_id: ObjectId, now: DateTime) -> DaoResult<u64> {
        self.base
            .update_many(
                doc! {
                    "user_id": user_id,
                    "status": { "$in": ["pending", "sent"] },
                },
                doc! { "$set": { "status": "read", "read_at": now } },
            )
            .await
    }

    async fn briefing_exists_since(&self, user_id: ObjectId, since: DateTime) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! {
                "user_id": user_id,
                "alert_type": AlertType::MorningBriefing.as_str(),
                "created_at": { "$gte": since },
            })
            .await?;
        Ok(count > 0)
    }

    async fn stats(&self, user_id: ObjectId) -> DaoResult<AlertStats> {
        let total = self.base.count(doc! { "user_id": user_id }).await?;
        let unread = self
            .base
            .count(doc! { "user_id": user_id, "status": { "$in": ["pending", "sent"] } })
            .await?;
        let urgent_unread = self
            .base
            .count(doc! {
                "user_id": user_id,
                "priority": "urgent",
                "status": { "$in": ["pending", "sent"] },
            })
            .await?;
        let email_alerts = self
            .base
            .count(doc! {
                "user_id": user_id,
                "alert_type": { "$in": ["email_vip", "email_emergency"] },
            })
            .await?;
        let meeting_alerts = self
            .base
            .count(doc! {
                "user_id": user_id,
                "alert_type": AlertType::MeetingReminder.as_str(),
            })
            .await?;

        Ok(AlertStats {
            total,
            unread,
            urgent_unread,
            email_alerts,
            meeting_alerts,
        })
    }
}

// Contract tests exercised against the in-memory store double, which
// mirrors the Mongo filter semantics above.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::base::PaginationParams;
    use crate::test_support::{MemoryAlertStore, alert_of_type};
    use adjutant_db::models::AlertStatus;

    fn seeded(user_id: ObjectId, status: AlertStatus) -> Alert {
        let mut alert = alert_of_type(AlertType::System);
        alert.user_id = user_id;
        alert.status = status;
        alert
    }

    #[tokio::test]
    async fn mark_all_read_only_touches_pending_and_sent() {
        let store = MemoryAlertStore::new();
        let user_id = ObjectId::new();
        let now = DateTime::now();

        store.push_raw(seeded(user_id, AlertStatus::Pending));
        store.push_raw(seeded(user_id, AlertStatus::Sent));
        store.push_raw(seeded(user_id, AlertStatus::Read));
        store.push_raw(seeded(user_id, AlertStatus::Dismissed));
        // Another user's pending alert must be untouched.
        store.push_raw(seeded(ObjectId::new(), AlertStatus::Pending));

        let updated = store.mark_all_read(user_id, now).await.unwrap();
        assert_eq!(updated, 2);

        let unread = store.find_unread(user_id).await.unwrap();
        assert!(unread.is_empty());
    }

    #[tokio::test]
    async fn terminal_states_cannot_transition() {
        let store = MemoryAlertStore::new();
        let user_id = ObjectId::new();
        let now = DateTime::now();

        let read = store.push_raw(seeded(user_id, AlertStatus::Read));
        let dismissed = store.push_raw(seeded(user_id, AlertStatus::Dismissed));

        assert!(!store.mark_read(user_id, read.id.unwrap(), now).await.unwrap());
        assert!(!store.dismiss(user_id, read.id.unwrap(), now).await.unwrap());
        assert!(
            !store
                .transition_sent(dismissed.id.unwrap(), now)
                .await
                .unwrap()
        );

        let still_dismissed = store
            .find_for_user(user_id, dismissed.id.unwrap())
            .await
            .unwrap();
        assert_eq!(still_dismissed.status, AlertStatus::Dismissed);
        assert!(still_dismissed.sent_at.is_none());
    }

    #[tokio::test]
    async fn dismiss_is_reachable_from_pending_and_sent() {
        let store = MemoryAlertStore::new();
        let user_id = ObjectId::new();
        let now = DateTime::now();

        let pending = store.push_raw(seeded(user_id, AlertStatus::Pending));
        let sent = store.push_raw(seeded(user_id, AlertStatus::Sent));

        assert!(store.dismiss(user_id, pending.id.unwrap(), now).await.unwrap());
        assert!(store.dismiss(user_id, sent.id.unwrap(), now).await.unwrap());

        let dismissed = store
            .find_for_user(user_id, pending.id.unwrap())
            .await
            .unwrap();
        assert!(dismissed.dismissed_at.is_some());
        // Dismissed without ever being read.
        assert!(dismissed.read_at.is_none());
    }

    #[tokio::test]
    async fn unread_is_pending_union_sent() {
        let store = MemoryAlertStore::new();
        let user_id = ObjectId::new();

        store.push_raw(seeded(user_id, AlertStatus::Pending));
        store.push_raw(seeded(user_id, AlertStatus::Sent));
        store.push_raw(seeded(user_id, AlertStatus::Read));

        let unread = store.find_unread(user_id).await.unwrap();
        assert_eq!(unread.len(), 2);
    }

    #[tokio::test]
    async fn filtered_query_scopes_by_owner_type_and_status() {
        let store = MemoryAlertStore::new();
        let user_id = ObjectId::new();

        let mut vip = alert_of_type(AlertType::EmailVip);
        vip.user_id = user_id;
        store.push_raw(vip);
        let mut reminder = alert_of_type(AlertType::MeetingReminder);
        reminder.user_id = user_id;
        store.push_raw(reminder);

        let result = store
            .find_filtered(
                user_id,
                Some(AlertType::EmailVip),
                None,
                &PaginationParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].alert_type, AlertType::EmailVip);

        let other = store
            .find_filtered(ObjectId::new(), None, None, &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(other.total, 0);
    }
}
