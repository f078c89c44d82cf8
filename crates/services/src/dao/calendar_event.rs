use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use adjutant_db::models::CalendarEvent;

use super::base::{BaseDao, DaoResult};

pub struct CalendarEventDao {
    pub base: BaseDao<CalendarEvent>,
}

impl CalendarEventDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, CalendarEvent::COLLECTION),
        }
    }

    pub async fn insert(&self, event: &CalendarEvent) -> DaoResult<CalendarEvent> {
        let id = self.base.insert_one(event).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_google_id(&self, google_event_id: &str) -> DaoResult<Option<CalendarEvent>> {
        self.base
            .find_one(doc! { "google_event_id": google_event_id })
            .await
    }

    /// Events starting within the next `hours` for one user, soonest first.
    pub async fn find_upcoming(
        &self,
        user_id: ObjectId,
        hours: i64,
    ) -> DaoResult<Vec<CalendarEvent>> {
        let now = DateTime::now();
        let horizon = DateTime::from_millis(now.timestamp_millis() + hours * 3600 * 1000);
        self.base
            .find_many(
                doc! {
                    "user_id": user_id,
                    "start_at": { "$gte": now, "$lte": horizon },
                },
                Some(doc! { "start_at": 1 }),
            )
            .await
    }

    /// Cross-user query driving the reminder scan: no reminder sent yet
    /// and the start falls inside the per-event reminder window. The
    /// window upper bound cannot be expressed per-document in one filter,
    /// so candidates inside the widest supported window are fetched and
    /// narrowed with [`CalendarEvent::needs_reminder`].
    pub async fn find_needing_reminder(&self) -> DaoResult<Vec<CalendarEvent>> {
        const WIDEST_WINDOW_MINS: i64 = 120;
        let now = DateTime::now();
        let horizon = DateTime::from_millis(now.timestamp_millis() + WIDEST_WINDOW_MINS * 60_000);
        let candidates = self
            .base
            .find_many(
                doc! {
                    "reminder_sent": false,
                    "start_at": { "$gt": now, "$lte": horizon },
                },
                Some(doc! { "start_at": 1 }),
            )
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|e| e.needs_reminder(now))
            .collect())
    }

    pub async fn mark_reminder_sent(&self, event_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(event_id, doc! { "$set": { "reminder_sent": true } })
            .await
    }
}
