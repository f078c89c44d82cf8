pub mod alert;
pub mod calendar_event;
pub mod email;
pub mod user;

pub use alert::{Alert, AlertPriority, AlertStatus, AlertType};
pub use calendar_event::CalendarEvent;
pub use email::{Email, EmailPriority, EmailStatus};
pub use user::{PushSubscription, User};
