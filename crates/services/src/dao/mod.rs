pub mod alert;
pub mod base;
pub mod calendar_event;
pub mod email;
pub mod user;

pub use alert::{AlertDao, AlertStats, AlertStore};
pub use base::BaseDao;
pub use calendar_event::CalendarEventDao;
pub use email::EmailDao;
pub use user::UserDao;
