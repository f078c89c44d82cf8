pub mod assistant;
pub mod auth;
pub mod background;
pub mod calendar;
pub mod dao;
pub mod mail;
pub mod notify;

pub use assistant::AssistantService;
pub use auth::AuthService;
pub use background::Scheduler;
pub use calendar::CalendarService;
pub use dao::*;
pub use mail::MailService;
pub use notify::{AlertFactory, DispatchEngine};

#[cfg(test)]
pub(crate) mod test_support;
