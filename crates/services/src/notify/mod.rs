pub mod channel;
pub mod dispatch;
pub mod email;
pub mod factory;
pub mod push;
pub mod sms;

pub use channel::{ChannelError, NotificationChannel};
pub use dispatch::DispatchEngine;
pub use email::EmailChannel;
pub use factory::AlertFactory;
pub use push::PushChannel;
pub use sms::SmsChannel;
