pub mod scheduler;
pub mod tasks;

pub use scheduler::{Cadence, Scheduler, SchedulerHandle};
pub use tasks::{TaskContext, register_tasks};
