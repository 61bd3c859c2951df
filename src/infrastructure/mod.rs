pub mod http_executor;
pub mod scheduled_task;

pub use http_executor::HttpExecutor;
pub use scheduled_task::ScheduledTask;
