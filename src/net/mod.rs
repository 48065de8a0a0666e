pub mod dispatch;
pub mod handlers;
pub mod protocol;
pub mod scheduler;
