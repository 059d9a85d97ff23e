// Recurring publish runs

pub mod engine;

pub use engine::{PublishJob, PublishScheduler};
