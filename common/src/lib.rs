// Common library for the egg shop publisher

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod process;
pub mod schedule;
pub mod scheduler;
pub mod secrets;
pub mod shop;
pub mod telemetry;
pub mod vcs;
