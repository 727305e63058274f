// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod performance_monitor;
pub mod simulated_source;
