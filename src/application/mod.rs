// Application layer - use cases and the seams they depend on
pub mod dashboard_service;
pub mod query_pipeline;
pub mod reading_source;
pub mod sensor_store;
pub mod timing;
