// Domain layer - value types shared by every other layer
pub mod query;
pub mod reading;
pub mod snapshot;
