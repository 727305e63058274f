// Snapshot domain model - immutable view of the store state
use super::reading::Reading;
use std::sync::Arc;

/// Cache-stable projection of the store state. Handed out as `Arc<Snapshot>`;
/// two requests with no mutation in between return the same allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub data: Arc<[Reading]>,
    pub is_connected: bool,
    pub error: Option<String>,
}

impl Snapshot {
    pub fn new(data: Arc<[Reading]>, is_connected: bool, error: Option<String>) -> Self {
        Self {
            data,
            is_connected,
            error,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
