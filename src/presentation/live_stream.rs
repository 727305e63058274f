// Live view streaming - re-derive the view on every store notification
use crate::application::dashboard_service::{DashboardQuery, DashboardService};
use crate::application::sensor_store::{SensorDataStore, Subscription};
use crate::presentation::view_mapper::{view_to_response, ViewResponse};
use axum::response::sse::Event;
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;

/// Bridge store notifications into a watch channel the async side can await.
/// The listener only bumps a counter; derivation happens on the stream.
pub fn watch_store(store: &SensorDataStore) -> (Subscription, watch::Receiver<u64>) {
    let (tx, rx) = watch::channel(0u64);
    let subscription = store.subscribe(move || {
        tx.send_modify(|version| *version = version.wrapping_add(1));
    });
    (subscription, rx)
}

/// One view immediately, then one per store notification. Ends when the store
/// is destroyed and the notifying side goes away.
pub fn view_stream(
    service: Arc<DashboardService>,
    mut updates: watch::Receiver<u64>,
    query: DashboardQuery,
) -> impl Stream<Item = ViewResponse> {
    async_stream::stream! {
        let _ = updates.borrow_and_update();
        loop {
            yield view_to_response(service.build_view(&query));
            if updates.changed().await.is_err() {
                break;
            }
        }
    }
}

pub fn to_event(view: &ViewResponse) -> Result<Event, Infallible> {
    match Event::default().event("view").json_data(view) {
        Ok(event) => Ok(event),
        Err(e) => {
            tracing::error!("Failed to encode view event: {}", e);
            Ok(Event::default().event("error").data(e.to_string()))
        }
    }
}
