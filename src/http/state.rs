use crate::relay::{RealtimeRelay, RelaySettings};

/// Shared application state for HTTP handlers
///
/// Holds only the upstream settings; every turn opens its own session.
#[derive(Clone)]
pub struct AppState {
    pub relay: RealtimeRelay,
}

impl AppState {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            relay: RealtimeRelay::new(settings),
        }
    }
}
