use std::sync::Arc;

use calple_core::store::DocumentStore;

use crate::auth::SessionAuth;

/// Shared request dependencies. The store handle and session resolver are
/// long-lived and safe for concurrent use; handlers treat both as stateless.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn SessionAuth>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, sessions: Arc<dyn SessionAuth>) -> Self {
        AppState { store, sessions }
    }
}
