/**
 * Application State
 *
 * `AppState` is the single state value handed to the Axum router. It holds
 * the live gateway (which owns the store, the room bus and the connection
 * registry) and the identity verifier.
 *
 * # State Extraction
 *
 * The `FromRef` implementations let handlers extract just the part they
 * need, e.g. `State(gateway): State<Arc<Gateway>>`.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::IdentityVerifier;
use crate::backend::realtime::Gateway;
use crate::backend::store::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { gateway, verifier }
    }

    pub fn store(&self) -> &SharedStore {
        self.gateway.store()
    }
}

impl FromRef<AppState> for Arc<Gateway> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gateway.clone()
    }
}

impl FromRef<AppState> for Arc<dyn IdentityVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verifier.clone()
    }
}
