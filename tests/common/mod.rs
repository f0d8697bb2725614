//! Common test utilities and helpers
//!
//! - In-memory gateway fixtures
//! - Seeded users and tokens
//! - Live test clients with timeout-bounded receives
//! - Custom assertion macros

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chatgate::backend::auth::{create_token, Identity, JwtVerifier};
use chatgate::backend::realtime::{
    ConnectionHandle, ConnectionInbox, Gateway, LocalRoomBus, RoomBus, RoomId,
};
use chatgate::backend::server::AppState;
use chatgate::backend::store::{MemoryStore, SharedStore};
use chatgate::shared::messaging::{CreateGroupRequest, Group, Role, User};
use chatgate::shared::{ClientIntent, ServerEvent};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-for-chatgate";

/// How long a receive waits before the test fails
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a connection must stay quiet to count as silent
pub const SILENCE: Duration = Duration::from_millis(100);

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Gateway over a fresh in-memory store
pub struct TestGateway {
    pub gateway: Arc<Gateway>,
    pub store: SharedStore,
    pub bus: Arc<dyn RoomBus>,
}

impl TestGateway {
    pub fn new() -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let bus: Arc<dyn RoomBus> = Arc::new(LocalRoomBus::new(64));
        let gateway = Arc::new(Gateway::new(store.clone(), bus.clone()));
        Self { gateway, store, bus }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.gateway.clone(),
            Arc::new(JwtVerifier::new(TEST_SECRET)),
        )
    }

    pub async fn seed_user(&self, name: &str) -> User {
        let email = format!("{}_{}@example.com", name, Uuid::new_v4());
        self.store
            .create_user(&User::new(email, name))
            .await
            .expect("seed user")
    }

    /// Admit a live connection for `user`
    pub async fn connect(&self, user: &User) -> TestClient {
        let (handle, inbox, rooms) = assert_ok!(
            self.gateway.connect(identity(user)).await,
            "admission failed"
        );
        TestClient {
            user_id: user.id,
            handle,
            inbox,
            rooms,
        }
    }

    pub async fn create_group(&self, owner: &User, name: &str) -> Group {
        assert_ok!(
            self.gateway
                .router()
                .create_group(
                    owner.id,
                    CreateGroupRequest {
                        name: name.to_string(),
                        description: None,
                    },
                )
                .await
        )
    }
}

pub fn identity(user: &User) -> Identity {
    Identity {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

pub fn token_for(user: &User) -> String {
    create_token(
        TEST_SECRET,
        Duration::from_secs(3600),
        user.id,
        user.email.clone(),
        Role::User,
    )
    .expect("test token")
}

/// One live connection as seen by a test
pub struct TestClient {
    pub user_id: Uuid,
    pub handle: ConnectionHandle,
    pub inbox: ConnectionInbox,
    pub rooms: Vec<RoomId>,
}

impl TestClient {
    pub async fn send(&self, gateway: &Gateway, intent: ClientIntent) -> ServerEvent {
        match gateway.dispatch(&self.handle, intent).await {
            Ok(ack) => ack,
            Err(err) => err.to_event(),
        }
    }

    /// Next event, failing the test if none arrives in time
    pub async fn next_event(&mut self) -> ServerEvent {
        match tokio::time::timeout(RECV_TIMEOUT, self.inbox.recv()).await {
            Ok(Some(event)) => (*event).clone(),
            Ok(None) => panic!("connection {} closed", self.handle.id()),
            Err(_) => panic!("no event for user {} within {:?}", self.user_id, RECV_TIMEOUT),
        }
    }

    /// Every event currently queued for this connection
    pub async fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(SILENCE, self.inbox.recv()).await {
            events.push((*event).clone());
        }
        events
    }

    pub async fn assert_silent(&mut self) {
        if let Ok(Some(event)) = tokio::time::timeout(SILENCE, self.inbox.recv()).await {
            panic!("user {} unexpectedly received {:?}", self.user_id, event);
        }
    }
}

/// Names of the events, in order
pub fn event_names(events: &[ServerEvent]) -> Vec<&'static str> {
    events.iter().map(ServerEvent::event_name).collect()
}
