//! Real-time Gateway
//!
//! Live WebSocket connections, the rooms they subscribe to and the bus that
//! carries events between them.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs         - Module exports
//! ├── bus.rs         - Room bus trait and in-process broadcast bus
//! ├── connection.rs  - Per-connection handle and inbox
//! ├── emitter.rs     - Fan-out to one or more rooms
//! ├── gateway.rs     - Admission, dispatch, eviction
//! ├── locks.rs       - Per-room async locks
//! ├── registry.rs    - User <-> connection index
//! ├── rooms.rs       - Room ids and membership resolution
//! └── socket.rs      - `GET /messaging` WebSocket transport
//! ```
//!
//! # Event flow
//!
//! A write goes router -> store -> emitter -> bus. Each connection inbox
//! holds one bus receiver per room it is subscribed to, and the socket task
//! forwards whatever the inbox yields.

pub mod bus;
pub mod connection;
pub mod emitter;
pub mod gateway;
pub mod locks;
pub mod registry;
pub mod rooms;
pub mod socket;

pub use bus::{LocalRoomBus, RoomBus, SharedEvent};
pub use connection::{ConnectionHandle, ConnectionId, ConnectionInbox};
pub use emitter::FanOutEmitter;
pub use gateway::Gateway;
pub use registry::ConnectionRegistry;
pub use rooms::{RoomId, RoomMembershipResolver};
pub use socket::messaging_socket;
