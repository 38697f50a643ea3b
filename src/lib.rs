//! NagaBridge - UDP bridge from the Netsnake game server to a
//! synchronous, step-based control interface.
//!
//! The server speaks a lossy, best-effort text protocol over UDP; a
//! decision-making agent wants a blocking `reset`/`step` loop. The
//! bridge sits in between:
//!
//! - **Protocol codec** ([`protocol`]): pure decode of `<len>::<body>`
//!   state frames into snapshots, pure encode of discrete actions into
//!   command tokens
//! - **Grid reconstructor** ([`observation`], [`reward`]): snapshot to
//!   occupancy grid (wall border, apple, heads, tail chains) and to a
//!   scalar reward
//! - **Transport worker** ([`transport`]): a thread owning the socket,
//!   multiplexing it against the command inbox, de-duplicating frames
//!   into a single-slot mailbox
//! - **Environment facade** ([`env`]): the synchronous boundary with
//!   `reset`/`step`/`render`/`close`
//!
//! Dropped, duplicated, and out-of-order datagrams are expected;
//! correctness means converging to the latest known state, not seeing
//! every frame.

pub mod config;
pub mod env;
pub mod error;
pub mod observation;
pub mod protocol;
pub mod reward;
pub mod transport;

pub use config::{BridgeConfig, ConnectionConfig, GameConfig, RewardConfig};
pub use env::{SnakeEnv, Step};
pub use error::{BridgeError, Result};
pub use observation::{CellCode, ObservationGrid};
pub use protocol::{ActionSet, Command, Coord, Direction, PlayerState, Snapshot, encode_action};
pub use reward::RewardTracker;
pub use transport::{MAX_DATAGRAM_SIZE, TransportHandle};
