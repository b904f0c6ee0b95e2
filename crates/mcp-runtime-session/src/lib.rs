//! Durable, resumable, event-sourced MCP session engine (spec §3, §4.1,
//! §4.3, §4.4).
//!
//! A session is an append-only event log plus a small set of durable
//! attributes (negotiated protocol version, advertised catalogs, active
//! subscriptions). The in-memory [`Session`] projection is the thing a
//! protocol router talks to; the [`SessionStore`] underneath can be swapped
//! for a durable backend without changing router code.

pub mod data;
pub mod error;
pub mod event;
pub mod id;
pub mod session;
pub mod store;
pub mod subscription;

pub use data::{Capabilities, CatalogEntry, ImplementationInfo, SessionData};
pub use error::{Error, Result};
pub use event::{now_millis, ChannelId, Event, EventId, EventKind};
pub use id::{SessionId, MAX_SESSION_ID_LEN};
pub use session::{Channel, ChannelClosed, Session, SessionState};
pub use store::{MemorySessionStore, SessionStore};
pub use subscription::SubscriptionIndex;
