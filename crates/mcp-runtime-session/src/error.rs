//! Errors raised by the session engine.

use crate::id::SessionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session terminated: {0}")]
    Terminated(SessionId),

    #[error("no channel attached to session {0}")]
    NoChannelAttached(SessionId),

    #[error("event id {requested} not found in session {session} (earliest retained: {earliest:?})")]
    EventNotFound {
        session: SessionId,
        requested: crate::event::EventId,
        earliest: Option<crate::event::EventId>,
    },

    #[error("store error: {0}")]
    Store(String),
}
