//! Recording session entity

pub mod session;

pub use session::{InterruptOutcome, Session, SessionStatus, TickOutcome};
