//! Report draft adapters

mod file;

pub use file::{DraftRecord, JsonDraftStore};
