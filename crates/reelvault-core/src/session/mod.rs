//! Per-admin multi-step sessions.

pub mod machine;
pub mod model;
pub mod store;

pub use machine::{BatchCapture, NodeKind, SessionCommand, SessionMachine, Transition};
pub use model::{Session, SessionAction};
pub use store::SessionStore;
