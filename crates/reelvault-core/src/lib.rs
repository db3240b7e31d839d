pub mod announce;
pub mod caption;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod html;
pub mod link;
pub mod metadata;
pub mod models;
pub mod replication;
pub mod resolver;
pub mod runtime;
pub mod search;
pub mod session;
pub mod storage;
pub mod transport;

pub use config::BotConfig;
pub use error::{LinkError, MetadataError, ReplicationError, SessionError, TransportError};
pub use models::*;
pub use runtime::BotRuntime;
pub use storage::Storage;
