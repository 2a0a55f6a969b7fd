mod error;
mod replay;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use replay::messages_from_events;
pub use schema::{Message, MessageRole, SessionSummary};
pub use store::{SessionApi, SessionStore};
