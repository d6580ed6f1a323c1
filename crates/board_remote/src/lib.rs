//! StudioBoard remote: backend client, change feed and command handle.
mod auth;
mod handle;
mod persist;
mod realtime;
mod rest;
mod types;

pub use auth::{sign_in, sign_in_blocking, Session};
pub use handle::{RemoteCommander, RemoteEvent, RemoteHandle};
pub use persist::{ensure_state_dir, AtomicStateWriter, PersistError};
pub use realtime::{ChangeFeed, NotificationSink, ScopeRegistry, SubscriptionId};
pub use rest::{Api, RestApi, RemoteSettings, RowQuery, SortDir};
pub use types::{ChangeNotification, ErrorKind, EventKind, RemoteError, Scope};
