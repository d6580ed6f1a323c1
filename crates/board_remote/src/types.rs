use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RemoteError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    MissingConfig,
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    AuthRejected,
    NotFound,
    FeedLost,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingConfig => write!(f, "missing configuration"),
            ErrorKind::InvalidUrl => write!(f, "invalid url"),
            ErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Decode => write!(f, "decode error"),
            ErrorKind::AuthRejected => write!(f, "authentication rejected"),
            ErrorKind::NotFound => write!(f, "record not found"),
            ErrorKind::FeedLost => write!(f, "change feed lost"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Insert,
    Update,
    Delete,
}

/// One line of the change feed: which table changed and, when the backend
/// includes them, the touched record id and key columns. The payload is
/// never trusted as a differential patch; it only triggers a refetch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeNotification {
    pub table: String,
    pub event: EventKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

/// Collection scope of one subscription: a table plus an optional equality
/// predicate on a key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub table: String,
    pub filter: Option<(String, String)>,
}

impl Scope {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn filtered(
        table: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            filter: Some((column.into(), value.into())),
        }
    }

    /// Whether `notification` falls inside this scope. An absent key column
    /// still matches: the payload is not guaranteed complete, and a spurious
    /// refetch is cheaper than a missed change.
    pub fn matches(&self, notification: &ChangeNotification) -> bool {
        if self.table != notification.table {
            return false;
        }
        match &self.filter {
            None => true,
            Some((column, value)) => match notification.keys.get(column) {
                Some(actual) => actual == value,
                None => true,
            },
        }
    }
}
