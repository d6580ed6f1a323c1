use std::collections::BTreeMap;
use std::sync::Mutex;

use board_logging::board_warn;
use futures_util::StreamExt;

use crate::rest::{map_reqwest_error, status_error, RemoteSettings, API_KEY_HEADER};
use crate::types::{ChangeNotification, ErrorKind, RemoteError, Scope};

pub type SubscriptionId = u64;

/// Receiver of scope-matched change notifications.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, scope: &Scope, notification: &ChangeNotification);
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: SubscriptionId,
    scopes: BTreeMap<SubscriptionId, Scope>,
}

/// Live subscription slots. Registration is the explicit acquisition the
/// core pairs with a release on view teardown; `unsubscribe` is idempotent.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    inner: Mutex<RegistryInner>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, scope: Scope) -> SubscriptionId {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.next_id += 1;
        let id = inner.next_id;
        inner.scopes.insert(id, scope);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.scopes.remove(&id);
    }

    /// Unique registered scopes matching `notification`, in registration
    /// order. Two handles on the same scope yield one delivery.
    pub fn matching(&self, notification: &ChangeNotification) -> Vec<Scope> {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut scopes: Vec<Scope> = Vec::new();
        for scope in inner.scopes.values() {
            if scope.matches(notification) && !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }
        scopes
    }
}

/// Streaming change feed: a long-lived request whose body is a sequence of
/// `data: {...}` lines, one per backend-side change.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    settings: RemoteSettings,
}

impl ChangeFeed {
    pub fn new(settings: RemoteSettings) -> Self {
        Self { settings }
    }

    /// Consumes the feed until it drops, forwarding each notification to
    /// every matching registered scope. Always returns the terminal error;
    /// a cleanly closed stream still means lost delivery.
    pub async fn run(
        &self,
        registry: &ScopeRegistry,
        sink: &dyn NotificationSink,
    ) -> RemoteError {
        match self.consume(registry, sink).await {
            Ok(()) => RemoteError::new(ErrorKind::FeedLost, "change feed closed"),
            Err(err) => err,
        }
    }

    async fn consume(
        &self,
        registry: &ScopeRegistry,
        sink: &dyn NotificationSink,
    ) -> Result<(), RemoteError> {
        let url = self.settings.endpoint(&["realtime", "v1", "changes"])?;
        // No request timeout here: the stream is expected to stay open
        // indefinitely between notifications.
        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| RemoteError::new(ErrorKind::Network, err.to_string()))?;

        let response = client
            .get(url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            buffer.extend_from_slice(&chunk);
            while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(notification) = parse_line(&line[..newline]) {
                    for scope in registry.matching(&notification) {
                        sink.deliver(&scope, &notification);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parses one feed line. Blank lines and `:` comments are keep-alives;
/// anything else must be a `data:`-prefixed JSON notification.
fn parse_line(line: &[u8]) -> Option<ChangeNotification> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() || text.starts_with(':') {
        return None;
    }
    let payload = text.strip_prefix("data:")?.trim();
    match serde_json::from_str(payload) {
        Ok(notification) => Some(notification),
        Err(err) => {
            board_warn!("Discarding malformed change-feed line: {err}");
            None
        }
    }
}
