use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::auth::Session;
use crate::realtime::{ChangeFeed, NotificationSink, ScopeRegistry, SubscriptionId};
use crate::rest::{Api, RemoteSettings, RestApi, RowQuery};
use crate::types::{ChangeNotification, RemoteError, Scope};

enum RemoteCommand {
    Fetch {
        ticket: u64,
        table: String,
        query: RowQuery,
    },
    Write {
        ticket: u64,
        table: String,
        record_id: String,
        delta: serde_json::Value,
    },
    Insert {
        ticket: u64,
        table: String,
        row: serde_json::Value,
    },
    EnsureFeed,
}

/// Everything the backend reports back, drained by the shell's event pump.
/// Tickets echo the caller-chosen correlation id of the originating call.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    FetchCompleted {
        ticket: u64,
        result: Result<Vec<serde_json::Value>, RemoteError>,
    },
    WriteCompleted {
        ticket: u64,
        result: Result<serde_json::Value, RemoteError>,
    },
    InsertCompleted {
        ticket: u64,
        result: Result<serde_json::Value, RemoteError>,
    },
    Change {
        scope: Scope,
        notification: ChangeNotification,
    },
    FeedLost {
        error: RemoteError,
    },
}

struct ChannelSink {
    tx: mpsc::Sender<RemoteEvent>,
}

impl NotificationSink for ChannelSink {
    fn deliver(&self, scope: &Scope, notification: &ChangeNotification) {
        let _ = self.tx.send(RemoteEvent::Change {
            scope: scope.clone(),
            notification: notification.clone(),
        });
    }
}

/// Cloneable command half of the handle.
#[derive(Clone)]
pub struct RemoteCommander {
    cmd_tx: mpsc::Sender<RemoteCommand>,
    registry: Arc<ScopeRegistry>,
    next_ticket: Arc<AtomicU64>,
}

impl RemoteCommander {
    /// Reserves a correlation id. The caller records what the ticket means
    /// before issuing the command, so the completion can never outrun it.
    pub fn next_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::Relaxed)
    }

    pub fn fetch(&self, ticket: u64, table: impl Into<String>, query: RowQuery) {
        let _ = self.cmd_tx.send(RemoteCommand::Fetch {
            ticket,
            table: table.into(),
            query,
        });
    }

    pub fn write(
        &self,
        ticket: u64,
        table: impl Into<String>,
        record_id: impl Into<String>,
        delta: serde_json::Value,
    ) {
        let _ = self.cmd_tx.send(RemoteCommand::Write {
            ticket,
            table: table.into(),
            record_id: record_id.into(),
            delta,
        });
    }

    pub fn insert(&self, ticket: u64, table: impl Into<String>, row: serde_json::Value) {
        let _ = self.cmd_tx.send(RemoteCommand::Insert {
            ticket,
            table: table.into(),
            row,
        });
    }

    /// Registers a change-feed scope and lazily starts the feed itself on
    /// the first registration.
    pub fn subscribe(&self, scope: Scope) -> SubscriptionId {
        let id = self.registry.subscribe(scope);
        let _ = self.cmd_tx.send(RemoteCommand::EnsureFeed);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.unsubscribe(id);
    }
}

/// Owner of the worker thread running the backend calls. Commands go in
/// over a channel, results and notifications come back out as events.
pub struct RemoteHandle {
    commander: RemoteCommander,
    event_rx: mpsc::Receiver<RemoteEvent>,
}

impl RemoteHandle {
    pub fn new(settings: RemoteSettings, session: Option<&Session>) -> Result<Self, RemoteError> {
        let mut api = RestApi::new(settings.clone())?;
        if let Some(session) = session {
            api = api.with_session(session.access_token.clone());
        }
        let api: Arc<dyn Api> = Arc::new(api);
        let feed = ChangeFeed::new(settings);
        let registry = Arc::new(ScopeRegistry::new());

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker_registry = registry.clone();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut feed_running = false;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    RemoteCommand::EnsureFeed => {
                        if feed_running {
                            continue;
                        }
                        feed_running = true;
                        let feed = feed.clone();
                        let registry = worker_registry.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let sink = ChannelSink {
                                tx: event_tx.clone(),
                            };
                            let error = feed.run(&registry, &sink).await;
                            let _ = event_tx.send(RemoteEvent::FeedLost { error });
                        });
                    }
                    op => {
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_op(api.as_ref(), op, event_tx).await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            commander: RemoteCommander {
                cmd_tx,
                registry,
                next_ticket: Arc::new(AtomicU64::new(1)),
            },
            event_rx,
        })
    }

    pub fn commander(&self) -> RemoteCommander {
        self.commander.clone()
    }

    pub fn try_recv(&self) -> Option<RemoteEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn run_op(api: &dyn Api, command: RemoteCommand, event_tx: mpsc::Sender<RemoteEvent>) {
    match command {
        RemoteCommand::Fetch {
            ticket,
            table,
            query,
        } => {
            let result = api.fetch_rows(&table, &query).await;
            let _ = event_tx.send(RemoteEvent::FetchCompleted { ticket, result });
        }
        RemoteCommand::Write {
            ticket,
            table,
            record_id,
            delta,
        } => {
            let result = api.update_row(&table, &record_id, delta).await;
            let _ = event_tx.send(RemoteEvent::WriteCompleted { ticket, result });
        }
        RemoteCommand::Insert { ticket, table, row } => {
            let result = api.insert_row(&table, row).await;
            let _ = event_tx.send(RemoteEvent::InsertCompleted { ticket, result });
        }
        // Intercepted by the worker loop before ops are spawned.
        RemoteCommand::EnsureFeed => {}
    }
}
