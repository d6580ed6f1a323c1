//! Executes core effects against the backend handle and pumps remote
//! events back into the message loop.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use board_core::{
    Channel, Effect, FetchFailed, FetchResult, Message, Msg, MutationToken, Profile, Project,
    SubscriptionScope, Task, WriteOutcome, MESSAGE_PAGE_SIZE,
};
use board_logging::{board_info, board_warn};
use board_remote::{
    RemoteCommander, RemoteError, RemoteEvent, RemoteHandle, RemoteSettings, RowQuery, Scope,
    Session, SortDir, SubscriptionId,
};
use serde::de::DeserializeOwned;

/// What an outstanding ticket resolves into.
enum PendingRequest {
    Tasks { epoch: u64 },
    Channels,
    Messages { channel_id: String, epoch: u64 },
    Profiles,
    Projects,
    TaskWrite { token: MutationToken },
    MessageSend,
}

type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

pub struct EffectRunner {
    commander: RemoteCommander,
    pending: PendingMap,
    subscriptions: Mutex<HashMap<SubscriptionScope, SubscriptionId>>,
}

impl EffectRunner {
    pub fn new(
        msg_tx: mpsc::Sender<Msg>,
        settings: RemoteSettings,
        session: Option<&Session>,
    ) -> Result<Self, RemoteError> {
        let handle = RemoteHandle::new(settings, session)?;
        let commander = handle.commander();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        spawn_event_pump(handle, msg_tx, pending.clone());
        Ok(Self {
            commander,
            pending,
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchTasks { epoch } => self.fetch(
                    PendingRequest::Tasks { epoch },
                    "tasks",
                    RowQuery::ordered("created_at", SortDir::Descending),
                ),
                Effect::FetchChannels => self.fetch(
                    PendingRequest::Channels,
                    "chat_channels",
                    RowQuery::ordered("created_at", SortDir::Descending),
                ),
                Effect::FetchMessages { channel_id, epoch } => {
                    let query = RowQuery::ordered("created_at", SortDir::Descending)
                        .eq("channel_id", channel_id.clone())
                        .limit(MESSAGE_PAGE_SIZE);
                    self.fetch(
                        PendingRequest::Messages { channel_id, epoch },
                        "messages",
                        query,
                    );
                }
                Effect::FetchProfiles => self.fetch(
                    PendingRequest::Profiles,
                    "profiles",
                    RowQuery::ordered("full_name", SortDir::Ascending),
                ),
                Effect::FetchProjects => self.fetch(
                    PendingRequest::Projects,
                    "projects",
                    RowQuery::ordered("created_at", SortDir::Descending),
                ),
                Effect::WriteTask { token, delta } => match serde_json::to_value(&delta) {
                    Ok(delta) => {
                        board_info!("WriteTask record_id={} delta={}", token.record_id(), delta);
                        let ticket = self.commander.next_ticket();
                        let record_id = token.record_id().to_string();
                        self.register(ticket, PendingRequest::TaskWrite { token });
                        self.commander.write(ticket, "tasks", record_id, delta);
                    }
                    Err(err) => board_warn!("Unserializable task delta: {}", err),
                },
                Effect::SendMessage { draft } => match serde_json::to_value(&draft) {
                    Ok(row) => {
                        board_info!(
                            "SendMessage channel_id={} content_len={}",
                            draft.channel_id,
                            draft.content.len()
                        );
                        let ticket = self.commander.next_ticket();
                        self.register(ticket, PendingRequest::MessageSend);
                        self.commander.insert(ticket, "messages", row);
                    }
                    Err(err) => board_warn!("Unserializable message draft: {}", err),
                },
                Effect::Subscribe { scope } => {
                    let id = self.commander.subscribe(map_scope(&scope));
                    board_info!("Subscribe table={} id={}", scope.table, id);
                    self.subscriptions
                        .lock()
                        .expect("lock subscriptions")
                        .insert(scope, id);
                }
                Effect::Unsubscribe { scope } => {
                    let id = self
                        .subscriptions
                        .lock()
                        .expect("lock subscriptions")
                        .remove(&scope);
                    if let Some(id) = id {
                        board_info!("Unsubscribe table={} id={}", scope.table, id);
                        self.commander.unsubscribe(id);
                    }
                }
            }
        }
    }

    fn fetch(&self, request: PendingRequest, table: &str, query: RowQuery) {
        let ticket = self.commander.next_ticket();
        self.register(ticket, request);
        self.commander.fetch(ticket, table, query);
    }

    fn register(&self, ticket: u64, request: PendingRequest) {
        self.pending
            .lock()
            .expect("lock pending requests")
            .insert(ticket, request);
    }
}

fn spawn_event_pump(handle: RemoteHandle, msg_tx: mpsc::Sender<Msg>, pending: PendingMap) {
    thread::spawn(move || loop {
        let Some(event) = handle.try_recv() else {
            thread::sleep(Duration::from_millis(20));
            continue;
        };
        let msg = match event {
            RemoteEvent::FetchCompleted { ticket, result } => {
                match take_pending(&pending, ticket) {
                    Some(PendingRequest::Tasks { epoch }) => Msg::TasksFetched {
                        epoch,
                        result: decode_collection::<Task>(result),
                    },
                    Some(PendingRequest::Channels) => Msg::ChannelsFetched {
                        result: decode_collection::<Channel>(result),
                    },
                    Some(PendingRequest::Messages { channel_id, epoch }) => {
                        // The page is fetched newest first; the view reads
                        // oldest first.
                        let result = decode_collection::<Message>(result).map(|mut messages| {
                            messages.reverse();
                            messages
                        });
                        Msg::MessagesFetched {
                            channel_id,
                            epoch,
                            result,
                        }
                    }
                    Some(PendingRequest::Profiles) => Msg::ProfilesFetched {
                        result: decode_collection::<Profile>(result),
                    },
                    Some(PendingRequest::Projects) => Msg::ProjectsFetched {
                        result: decode_collection::<Project>(result),
                    },
                    _ => {
                        board_warn!("Fetch completion for unknown ticket {}", ticket);
                        continue;
                    }
                }
            }
            RemoteEvent::WriteCompleted { ticket, result } => {
                match take_pending(&pending, ticket) {
                    Some(PendingRequest::TaskWrite { token }) => {
                        let outcome = match result {
                            Ok(_) => WriteOutcome::Confirmed,
                            Err(err) => {
                                board_warn!(
                                    "Task write rejected record_id={}: {}",
                                    token.record_id(),
                                    err
                                );
                                WriteOutcome::Rejected
                            }
                        };
                        Msg::TaskWriteResolved { token, outcome }
                    }
                    _ => {
                        board_warn!("Write completion for unknown ticket {}", ticket);
                        continue;
                    }
                }
            }
            RemoteEvent::InsertCompleted { ticket, result } => {
                match take_pending(&pending, ticket) {
                    Some(PendingRequest::MessageSend) => {
                        let outcome = match result {
                            Ok(_) => WriteOutcome::Confirmed,
                            Err(err) => {
                                board_warn!("Message send rejected: {}", err);
                                WriteOutcome::Rejected
                            }
                        };
                        Msg::MessageSendResolved { outcome }
                    }
                    _ => {
                        board_warn!("Insert completion for unknown ticket {}", ticket);
                        continue;
                    }
                }
            }
            RemoteEvent::Change { scope, .. } => match scope_msg(&scope) {
                Some(msg) => msg,
                None => continue,
            },
            RemoteEvent::FeedLost { error } => {
                board_warn!("Change feed lost: {}", error);
                Msg::FeedLost
            }
        };
        if msg_tx.send(msg).is_err() {
            break;
        }
    });
}

fn take_pending(pending: &PendingMap, ticket: u64) -> Option<PendingRequest> {
    pending
        .lock()
        .expect("lock pending requests")
        .remove(&ticket)
}

fn map_scope(scope: &SubscriptionScope) -> Scope {
    match &scope.filter {
        None => Scope::table(scope.table.clone()),
        Some(filter) => Scope::filtered(
            scope.table.clone(),
            filter.column.clone(),
            filter.value.clone(),
        ),
    }
}

fn scope_msg(scope: &Scope) -> Option<Msg> {
    match (scope.table.as_str(), &scope.filter) {
        ("tasks", None) => Some(Msg::TasksChanged),
        ("messages", Some((column, value))) if column == "channel_id" => {
            Some(Msg::MessagesChanged {
                channel_id: value.clone(),
            })
        }
        _ => None,
    }
}

fn decode_collection<T: DeserializeOwned>(
    result: Result<Vec<serde_json::Value>, RemoteError>,
) -> FetchResult<T> {
    let rows = match result {
        Ok(rows) => rows,
        Err(err) => {
            board_warn!("Fetch failed: {}", err);
            return Err(FetchFailed);
        }
    };
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|err| {
            board_warn!("Failed to decode rows: {}", err);
            FetchFailed
        })
}
