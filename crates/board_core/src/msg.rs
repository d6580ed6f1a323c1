use crate::coordinator::MutationToken;
use crate::record::{Channel, Message, Profile, Project, Task, TaskStatus};

/// Outcome summary of a backend write. The shell logs the remote error
/// before mapping it, so the core only needs the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Confirmed,
    Rejected,
}

/// Marker for a failed authoritative fetch; details stay in the shell's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchFailed;

pub type FetchResult<T> = Result<Vec<T>, FetchFailed>;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Session established; load the initial collections and subscribe.
    AppStarted { user_id: Option<String> },
    /// Authoritative task fetch settled.
    TasksFetched { epoch: u64, result: FetchResult<Task> },
    /// Change-feed notification for the tasks table.
    TasksChanged,
    /// User started dragging a task card.
    TaskDragStarted { task_id: String },
    /// User dropped the dragged card on a status column.
    TaskDropped { status: TaskStatus },
    /// Backend write for an optimistic task edit settled.
    TaskWriteResolved {
        token: MutationToken,
        outcome: WriteOutcome,
    },
    /// Channel list fetch settled.
    ChannelsFetched { result: FetchResult<Channel> },
    /// User selected a chat channel.
    ChannelSelected { channel_id: String },
    /// Authoritative message fetch for a channel settled.
    MessagesFetched {
        channel_id: String,
        epoch: u64,
        result: FetchResult<Message>,
    },
    /// Change-feed notification for the message scope.
    MessagesChanged { channel_id: String },
    /// User edited the message input box.
    DraftChanged(String),
    /// User picked a message to reply to.
    ReplySelected { message_id: String },
    /// User dismissed the reply preview.
    ReplyCleared,
    /// User submitted the current draft.
    MessageSubmitted,
    /// Backend insert for a submitted message settled.
    MessageSendResolved { outcome: WriteOutcome },
    /// Team directory fetch settled.
    ProfilesFetched { result: FetchResult<Profile> },
    /// Project list fetch settled.
    ProjectsFetched { result: FetchResult<Project> },
    /// The change feed dropped; realtime delivery is degraded until the
    /// backend client reconnects.
    FeedLost,
    /// Board view unmounted; release the tasks scope.
    BoardClosed,
    /// Chat view unmounted; release the message scope.
    ChatClosed,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
