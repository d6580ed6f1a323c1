use crate::coordinator::MutationToken;
use crate::record::{MessageDraft, TaskDelta};

/// Equality predicate narrowing a subscription to part of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeFilter {
    pub column: String,
    pub value: String,
}

/// Collection scope for a change-feed acquisition. Scopes are explicit
/// acquisitions: every `Subscribe` must be paired with an `Unsubscribe` on
/// view teardown, or the backend-side slot leaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionScope {
    pub table: String,
    pub filter: Option<ScopeFilter>,
}

impl SubscriptionScope {
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
            filter: Some(ScopeFilter {
                column: column.into(),
                value: value.into(),
            }),
        }
    }

    /// The board's global task scope.
    pub fn tasks() -> Self {
        Self::table("tasks")
    }

    /// Messages of one chat channel.
    pub fn messages(channel_id: &str) -> Self {
        Self::filtered("messages", "channel_id", channel_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchTasks { epoch: u64 },
    FetchChannels,
    FetchMessages { channel_id: String, epoch: u64 },
    FetchProfiles,
    FetchProjects,
    WriteTask {
        token: MutationToken,
        delta: TaskDelta,
    },
    SendMessage { draft: MessageDraft },
    Subscribe { scope: SubscriptionScope },
    Unsubscribe { scope: SubscriptionScope },
}
