use chrono::{DateTime, Utc};

use crate::record::{ChannelKind, ProjectStatus, Role, TaskPriority, TaskStatus};
use crate::state::AppState;

/// Page size for the message window: the newest rows are fetched and shown
/// oldest first.
pub const MESSAGE_PAGE_SIZE: usize = 50;

/// Column order of the task board.
pub(crate) const BOARD_COLUMNS: [TaskStatus; 4] = [
    TaskStatus::Todo,
    TaskStatus::InProgress,
    TaskStatus::Review,
    TaskStatus::Completed,
];

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub board: BoardViewModel,
    pub chat: ChatViewModel,
    pub directory: Vec<ProfileCardView>,
    pub projects: Vec<ProjectCardView>,
    pub dashboard: DashboardView,
    pub feed_degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoardViewModel {
    pub loading: bool,
    /// Optimistic edits still awaiting backend confirmation.
    pub pending_writes: usize,
    pub columns: Vec<BoardColumnView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumnView {
    pub status: TaskStatus,
    pub title: &'static str,
    pub tasks: Vec<TaskCardView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCardView {
    pub task_id: String,
    pub title: String,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatViewModel {
    pub loading: bool,
    pub channels: Vec<ChannelRowView>,
    pub active_channel: Option<String>,
    pub messages: Vec<MessageRowView>,
    pub draft: String,
    pub sending: bool,
    pub reply_to: Option<ReplyPreview>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRowView {
    pub channel_id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRowView {
    pub message_id: String,
    pub sender_id: String,
    pub content: String,
    pub reply_to: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPreview {
    pub message_id: String,
    pub sender_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCardView {
    pub profile_id: String,
    pub full_name: String,
    pub role: Role,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCardView {
    pub project_id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub progress: i32,
}

/// Headline counts derived from the collections already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardView {
    pub tasks_total: usize,
    pub tasks_in_progress: usize,
    pub tasks_completed: usize,
    pub active_projects: usize,
    pub team_size: usize,
}

fn column_title(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "To Do",
        TaskStatus::InProgress => "In Progress",
        TaskStatus::Review => "Review",
        TaskStatus::Completed => "Completed",
    }
}

pub(crate) fn build(state: &AppState) -> AppViewModel {
    let tasks = state.board.view.records();
    let columns = BOARD_COLUMNS
        .iter()
        .map(|&status| BoardColumnView {
            status,
            title: column_title(status),
            tasks: tasks
                .iter()
                .filter(|task| task.status == status)
                .map(|task| TaskCardView {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    priority: task.priority,
                    assigned_to: task.assigned_to.clone(),
                    due_date: task.due_date,
                })
                .collect(),
        })
        .collect();

    let reply_to = state.chat.reply_to.as_deref().and_then(|message_id| {
        state
            .chat
            .messages
            .get(message_id)
            .map(|message| ReplyPreview {
                message_id: message.id.clone(),
                sender_id: message.sender_id.clone(),
                content: message.content.clone(),
            })
    });

    let chat = ChatViewModel {
        loading: state.chat.loading,
        channels: state
            .chat
            .channels
            .records()
            .iter()
            .map(|channel| ChannelRowView {
                channel_id: channel.id.clone(),
                name: channel.name.clone(),
                kind: channel.kind,
                description: channel.description.clone(),
            })
            .collect(),
        active_channel: state.chat.active_channel.clone(),
        messages: state
            .chat
            .messages
            .records()
            .iter()
            .map(|message| MessageRowView {
                message_id: message.id.clone(),
                sender_id: message.sender_id.clone(),
                content: message.content.clone(),
                reply_to: message.reply_to.clone(),
                sent_at: message.created_at,
            })
            .collect(),
        draft: state.chat.draft.clone(),
        sending: state.chat.sending,
        reply_to,
    };

    let dashboard = DashboardView {
        tasks_total: tasks.len(),
        tasks_in_progress: tasks
            .iter()
            .filter(|task| task.status == TaskStatus::InProgress)
            .count(),
        tasks_completed: tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .count(),
        active_projects: state
            .projects
            .records()
            .iter()
            .filter(|project| project.status == ProjectStatus::Active)
            .count(),
        team_size: state.profiles.len(),
    };

    AppViewModel {
        board: BoardViewModel {
            loading: state.board.loading,
            pending_writes: state.board.ledger.outstanding(),
            columns,
        },
        chat,
        directory: state
            .profiles
            .records()
            .iter()
            .map(|profile| ProfileCardView {
                profile_id: profile.id.clone(),
                full_name: profile.full_name.clone(),
                role: profile.role,
                department: profile.department.clone(),
            })
            .collect(),
        projects: state
            .projects
            .records()
            .iter()
            .map(|project| ProjectCardView {
                project_id: project.id.clone(),
                name: project.name.clone(),
                status: project.status,
                progress: project.progress,
            })
            .collect(),
        dashboard,
        feed_degraded: state.feed_degraded,
    }
}
