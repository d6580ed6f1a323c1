use crate::collection::CollectionView;
use crate::coordinator::{MutationLedger, MutationToken};
use crate::effect::{Effect, SubscriptionScope};
use crate::msg::{FetchResult, WriteOutcome};
use crate::record::{
    Channel, Message, MessageDraft, Profile, Project, Task, TaskDelta, TaskStatus,
};
use crate::resync::RefetchGate;
use crate::view_model::AppViewModel;

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct TaskBoardState {
    pub(crate) view: CollectionView<Task>,
    pub(crate) ledger: MutationLedger<Task>,
    pub(crate) gate: RefetchGate,
    pub(crate) loading: bool,
    pub(crate) drag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ChatState {
    pub(crate) channels: CollectionView<Channel>,
    pub(crate) active_channel: Option<String>,
    pub(crate) messages: CollectionView<Message>,
    pub(crate) gate: RefetchGate,
    pub(crate) loading: bool,
    pub(crate) draft: String,
    pub(crate) sending: bool,
    pub(crate) reply_to: Option<String>,
}

/// Whole-client state. Mutated only through `update`; the shell reads it
/// via `view()` and the `dirty` flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub(crate) user_id: Option<String>,
    pub(crate) board: TaskBoardState,
    pub(crate) chat: ChatState,
    pub(crate) profiles: CollectionView<Profile>,
    pub(crate) projects: CollectionView<Project>,
    pub(crate) feed_degraded: bool,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        crate::view_model::build(self)
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn start(&mut self, user_id: Option<String>) -> Vec<Effect> {
        self.user_id = user_id;
        self.board.loading = true;
        self.chat.loading = true;
        self.mark_dirty();

        let mut effects = Vec::with_capacity(5);
        effects.push(Effect::FetchProfiles);
        effects.push(Effect::FetchProjects);
        effects.push(Effect::FetchChannels);
        if self.board.gate.request() {
            effects.push(Effect::FetchTasks {
                epoch: self.board.gate.epoch(),
            });
        }
        effects.push(Effect::Subscribe {
            scope: SubscriptionScope::tasks(),
        });
        effects
    }

    pub(crate) fn apply_tasks_fetch(
        &mut self,
        epoch: u64,
        result: FetchResult<Task>,
    ) -> Vec<Effect> {
        if !self.board.gate.accepts(epoch) {
            // Late completion from a released scope; discard it.
            return Vec::new();
        }
        let follow_up = self.board.gate.settle();
        match result {
            Ok(tasks) => {
                self.board.view.replace_all(tasks);
                self.board.loading = false;
                self.mark_dirty();
            }
            Err(_) => {
                // Stale-but-consistent beats partially overwritten: keep
                // the previous view; the next notification retries.
                self.board.loading = false;
            }
        }
        if follow_up {
            vec![Effect::FetchTasks {
                epoch: self.board.gate.epoch(),
            }]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn tasks_changed(&mut self) -> Vec<Effect> {
        if self.board.gate.request() {
            vec![Effect::FetchTasks {
                epoch: self.board.gate.epoch(),
            }]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn task_drag_started(&mut self, task_id: String) {
        self.board.drag = Some(task_id);
    }

    pub(crate) fn task_dropped(&mut self, status: TaskStatus) -> Vec<Effect> {
        let Some(task_id) = self.board.drag.take() else {
            return Vec::new();
        };
        let delta = TaskDelta::status(status);
        match self
            .board
            .ledger
            .apply(&mut self.board.view, &task_id, &delta)
        {
            Some(token) => {
                self.mark_dirty();
                vec![Effect::WriteTask { token, delta }]
            }
            // Dropped onto its own column or the record vanished: no-op.
            None => Vec::new(),
        }
    }

    pub(crate) fn task_write_resolved(&mut self, token: MutationToken, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Confirmed => {
                self.board.ledger.resolve_success(&token);
            }
            WriteOutcome::Rejected => {
                if self.board.ledger.resolve_failure(&mut self.board.view, &token) {
                    self.mark_dirty();
                }
            }
        }
    }

    pub(crate) fn board_closed(&mut self) -> Vec<Effect> {
        self.board.gate.release();
        self.board.drag = None;
        vec![Effect::Unsubscribe {
            scope: SubscriptionScope::tasks(),
        }]
    }

    pub(crate) fn channels_fetched(&mut self, result: FetchResult<Channel>) -> Vec<Effect> {
        let Ok(channels) = result else {
            self.chat.loading = false;
            return Vec::new();
        };
        let first = channels.first().map(|channel| channel.id.clone());
        self.chat.channels.replace_all(channels);
        self.chat.loading = false;
        self.mark_dirty();
        match (self.chat.active_channel.is_none(), first) {
            (true, Some(channel_id)) => self.channel_selected(channel_id),
            _ => Vec::new(),
        }
    }

    pub(crate) fn channel_selected(&mut self, channel_id: String) -> Vec<Effect> {
        if self.chat.active_channel.as_deref() == Some(channel_id.as_str()) {
            return Vec::new();
        }
        if !self.chat.channels.contains(&channel_id) {
            return Vec::new();
        }

        let mut effects = Vec::with_capacity(3);
        if let Some(previous) = self.chat.active_channel.take() {
            effects.push(Effect::Unsubscribe {
                scope: SubscriptionScope::messages(&previous),
            });
        }

        self.chat.active_channel = Some(channel_id.clone());
        self.chat.messages.replace_all(Vec::new());
        self.chat.reply_to = None;
        self.chat.gate.rearm();
        if self.chat.gate.request() {
            effects.push(Effect::FetchMessages {
                channel_id: channel_id.clone(),
                epoch: self.chat.gate.epoch(),
            });
        }
        effects.push(Effect::Subscribe {
            scope: SubscriptionScope::messages(&channel_id),
        });
        self.mark_dirty();
        effects
    }

    pub(crate) fn apply_messages_fetch(
        &mut self,
        channel_id: &str,
        epoch: u64,
        result: FetchResult<Message>,
    ) -> Vec<Effect> {
        if self.chat.active_channel.as_deref() != Some(channel_id) {
            return Vec::new();
        }
        if !self.chat.gate.accepts(epoch) {
            return Vec::new();
        }
        let follow_up = self.chat.gate.settle();
        if let Ok(messages) = result {
            self.chat.messages.replace_all(messages);
            self.mark_dirty();
        }
        if follow_up {
            vec![Effect::FetchMessages {
                channel_id: channel_id.to_string(),
                epoch: self.chat.gate.epoch(),
            }]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn messages_changed(&mut self, channel_id: &str) -> Vec<Effect> {
        if self.chat.active_channel.as_deref() != Some(channel_id) {
            return Vec::new();
        }
        if self.chat.gate.request() {
            vec![Effect::FetchMessages {
                channel_id: channel_id.to_string(),
                epoch: self.chat.gate.epoch(),
            }]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn draft_changed(&mut self, text: String) {
        if self.chat.draft != text {
            self.chat.draft = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn reply_selected(&mut self, message_id: String) {
        if self.chat.messages.contains(&message_id) {
            self.chat.reply_to = Some(message_id);
            self.mark_dirty();
        }
    }

    pub(crate) fn reply_cleared(&mut self) {
        if self.chat.reply_to.take().is_some() {
            self.mark_dirty();
        }
    }

    pub(crate) fn message_submitted(&mut self) -> Vec<Effect> {
        let content = self.chat.draft.trim().to_string();
        if content.is_empty() || self.chat.sending {
            return Vec::new();
        }
        let (Some(channel_id), Some(sender_id)) =
            (self.chat.active_channel.clone(), self.user_id.clone())
        else {
            return Vec::new();
        };

        self.chat.sending = true;
        self.mark_dirty();
        vec![Effect::SendMessage {
            draft: MessageDraft::text(channel_id, sender_id, content, self.chat.reply_to.clone()),
        }]
    }

    pub(crate) fn message_send_resolved(&mut self, outcome: WriteOutcome) {
        self.chat.sending = false;
        if outcome == WriteOutcome::Confirmed {
            // The change-feed refetch delivers the stored row; locally we
            // only clear the composer.
            self.chat.draft.clear();
            self.chat.reply_to = None;
        }
        self.mark_dirty();
    }

    pub(crate) fn chat_closed(&mut self) -> Vec<Effect> {
        self.chat.gate.release();
        match self.chat.active_channel.take() {
            Some(channel_id) => {
                self.mark_dirty();
                vec![Effect::Unsubscribe {
                    scope: SubscriptionScope::messages(&channel_id),
                }]
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn profiles_fetched(&mut self, result: FetchResult<Profile>) {
        if let Ok(profiles) = result {
            self.profiles.replace_all(profiles);
            self.mark_dirty();
        }
    }

    pub(crate) fn projects_fetched(&mut self, result: FetchResult<Project>) {
        if let Ok(projects) = result {
            self.projects.replace_all(projects);
            self.mark_dirty();
        }
    }

    pub(crate) fn feed_lost(&mut self) {
        if !self.feed_degraded {
            self.feed_degraded = true;
            self.mark_dirty();
        }
    }
}
