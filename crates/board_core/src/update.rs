use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::AppStarted { user_id } => state.start(user_id),
        Msg::TasksFetched { epoch, result } => state.apply_tasks_fetch(epoch, result),
        Msg::TasksChanged => state.tasks_changed(),
        Msg::TaskDragStarted { task_id } => {
            state.task_drag_started(task_id);
            Vec::new()
        }
        Msg::TaskDropped { status } => state.task_dropped(status),
        Msg::TaskWriteResolved { token, outcome } => {
            state.task_write_resolved(token, outcome);
            Vec::new()
        }
        Msg::ChannelsFetched { result } => state.channels_fetched(result),
        Msg::ChannelSelected { channel_id } => state.channel_selected(channel_id),
        Msg::MessagesFetched {
            channel_id,
            epoch,
            result,
        } => state.apply_messages_fetch(&channel_id, epoch, result),
        Msg::MessagesChanged { channel_id } => state.messages_changed(&channel_id),
        Msg::DraftChanged(text) => {
            state.draft_changed(text);
            Vec::new()
        }
        Msg::ReplySelected { message_id } => {
            state.reply_selected(message_id);
            Vec::new()
        }
        Msg::ReplyCleared => {
            state.reply_cleared();
            Vec::new()
        }
        Msg::MessageSubmitted => state.message_submitted(),
        Msg::MessageSendResolved { outcome } => {
            state.message_send_resolved(outcome);
            Vec::new()
        }
        Msg::ProfilesFetched { result } => {
            state.profiles_fetched(result);
            Vec::new()
        }
        Msg::ProjectsFetched { result } => {
            state.projects_fetched(result);
            Vec::new()
        }
        Msg::FeedLost => {
            state.feed_lost();
            Vec::new()
        }
        Msg::BoardClosed => state.board_closed(),
        Msg::ChatClosed => state.chat_closed(),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
