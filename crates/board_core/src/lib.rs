//! StudioBoard core: pure synchronization state machine and view-model helpers.
mod collection;
mod coordinator;
mod effect;
mod msg;
mod record;
mod resync;
mod state;
mod update;
mod view_model;

pub use collection::{CollectionView, Keyed};
pub use coordinator::{MutationLedger, MutationToken};
pub use effect::{Effect, ScopeFilter, SubscriptionScope};
pub use msg::{FetchFailed, FetchResult, Msg, WriteOutcome};
pub use record::{
    Channel, ChannelKind, Delta, Message, MessageDraft, Profile, Project, ProjectStatus, Role,
    Task, TaskDelta, TaskPriority, TaskStatus,
};
pub use resync::RefetchGate;
pub use state::AppState;
pub use update::update;
pub use view_model::{
    AppViewModel, BoardColumnView, BoardViewModel, ChannelRowView, ChatViewModel, DashboardView,
    MessageRowView, ProfileCardView, ProjectCardView, ReplyPreview, TaskCardView,
    MESSAGE_PAGE_SIZE,
};
