pub mod store;
pub mod sort;
pub mod notifier;
pub mod poller;
pub mod moderation;

pub use store::TokenStore;
pub use sort::{sorted_rows, SortDirection, SortKey, SortSpec};
pub use notifier::{
    BroadcastSink, LogSink, NotificationGate, NotificationSink, PageVisibility,
    PermissionProvider, StaticPermission, VisibilityProbe,
};
pub use poller::{FetchOutcome, Poller};
pub use moderation::{ModerationClient, ModerationError, RawTokenId};
