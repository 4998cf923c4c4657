mod cache;
mod controller;
mod events;
mod scheduler;
mod subscription;

pub use cache::{DisplayCache, DisplayEntry};
pub use controller::{DropEvent, FixedView};
pub use events::ViewEvent;
pub use scheduler::{SchedulerState, UpdateScheduler};
pub use subscription::{Subscription, SubscriptionManager};

pub(crate) use events::InboxListener;
