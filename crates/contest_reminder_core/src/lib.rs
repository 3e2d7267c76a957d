pub mod dispatch;
pub mod domain;
pub mod ports;
pub mod schedule;

pub use dispatch::DispatchEngine;
pub use domain::{
    AuthParams, Contest, ContestPhase, DispatchOutcome, ReminderPreview, ReminderSpec,
    Subscription, SubscriptionDraft, User,
};
pub use ports::{
    ContestDirectory, DeliveryLedger, PortError, PortResult, ReminderNotifier, SubscriptionStore,
};
pub use schedule::{format_local_times, is_due, reminder_schedule};
