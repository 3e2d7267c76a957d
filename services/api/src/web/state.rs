//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use contest_reminder_core::dispatch::DispatchEngine;
use contest_reminder_core::ports::{ContestDirectory, SubscriptionStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub contests: Arc<dyn ContestDirectory>,
    pub store: Arc<dyn SubscriptionStore>,
    pub engine: DispatchEngine,
    pub config: Arc<Config>,
}
