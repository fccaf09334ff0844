use std::sync::Arc;

use crate::coordinator::CallEventCoordinator;
use crate::engine::ConversationEngine;

/// Shared handles the webhook handlers work against.  Both components hold
/// the same conversation store underneath; the coordinator owns the
/// pending-call tracker outright.
pub struct AppState {
    pub coordinator: Arc<CallEventCoordinator>,
    pub engine: Arc<ConversationEngine>,
}
