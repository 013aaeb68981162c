//! Application layer - orchestration of the intake flow.
//!
//! - `ConversationEngine` - per-message state machine and field collection
//! - `EscalationPipeline` - hand-off of a case to the support chat
//! - `InboundDispatcher` - dedup, locking, and command routing per message
//! - `SessionLocks` - per-session mutual exclusion

mod best_effort;
mod dispatcher;
mod engine;
mod escalation;
mod session_lock;

pub use best_effort::{best_effort, with_deadline, DeadlineExceeded};
pub use dispatcher::{DispatchError, DispatchOutcome, DispatchTimeouts, InboundDispatcher};
pub use engine::{ConversationEngine, EngineError, EngineReply, EngineTimeouts, ESCALATION_MARKER};
pub use escalation::{EscalationError, EscalationPipeline, EscalationReport, EscalationTimeouts};
pub use session_lock::{SessionGuard, SessionLocks};
