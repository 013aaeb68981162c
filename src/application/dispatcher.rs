//! Inbound dispatcher - the per-message entry point.
//!
//! Order of work for every inbound message:
//! claim the message id, filter by channel, take the session lock, then
//! either handle a command keyword or run the engine. The lock is held
//! until any triggered hand-off finishes.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::intake::{render, InboundMessage, KeywordTriggers, MessageKind, Session};
use crate::ports::{ChatPlatform, MessageDeduper, SessionStore, StoreError};

use super::best_effort::{best_effort, with_deadline};
use super::engine::{ConversationEngine, EngineError};
use super::escalation::{EscalationError, EscalationPipeline, EscalationReport};
use super::session_lock::SessionLocks;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Already claimed by an earlier delivery.
    Duplicate,
    /// The claim could not be checked; dropped.
    DedupUnavailable,
    /// Not a private chat.
    IgnoredChannel,
    /// Session deleted on request.
    Cleared,
    /// Hand-off requested but there was no session.
    NothingToEscalate,
    /// The case was handed off.
    Escalated(EscalationReport),
    /// A normal reply was sent.
    Replied,
    /// Nothing needed to be sent.
    NoReply,
}

/// Failures that reached the user as a fallback reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Deadlines for the dispatcher's own calls.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTimeouts {
    pub store: Duration,
    pub platform: Duration,
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            platform: Duration::from_secs(5),
        }
    }
}

pub struct InboundDispatcher {
    deduper: Arc<dyn MessageDeduper>,
    locks: Arc<SessionLocks>,
    store: Arc<dyn SessionStore>,
    engine: Arc<ConversationEngine>,
    pipeline: Arc<EscalationPipeline>,
    platform: Arc<dyn ChatPlatform>,
    triggers: Arc<KeywordTriggers>,
    timeouts: DispatchTimeouts,
}

impl InboundDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        deduper: Arc<dyn MessageDeduper>,
        locks: Arc<SessionLocks>,
        store: Arc<dyn SessionStore>,
        engine: Arc<ConversationEngine>,
        pipeline: Arc<EscalationPipeline>,
        platform: Arc<dyn ChatPlatform>,
        triggers: Arc<KeywordTriggers>,
    ) -> Self {
        Self {
            deduper,
            locks,
            store,
            engine,
            pipeline,
            platform,
            triggers,
            timeouts: DispatchTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: DispatchTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Handles one inbound message end to end.
    ///
    /// Errors are returned after the user has been sent a fallback reply.
    #[tracing::instrument(
        skip_all,
        fields(session_key = %message.session_key, message_id = %message.message_id)
    )]
    pub async fn handle(&self, message: InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        match with_deadline("dedup_claim", self.timeouts.store, self.deduper.claim(&message.message_id)).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("duplicate delivery dropped");
                return Ok(DispatchOutcome::Duplicate);
            }
            Err(e) => {
                tracing::error!(error = %e, "dedup check failed, dropping message");
                return Ok(DispatchOutcome::DedupUnavailable);
            }
        }

        if !message.channel.is_private() {
            tracing::debug!(channel = ?message.channel, "ignoring non-private chat");
            return Ok(DispatchOutcome::IgnoredChannel);
        }

        let _guard = self.locks.acquire(&message.session_key).await;

        if message.kind == MessageKind::Text {
            if self.triggers.is_clear(&message.text) {
                return self.clear(&message).await;
            }
            if self.triggers.is_escalation(&message.text) {
                return self.force_escalate(&message).await;
            }
        }

        self.converse(&message).await
    }

    async fn clear(&self, message: &InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        tracing::info!("clearing session on request");
        match with_deadline("session_clear", self.timeouts.store, self.store.clear(&message.session_key)).await {
            Ok(()) => {
                self.send(message, render::CLEARED).await;
                Ok(DispatchOutcome::Cleared)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to clear session");
                self.send(message, render::CLEAR_FAILED).await;
                Err(e.into())
            }
        }
    }

    async fn force_escalate(&self, message: &InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        tracing::info!(user_id = %message.sender, "user requested hand-off");
        let session = match with_deadline("session_get", self.timeouts.store, self.store.get(&message.session_key)).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.send(message, render::NOTHING_TO_ESCALATE).await;
                return Ok(DispatchOutcome::NothingToEscalate);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load session for hand-off");
                self.send(message, render::SESSION_LOOKUP_FAILED).await;
                return Err(e.into());
            }
        };
        self.escalate(message, &session).await
    }

    async fn converse(&self, message: &InboundMessage) -> Result<DispatchOutcome, DispatchError> {
        let result = async {
            let mut session = with_deadline(
                "session_get",
                self.timeouts.store,
                self.store
                    .get_or_create(&message.session_key, &message.sender, message.sender_name.as_deref()),
            )
            .await?;
            let reply = self.engine.process(&mut session, &message.to_engine_input()).await?;
            Ok::<_, EngineError>((session, reply))
        }
        .await;

        let (session, reply) = match result {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(error = %e, "failed to process message");
                best_effort(
                    "reply_text",
                    self.timeouts.platform,
                    self.platform.reply_text(&message.message_id, render::GENERIC_FAILURE),
                )
                .await;
                return Err(e.into());
            }
        };

        if let Some(text) = reply.escalation_text() {
            if !text.is_empty() {
                self.send(message, text).await;
            }
            return self.escalate(message, &session).await;
        }

        if reply.is_empty() {
            return Ok(DispatchOutcome::NoReply);
        }
        self.send(message, reply.text()).await;
        Ok(DispatchOutcome::Replied)
    }

    async fn escalate(
        &self,
        message: &InboundMessage,
        session: &Session,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.pipeline.run(session).await {
            Ok(report) => Ok(DispatchOutcome::Escalated(report)),
            Err(e) => {
                if !e.case_posted() {
                    self.send(message, render::ESCALATION_FAILED).await;
                }
                Err(e.into())
            }
        }
    }

    async fn send(&self, message: &InboundMessage, text: &str) {
        best_effort(
            "send_text",
            self.timeouts.platform,
            self.platform.send_text(&message.session_key, text),
        )
        .await;
    }
}
