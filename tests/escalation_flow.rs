//! Integration tests for the hand-off path.
//!
//! Flow under test:
//! 1. User sends attachments, then the escalate keyword
//! 2. Summary is posted to the support chat
//! 3. Each file is relayed into the post's thread, failures skipped
//! 4. User is notified and the session is cleared

mod common;

use std::sync::Arc;

use common::{file, text, TestAppBuilder, SUPPORT_CHAT, USER_CHAT};
use intake_relay::adapters::extractor::MockFieldExtractor;
use intake_relay::adapters::memory::{PlatformCall, RecordingChatPlatform};
use intake_relay::application::{DispatchError, DispatchOutcome};
use intake_relay::domain::foundation::SessionKey;
use intake_relay::domain::intake::{render, ExtractedFields};
use intake_relay::ports::SessionStore;

// =============================================================================
// File relay
// =============================================================================

#[tokio::test]
async fn failed_download_skips_only_that_file() {
    let platform = RecordingChatPlatform::new()
        .failing_download("file_bad")
        .with_file("file_good", b"log line".to_vec(), Some("b.log"));
    let app = TestAppBuilder::new().platform(platform).build();

    app.dispatcher.handle(file(USER_CHAT, "om_1", "file_bad", "a.log")).await.unwrap();
    app.dispatcher.handle(file(USER_CHAT, "om_2", "file_good", "b.log")).await.unwrap();
    let outcome = app.dispatcher.handle(text(USER_CHAT, "om_3", "转人工")).await.unwrap();

    let DispatchOutcome::Escalated(report) = outcome else {
        panic!("expected hand-off, got {outcome:?}");
    };
    assert_eq!(report.files_relayed, 1);
    assert_eq!(report.files_failed, 1);
    assert!(report.user_notified);

    let relayed = app.platform.thread_files();
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].0, report.thread_root);
    assert_eq!(relayed[0].1, "b.log");

    let (post, _) = &app.platform.posts()[0];
    assert!(post.body.contains("【日志文件】"));
    assert!(app.store.get(&SessionKey::new(USER_CHAT)).await.unwrap().is_none());
}

#[tokio::test]
async fn summary_goes_to_support_chat_and_user_is_invited() {
    let app = TestAppBuilder::new().build();

    app.dispatcher.handle(text(USER_CHAT, "om_1", "hello")).await.unwrap();
    app.dispatcher.handle(text(USER_CHAT, "om_2", "转人工")).await.unwrap();

    let calls = app.platform.calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        PlatformCall::Invite { chat, user } if chat.as_str() == SUPPORT_CHAT && user.as_str() == "ou_1"
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        PlatformCall::PostSummary { chat, .. } if chat.as_str() == SUPPORT_CHAT
    )));

    let (_, notice) = app.platform.sent_texts().pop().unwrap();
    assert_eq!(notice, render::submitted_notice(true));
}

#[tokio::test]
async fn already_member_still_gets_the_case_posted() {
    let platform = RecordingChatPlatform::new().failing_invite();
    let app = TestAppBuilder::new().platform(platform).build();

    app.dispatcher.handle(text(USER_CHAT, "om_1", "hello")).await.unwrap();
    let outcome = app.dispatcher.handle(text(USER_CHAT, "om_2", "转人工")).await.unwrap();

    let DispatchOutcome::Escalated(report) = outcome else {
        panic!("expected hand-off, got {outcome:?}");
    };
    assert!(!report.invited);
    assert_eq!(app.platform.posts().len(), 1);
    let (_, notice) = app.platform.sent_texts().pop().unwrap();
    assert_eq!(notice, render::submitted_notice(false));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn failed_post_keeps_session_for_retry() {
    let extractor = MockFieldExtractor::new().with_result(ExtractedFields::new().with("a", "v1"));
    let platform = RecordingChatPlatform::new().failing_post();
    let app = TestAppBuilder::new()
        .extractor(Arc::new(extractor))
        .platform(platform)
        .build();

    app.dispatcher.handle(text(USER_CHAT, "om_1", "alpha is v1")).await.unwrap();
    let result = app.dispatcher.handle(text(USER_CHAT, "om_2", "转人工")).await;

    assert!(matches!(result, Err(DispatchError::Escalation(_))));
    let session = app.store.get(&SessionKey::new(USER_CHAT)).await.unwrap().unwrap();
    assert_eq!(session.collected().get("a"), Some("v1"));
    let (_, notice) = app.platform.sent_texts().pop().unwrap();
    assert_eq!(notice, render::ESCALATION_FAILED);
}

#[tokio::test]
async fn escalate_keyword_without_session_asks_for_details() {
    let app = TestAppBuilder::new().build();

    let outcome = app.dispatcher.handle(text(USER_CHAT, "om_1", "转人工")).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::NothingToEscalate);
    assert!(app.platform.posts().is_empty());
    let (_, reply) = app.platform.sent_texts().pop().unwrap();
    assert_eq!(reply, render::NOTHING_TO_ESCALATE);
}
