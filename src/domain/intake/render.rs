//! User-facing and hand-off texts.

use std::fmt::Write;

use super::merge::FieldChange;
use super::mode::SessionMode;
use super::schema::{FieldDescriptor, FieldSchema};
use super::session::Session;

pub const GENERIC_FAILURE: &str = "抱歉，处理您的消息时出错了，请稍后重试。";
pub const SESSION_LOOKUP_FAILED: &str = "抱歉，获取会话信息失败，请稍后重试。";
pub const NOTHING_TO_ESCALATE: &str = "请先描述您的问题，我会帮您收集必要信息。";
pub const ESCALATION_FAILED: &str = "提交失败，请稍后重试。";
pub const CLEAR_FAILED: &str = "抱歉，清除上下文时出错了。";
pub const CLEARED: &str = "上下文已清除，请重新开始描述您的问题。";

/// First-turn greeting listing every field the intake needs.
pub fn welcome(schema: &FieldSchema) -> String {
    let mut out = String::from("您好，我是技术支持助手。\n\n为了帮您处理问题，请提供以下信息：\n");
    push_list(&mut out, schema.required());

    let optional: Vec<_> = schema.optional().collect();
    if !optional.is_empty() {
        out.push_str("\n以下信息可选填写：\n");
        push_list(&mut out, optional.into_iter());
    }

    out.push_str("\n您可以一次性告诉我，也可以分多次发送。\n如有日志文件，可直接发送附件。");
    out
}

/// Reply for an incomplete session after a text turn.
pub fn progress(changes: &[FieldChange], missing: &[&FieldDescriptor], hint_keyword: &str) -> String {
    let mut out = String::new();

    if !changes.is_empty() {
        let notes: Vec<_> = changes.iter().map(FieldChange::note).collect();
        let _ = write!(out, "已记录：{}\n\n", notes.join("、"));
    }

    if !missing.is_empty() {
        if changes.is_empty() {
            out.push_str("请继续提供以下信息：\n");
        } else {
            out.push_str("还需要以下信息：\n");
        }
        push_list(&mut out, missing.iter().copied());
        push_hint(&mut out, hint_keyword);
    }

    out
}

/// Reply for an incomplete session after a file or other non-text turn.
pub fn file_received(missing: &[&FieldDescriptor], hint_keyword: &str) -> String {
    let mut out = String::from("收到文件，已记录。\n\n还需要以下信息：\n");
    push_list(&mut out, missing.iter().copied());
    push_hint(&mut out, hint_keyword);
    out
}

/// Reply announcing that the case is complete and being handed off.
pub fn completion(session: &Session, schema: &FieldSchema) -> String {
    format!(
        "信息收集完毕！\n\n{}\n正在为您提交到技术支持团队...",
        user_summary(session, schema)
    )
}

/// Reply acknowledging a suggestion before it is handed off.
pub fn suggestion_ack(session: &Session, schema: &FieldSchema) -> String {
    format!(
        "感谢您的建议！/ Thanks for your suggestion!\n\n{}\n正在为您提交到产品团队...",
        user_summary(session, schema)
    )
}

/// Filled fields with display labels, as shown to the user.
pub fn user_summary(session: &Session, schema: &FieldSchema) -> String {
    let mut out = String::new();

    if session.mode() == SessionMode::Suggestion {
        let _ = writeln!(
            out,
            "- 建议内容 / Suggestion: {}",
            session.suggestion_text().unwrap_or_default()
        );
    } else {
        for (field, value) in filled(session, schema) {
            let _ = writeln!(out, "- {}: {}", field.label, value);
        }
    }

    if session.has_files() {
        out.push_str("- 日志文件 / Log files: 已上传 / Uploaded\n");
    }
    out
}

/// Title of the hand-off post.
pub fn handoff_title(mode: SessionMode) -> &'static str {
    match mode {
        SessionMode::Suggestion => "用户建议反馈 / User Suggestion",
        _ => "用户问题反馈 / User Issue Report",
    }
}

/// Body of the hand-off post, in `【label】value` form.
pub fn handoff_summary(session: &Session, schema: &FieldSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "【提交时间】{}", session.updated_at().to_display_string());

    if session.mode() == SessionMode::Suggestion {
        out.push_str("【类型】建议反馈\n\n");
        let _ = writeln!(out, "【内容】{}", session.suggestion_text().unwrap_or_default());
    } else {
        out.push_str("【类型】问题反馈\n\n");
        for (field, value) in filled(session, schema) {
            let _ = writeln!(out, "【{}】{}", field.short_label(), value);
        }
    }

    if session.has_files() {
        out.push_str("\n【日志文件】已上传（见话题内附件）\n");
    }
    out
}

/// Notice sent to the user once the case has been posted.
pub fn submitted_notice(invited: bool) -> String {
    let mut out = String::from(
        "✅ 您的问题已提交给技术支持团队，我们会尽快处理！\nYour issue has been submitted to the support team. We'll handle it ASAP!",
    );
    if invited {
        out.push_str(
            "\n\n您已被邀请到技术支持群，可以在群里直接跟进问题。\nYou've been invited to the support group where you can follow up directly.",
        );
    }
    out
}

fn filled<'a>(
    session: &'a Session,
    schema: &'a FieldSchema,
) -> impl Iterator<Item = (&'a FieldDescriptor, &'a str)> {
    schema
        .display_order()
        .filter_map(|f| session.collected().get(&f.key).map(|v| (f, v)))
}

fn push_list<'a>(out: &mut String, fields: impl Iterator<Item = &'a FieldDescriptor>) {
    for field in fields {
        let _ = writeln!(out, "- {}", field.label);
    }
}

fn push_hint(out: &mut String, keyword: &str) {
    let _ = write!(out, "\n回复「{keyword}」可直接提交当前信息。");
}
