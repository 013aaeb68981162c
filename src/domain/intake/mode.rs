//! Session mode state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// What kind of intake a session is running.
///
/// A session starts `Unspecified` and is classified exactly once, on its
/// first meaningful message. Both classified modes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Unspecified,
    /// Collecting the full field schema over several turns.
    IssueReport,
    /// A single free-text submission, escalated immediately.
    Suggestion,
}

/// How the engine classified one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    /// Text starting with a recognized suggestion prefix.
    SuggestionText,
    /// Any other non-empty text.
    OtherText,
    /// File, image, audio, video, sticker, or another non-text kind.
    NonText,
}

impl SessionMode {
    /// The mode a session is in after receiving input of the given class.
    pub fn next(self, input: InputClass) -> SessionMode {
        match (self, input) {
            (SessionMode::Unspecified, InputClass::SuggestionText) => SessionMode::Suggestion,
            (SessionMode::Unspecified, _) => SessionMode::IssueReport,
            (mode, _) => mode,
        }
    }
}

impl StateMachine for SessionMode {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (SessionMode::Unspecified, SessionMode::IssueReport)
                | (SessionMode::Unspecified, SessionMode::Suggestion)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            SessionMode::Unspecified => vec![SessionMode::IssueReport, SessionMode::Suggestion],
            SessionMode::IssueReport | SessionMode::Suggestion => vec![],
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionMode::Unspecified => "unspecified",
            SessionMode::IssueReport => "issue_report",
            SessionMode::Suggestion => "suggestion",
        };
        f.write_str(s)
    }
}
