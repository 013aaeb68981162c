//! Keyword triggers recognized in user text.

/// Case-insensitive keyword lists for control commands and suggestion
/// detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTriggers {
    escalation: Vec<String>,
    clear: Vec<String>,
    suggestion_prefixes: Vec<String>,
}

impl KeywordTriggers {
    pub fn new(escalation: Vec<String>, clear: Vec<String>, suggestion_prefixes: Vec<String>) -> Self {
        Self {
            escalation: lowercase(escalation),
            clear: lowercase(clear),
            suggestion_prefixes: lowercase(suggestion_prefixes),
        }
    }

    /// Text contains a force-escalate keyword.
    pub fn is_escalation(&self, text: &str) -> bool {
        contains_any(text, &self.escalation)
    }

    /// Text contains a clear-session keyword.
    pub fn is_clear(&self, text: &str) -> bool {
        contains_any(text, &self.clear)
    }

    /// Trimmed text starts with a suggestion prefix.
    pub fn is_suggestion(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        !lower.is_empty() && self.suggestion_prefixes.iter().any(|p| lower.starts_with(p.as_str()))
    }

    /// Keyword shown to users as the way to submit early.
    pub fn escalation_hint(&self) -> &str {
        self.escalation.first().map(String::as_str).unwrap_or("转人工")
    }
}

impl Default for KeywordTriggers {
    fn default() -> Self {
        Self::new(
            strings(&["转人工", "人工客服"]),
            strings(&["清除上下文", "重新开始"]),
            strings(&["建议", "意见", "反馈建议", "suggestion", "feedback"]),
        )
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn lowercase(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_matches_substring_case_insensitively() {
        let t = KeywordTriggers::new(vec!["Human".into()], vec![], vec![]);
        assert!(t.is_escalation("please get me a HUMAN"));
        assert!(!t.is_escalation("the app crashes"));
    }

    #[test]
    fn default_commands_match_inside_longer_text() {
        let t = KeywordTriggers::default();
        assert!(t.is_escalation("我要转人工"));
        assert!(t.is_clear("请清除上下文"));
    }

    #[test]
    fn default_commands_ignore_ordinary_issue_text() {
        let t = KeywordTriggers::default();
        for text in [
            "after I reset my password the app crashes",
            "screen is unclear after the update",
            "the user agent string is Mozilla/5.0",
            "a human-readable error appears",
        ] {
            assert!(!t.is_clear(text), "{text}");
            assert!(!t.is_escalation(text), "{text}");
        }
    }

    #[test]
    fn suggestion_requires_prefix() {
        let t = KeywordTriggers::default();
        assert!(t.is_suggestion("feedback: the button is broken"));
        assert!(t.is_suggestion("  Suggestion - add dark mode"));
        assert!(t.is_suggestion("建议增加夜间模式"));
        assert!(!t.is_suggestion("my feedback is that it crashes"));
        assert!(!t.is_suggestion("   "));
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let t = KeywordTriggers::new(vec!["".into(), " ".into()], vec![], vec![]);
        assert!(!t.is_escalation("anything"));
        assert_eq!(t.escalation_hint(), "转人工");
    }
}
