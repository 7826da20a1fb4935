//! Intent detection: decides whether a message belongs in the report workflow.

/// Keywords that route a message to the report workflow by default.
pub const DEFAULT_KEYWORDS: [&str; 4] = ["report", "issue", "problem", "complaint"];

/// Strategy deciding whether a user message should skip the assistant and
/// go straight to the report workflow.
pub trait IntentDetector: Send + Sync {
    fn wants_report(&self, text: &str) -> bool;
}

/// Case-insensitive substring match against a keyword list.
///
/// Substring, not word match: "reporting" and "issues" both count.
#[derive(Clone, Debug)]
pub struct KeywordIntent {
    keywords: Vec<String>,
}

impl KeywordIntent {
    /// Build from a keyword list. Keywords are lowercased; blank ones are
    /// dropped since they would match every message.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordIntent {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

impl IntentDetector for KeywordIntent {
    fn wants_report(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}
