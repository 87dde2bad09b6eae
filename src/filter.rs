use crate::config::Lookup;

/// Reply sent instead of an answer when the message contains abusive language
pub const ABUSE_MESSAGE: &str = "I’m here to help with MFI Business Document queries. \
I can’t continue when there’s abusive language—please rephrase your question respectfully.";

const DEFAULT_ABUSIVE_WORDS: [&str; 10] = [
    "idiot", "stupid", "nonsense", "fool", "shit", "fuck", "bastard", "moron", "asshole",
    "chutiya",
];

/// Static denylist checked before any retrieval happens
#[derive(Debug, Clone, PartialEq)]
pub struct AbuseFilter {
    /// Lowercase terms
    words: Vec<String>,
}

impl Default for AbuseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ABUSIVE_WORDS)
    }
}

impl AbuseFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        AbuseFilter { words }
    }

    /// `ABUSIVE_WORDS` is a comma separated list replacing the built-in one
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        match lookup("ABUSIVE_WORDS") {
            Some(list) => Self::new(list.split(',')),
            None => Self::default(),
        }
    }

    /// Case-insensitive substring match against the denylist
    pub fn is_abusive(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.words.iter().any(|word| message.contains(word.as_str()))
    }
}
