//! Affirmative reply detection for inbound messages.

/// Phrases accepted as "yes" when no list is configured.
pub const DEFAULT_AFFIRMATIVE_REPLIES: &[&str] = &[
    "yes",
    "y",
    "yep",
    "yeah",
    "yes please",
    "ok",
    "okay",
    "sure",
    "accept",
    "book",
    "book it",
];

/// Shortest phrase for which a one-character typo is still accepted.
const FUZZY_MIN_LEN: usize = 3;

/// Decides whether free-form reply text is an acceptance.
///
/// A reply is affirmative when, after lowercasing and stripping punctuation,
/// it equals a configured phrase or is one edit (including a transposition)
/// away from a phrase of three or more characters ("yse", "yess").
#[derive(Debug, Clone)]
pub struct ReplyMatcher {
    phrases: Vec<String>,
}

impl ReplyMatcher {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| normalize(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_affirmative(&self, text: &str) -> bool {
        let reply = normalize(text);
        if reply.is_empty() {
            return false;
        }
        self.phrases.iter().any(|phrase| {
            *phrase == reply
                || (phrase.chars().count() >= FUZZY_MIN_LEN
                    && strsim::damerau_levenshtein(phrase, &reply) <= 1)
        })
    }
}

impl Default for ReplyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_AFFIRMATIVE_REPLIES)
    }
}

/// Lowercases, drops everything but letters, digits and spaces, and
/// collapses whitespace.
fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
