use serde::{Deserialize, Serialize};

/// Characters accepted by [`Check::ContainsSymbol`].
pub const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const DEFAULT_YEAR_TOKEN: &str = "2025";
pub const BANNED_WORD: &str = "password";
pub const LOCK_GLYPH: &str = "🔒";

/// A predicate over the candidate string. Every variant is total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Check {
    /// Length in unicode scalar values, not bytes.
    MinLength(usize),
    ContainsDigit,
    ContainsUppercase,
    ContainsLowercase,
    ContainsSymbol,
    Contains(String),
    /// Case-insensitive.
    Excludes(String),
}

impl Check {
    pub fn passes(&self, candidate: &str) -> bool {
        match self {
            Check::MinLength(n) => candidate.chars().count() >= *n,
            Check::ContainsDigit => candidate.chars().any(|c| c.is_ascii_digit()),
            Check::ContainsUppercase => candidate.chars().any(|c| c.is_ascii_uppercase()),
            Check::ContainsLowercase => candidate.chars().any(|c| c.is_ascii_lowercase()),
            Check::ContainsSymbol => candidate.chars().any(|c| SYMBOLS.contains(c)),
            Check::Contains(token) => candidate.contains(token.as_str()),
            Check::Excludes(word) => !candidate.to_lowercase().contains(&word.to_lowercase()),
        }
    }
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// 1-based sequence position.
    pub id: usize,
    pub description: String,
    pub check: Check,
    pub hint: String,
}

impl Rule {
    pub fn passes(&self, candidate: &str) -> bool {
        self.check.passes(candidate)
    }
}

/// Ordered, immutable list of rules. Ids always match positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Builds a rule set, numbering entries from 1 in the given order.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Check, String)>,
    {
        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (description, check, hint))| Rule {
                id: idx + 1,
                description,
                check,
                hint,
            })
            .collect();
        Self { rules }
    }

    /// The ten-rule fortress used by the password game.
    pub fn standard(year_token: &str) -> Self {
        let entry = |d: &str, c: Check, h: &str| (d.to_string(), c, h.to_string());
        Self::new([
            entry(
                "Your password must be at least 5 characters",
                Check::MinLength(5),
                "Try typing a few more letters or numbers!",
            ),
            entry(
                "Your password must include a number",
                Check::ContainsDigit,
                "Add a number like 1, 2, 3...",
            ),
            entry(
                "Your password must include an uppercase letter",
                Check::ContainsUppercase,
                "Add a capital letter like A, B, C...",
            ),
            entry(
                "Your password must include a special character",
                Check::ContainsSymbol,
                "Try adding ! or @ or # or $",
            ),
            entry(
                "Your password must be at least 8 characters",
                Check::MinLength(8),
                "Make your password longer!",
            ),
            entry(
                "Your password must include a lowercase letter",
                Check::ContainsLowercase,
                "Add a small letter like a, b, c...",
            ),
            entry(
                &format!("Your password must not contain the word '{BANNED_WORD}'"),
                Check::Excludes(BANNED_WORD.to_string()),
                &format!("Remove the word '{BANNED_WORD}' from your password!"),
            ),
            entry(
                &format!("Your password must include the current year ({year_token})"),
                Check::Contains(year_token.to_string()),
                &format!("Add {year_token} to your password!"),
            ),
            entry(
                "Your password must be at least 12 characters",
                Check::MinLength(12),
                "Your password needs to be even longer!",
            ),
            entry(
                &format!("Your password must include the lock emoji {LOCK_GLYPH}"),
                Check::Contains(LOCK_GLYPH.to_string()),
                &format!("Copy and paste this emoji: {LOCK_GLYPH}"),
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Rule> {
        id.checked_sub(1).and_then(|idx| self.rules.get(idx))
    }

    /// The first `count` rules.
    pub fn prefix(&self, count: usize) -> &[Rule] {
        &self.rules[..count.min(self.rules.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn all_pass(&self, candidate: &str) -> bool {
        self.rules.iter().all(|r| r.passes(candidate))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard(DEFAULT_YEAR_TOKEN)
    }
}
