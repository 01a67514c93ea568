//! Rewrite pattern tables.
//!
//! A table is an ordered list of `(phrase regex, replacement, description)`
//! entries. Entries are applied in order, each across the whole text.

use regex::Captures;

use crate::text::Phrase;

#[derive(Debug, Clone)]
struct PatternEntry {
    phrase: Phrase,
    replacement: String,
    description: String,
}

/// Ordered rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
}

/// Builder for [`PatternTable`].
#[derive(Debug, Clone, Default)]
pub struct PatternTableBuilder {
    entries: Vec<(String, String, String)>,
}

impl PatternTableBuilder {
    /// Add a whole-phrase rewrite. Matching is case-insensitive and any run
    /// of whitespace between the words of `phrase` matches.
    pub fn rewrite(
        mut self,
        phrase: &str,
        replacement: &str,
        description: impl Into<String>,
    ) -> Self {
        self.entries
            .push((phrase.to_string(), replacement.to_string(), description.into()));
        self
    }

    pub fn build(self) -> Result<PatternTable, regex::Error> {
        let entries = self
            .entries
            .into_iter()
            .map(|(phrase, replacement, description)| {
                Ok(PatternEntry {
                    phrase: Phrase::new(&phrase)?,
                    replacement,
                    description,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(PatternTable { entries })
    }
}

impl PatternTable {
    pub fn builder() -> PatternTableBuilder {
        PatternTableBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry matches the text.
    pub fn is_match(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.phrase.is_match(text))
    }

    /// Apply every entry in order. Returns the rewritten text and the
    /// descriptions of the entries that matched.
    pub fn apply(&self, text: &str) -> (String, Vec<String>) {
        let mut current = text.to_string();
        let mut applied = Vec::new();

        for entry in &self.entries {
            if !entry.phrase.is_match(&current) {
                continue;
            }
            current = entry
                .phrase
                .regex()
                .replace_all(&current, |caps: &Captures<'_>| {
                    match_case(&caps[0], &entry.replacement)
                })
                .into_owned();
            applied.push(entry.description.clone());
        }

        (current, applied)
    }
}

/// Capitalize the replacement when the matched text starts with a capital.
fn match_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().is_some_and(char::is_uppercase);
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
