// 🔍 Name Resolver - Free-form region names → canonical registry keys
//
// Three rules, tried in order, first hit wins:
//   1. Exact key
//   2. Case-insensitive key
//   3. Substring either way, only where the key is at least as long as the input
//
// Ambiguous input takes the first key in sorted order: "new" -> "New Mexico".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchRule {
    Exact,
    CaseInsensitive,
    Substring,
}

impl MatchRule {
    /// Rules in precedence order
    pub const ORDER: [MatchRule; 3] = [MatchRule::Exact, MatchRule::CaseInsensitive, MatchRule::Substring];

    /// First key this rule accepts for `input`. `input` must already be trimmed.
    pub fn find<'a, I>(&self, input: &str, keys: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let lower = input.to_lowercase();
        let mut keys = keys.into_iter();

        match self {
            MatchRule::Exact => keys.find(|k| *k == input),
            MatchRule::CaseInsensitive => keys.find(|k| k.to_lowercase() == lower),
            MatchRule::Substring => keys.find(|k| {
                let key_lower = k.to_lowercase();
                (key_lower.contains(&lower) || lower.contains(&key_lower))
                    && key_lower.len() >= lower.len()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub name: &'a str,
    pub rule: MatchRule,
}

/// Resolve `input` against `keys` (iterated in the order given; registry keys are sorted).
/// Blank input never resolves.
pub fn resolve<'a>(input: &str, keys: &[&'a str]) -> Option<Resolution<'a>> {
    let normalized = input.trim();
    if normalized.is_empty() {
        return None;
    }

    MatchRule::ORDER.iter().find_map(|rule| {
        rule.find(normalized, keys.iter().copied())
            .map(|name| Resolution { name, rule: *rule })
    })
}

// ============================================================================
// TESTS
// ============================================================================
