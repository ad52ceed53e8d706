// Copyright (c) 2016-2020 Fabian Schuiki

//! Small utilities that have no better place to live in.

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let subst = prev[j] + if ca == cb { 0 } else { 1 };
            curr[j + 1] = subst.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Accumulates candidate identifiers and suggests the one closest to a
/// misspelled query, for use in "did you mean" notes on diagnostics.
#[derive(Default)]
pub struct SpellCheck {
    candidates: Vec<String>,
}

impl SpellCheck {
    /// Create a new empty candidate set.
    pub fn new() -> SpellCheck {
        Default::default()
    }

    /// Add a candidate identifier.
    pub fn push_candidate(&mut self, candidate: impl Into<String>) {
        self.candidates.push(candidate.into());
    }

    /// Suggest the candidate closest to `query`, if any candidate is close
    /// enough to plausibly be a misspelling of it.
    pub fn best_candidate(&self, query: &str) -> Option<&str> {
        let limit = query.len() / 3 + 1;
        self.candidates
            .iter()
            .map(|c| (levenshtein_distance(query, c), c))
            .filter(|&(dist, _)| dist <= limit)
            .min_by_key(|&(dist, _)| dist)
            .map(|(_, c)| c.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_identical() {
        assert_eq!(levenshtein_distance("hello", "hello"), 0);
    }

    #[test]
    fn levenshtein_empty_strings() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "xyz"), 3);
    }

    #[test]
    fn levenshtein_single_edit() {
        assert_eq!(levenshtein_distance("cat", "bat"), 1);
        assert_eq!(levenshtein_distance("cat", "cats"), 1);
        assert_eq!(levenshtein_distance("cats", "cat"), 1);
    }

    #[test]
    fn levenshtein_classic() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("sunday", "saturday"), 3);
    }

    #[test]
    fn suggests_closest_candidate() {
        let mut sp = SpellCheck::new();
        sp.push_candidate("clock");
        sp.push_candidate("reset");
        assert_eq!(sp.best_candidate("clk"), Some("clock"));
        assert_eq!(sp.best_candidate("enable"), None);
    }
}
