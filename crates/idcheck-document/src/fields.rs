// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Field scanner — recovers candidate identity numbers and issuing-authority
// markings from extracted document text.

use idcheck_core::config::DEFAULT_AUTHORITY_KEYWORDS;
use idcheck_core::error::IdCheckError;
use idcheck_core::types::CandidateIdentifier;
use regex::Regex;
use tracing::debug;

/// Three groups of four ASCII digits, each optionally followed by a single
/// whitespace character, bounded by word boundaries.
const IDENTIFIER_PATTERN: &str = r"\b[0-9]{4}\s?[0-9]{4}\s?[0-9]{4}\b";

/// What the scanner found in one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldScan {
    pub identifiers: Vec<CandidateIdentifier>,
    pub has_authority_marker: bool,
}

/// Immutable scanner; build once and share.
#[derive(Debug, Clone)]
pub struct FieldScanner {
    pattern: Regex,
    /// Lower-cased issuing-authority phrases.
    keywords: Vec<String>,
}

impl FieldScanner {
    /// Build a scanner that treats any of `keywords` (case-insensitive) as an
    /// authority marker.
    pub fn new<I, S>(keywords: I) -> Result<Self, IdCheckError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pattern = Regex::new(IDENTIFIER_PATTERN)
            .map_err(|err| IdCheckError::InvalidInput(format!("identifier pattern: {err}")))?;
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Ok(Self { pattern, keywords })
    }

    /// Scanner with the stock issuing-authority phrases.
    pub fn with_default_keywords() -> Result<Self, IdCheckError> {
        Self::new(DEFAULT_AUTHORITY_KEYWORDS)
    }

    /// All non-overlapping identifier-shaped substrings, in order of
    /// appearance, normalised to bare digits.
    pub fn identifiers(&self, text: &str) -> Vec<CandidateIdentifier> {
        self.pattern
            .find_iter(text)
            .map(|m| CandidateIdentifier::from_match(m.as_str()))
            .collect()
    }

    /// Whether any configured authority phrase occurs in `text`.
    pub fn has_authority_marker(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    pub fn scan(&self, text: &str) -> FieldScan {
        let scan = FieldScan {
            identifiers: self.identifiers(text),
            has_authority_marker: self.has_authority_marker(text),
        };
        debug!(
            identifiers = scan.identifiers.len(),
            has_authority_marker = scan.has_authority_marker,
            "Fields scanned"
        );
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> FieldScanner {
        FieldScanner::with_default_keywords().unwrap()
    }

    fn digits(ids: &[CandidateIdentifier]) -> Vec<&str> {
        ids.iter().map(CandidateIdentifier::as_str).collect()
    }

    #[test]
    fn finds_spaced_and_compact_numbers() {
        let ids = scanner().identifiers("No: 2345 6789 0124 alt 499112324379.");
        assert_eq!(digits(&ids), ["234567890124", "499112324379"]);
    }

    #[test]
    fn ignores_numbers_embedded_in_longer_runs() {
        assert!(scanner().identifiers("ref 12345678901234").is_empty());
        assert!(scanner().identifiers("2345678901").is_empty());
    }

    #[test]
    fn tolerates_a_line_break_between_groups() {
        let ids = scanner().identifiers("2345\n6789\n0124");
        assert_eq!(digits(&ids), ["234567890124"]);
    }

    #[test]
    fn rejects_double_spacing() {
        assert!(scanner().identifiers("2345  6789  0124").is_empty());
    }

    #[test]
    fn non_ascii_digits_do_not_match() {
        assert!(scanner().identifiers("२३४५ ६७८९ ०१२४").is_empty());
    }

    #[test]
    fn authority_markers_are_case_insensitive() {
        let s = scanner();
        assert!(s.has_authority_marker("GOVERNMENT OF INDIA"));
        assert!(s.has_authority_marker("Unique Identification Authority of India"));
        assert!(s.has_authority_marker("my aadhaar"));
        assert!(!s.has_authority_marker("Republic of Freedonia"));
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let s = FieldScanner::new(["Election Commission", "  "]).unwrap();
        assert!(s.has_authority_marker("election commission of india"));
        assert!(!s.has_authority_marker("government of india"));
    }

    #[test]
    fn scan_combines_both_fields() {
        let scan = scanner().scan("Government of India\n2345 6789 0124");
        assert_eq!(digits(&scan.identifiers), ["234567890124"]);
        assert!(scan.has_authority_marker);

        let empty = scanner().scan("");
        assert!(empty.identifiers.is_empty());
        assert!(!empty.has_authority_marker);
    }
}
