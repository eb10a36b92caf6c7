/// Ordered set of surveillance keywords, matched case-insensitively.
///
/// The set is built once at startup from configuration and never changes
/// afterwards. Matching is plain substring containment, not word-boundary
/// tokenization, so "car" matches "carpool".
#[derive(Debug, Clone)]
pub struct KeywordSet {
    /// Terms in registration order, original casing (used in notifications).
    terms: Vec<String>,
    /// Lowercased once at construction so matching doesn't re-fold per call.
    folded: Vec<String>,
}

impl KeywordSet {
    pub fn new(terms: Vec<String>) -> Self {
        let folded = terms.iter().map(|t| t.to_lowercase()).collect();
        Self { terms, folded }
    }

    /// Match `text` against every keyword. Returns the matched terms in
    /// registration order; empty input yields an empty result. Pure and
    /// deterministic — both the routing decision and the statistics
    /// increment reuse one result per event.
    pub fn match_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .zip(&self.folded)
            .filter(|(_, folded)| haystack.contains(folded.as_str()))
            .map(|(term, _)| term.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(terms: &[&str]) -> KeywordSet {
        KeywordSet::new(terms.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_case_insensitive_match() {
        let keywords = set(&["Netflix", "YouTube"]);
        let matched = keywords.match_text("anyone sharing a NETFLIX account? youtube too");
        assert_eq!(matched, vec!["Netflix", "YouTube"]);
    }

    #[test]
    fn test_substring_matches_mid_word() {
        let keywords = set(&["car"]);
        assert_eq!(keywords.match_text("looking for a carpool"), vec!["car"]);
    }

    #[test]
    fn test_empty_text_matches_nothing() {
        let keywords = set(&["上车", "合租"]);
        assert!(keywords.match_text("").is_empty());
    }

    #[test]
    fn test_no_match() {
        let keywords = set(&["vpn"]);
        assert!(keywords.match_text("good morning everyone").is_empty());
    }

    #[test]
    fn test_result_is_subset_in_registration_order() {
        let keywords = set(&["join", "Netflix", "split"]);
        let matched = keywords.match_text("anyone want to join a Netflix split?");
        assert_eq!(matched, vec!["join", "Netflix", "split"]);
        for term in &matched {
            assert!(keywords.terms.contains(term));
        }
    }

    #[test]
    fn test_cjk_terms() {
        let keywords = set(&["上车", "合租"]);
        let matched = keywords.match_text("有人要合租机场吗？快上车");
        assert_eq!(matched, vec!["上车", "合租"]);
    }
}
