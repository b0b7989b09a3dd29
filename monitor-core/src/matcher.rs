use serde::Deserialize;

/// Case-insensitive substring match of any keyword against `title` and `body`.
///
/// No word boundaries: "senior living" also matches inside "senior livingroom".
pub fn is_relevant<K: AsRef<str>>(title: &str, body: &str, keywords: &[K]) -> bool {
    let text = format!("{} {}", title, body).to_lowercase();
    keywords
        .iter()
        .any(|keyword| text.contains(&keyword.as_ref().to_lowercase()))
}

/// Keyword list fixed at startup and stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, title: &str, body: &str) -> bool {
        is_relevant(title, body, &self.keywords)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_title_case_insensitively() {
        assert!(is_relevant(
            "Looking for Dementia Care options",
            "",
            &["dementia care"]
        ));
    }

    #[test]
    fn test_matches_body() {
        assert!(is_relevant(
            "Need advice",
            "Mom may need ASSISTED LIVING soon",
            &["assisted living"]
        ));
    }

    #[test]
    fn test_uppercase_keyword_is_lowered() {
        assert!(is_relevant("memory care in tucson", "", &["Memory Care"]));
    }

    #[test]
    fn test_no_match() {
        assert!(!is_relevant("Best tacos in town", "any tips?", &["nursing home"]));
    }

    #[test]
    fn test_empty_keyword_list_never_matches() {
        let none: [&str; 0] = [];
        assert!(!is_relevant("dementia care", "assisted living", &none));
        assert!(!is_relevant("", "", &none));
    }

    #[test]
    fn test_empty_title_and_body() {
        assert!(!is_relevant("", "", &["alzheimer"]));
    }

    #[test]
    fn test_substring_without_word_boundary() {
        assert!(is_relevant("alzheimers support group", "", &["alzheimer"]));
        assert!(is_relevant("senior livingroom decor", "", &["senior living"]));
    }

    #[test]
    fn test_match_across_title_body_join() {
        // Title and body are joined by a single space.
        assert!(is_relevant("help with senior", "care for dad", &["senior care"]));
    }

    #[test]
    fn test_keyword_set_normalizes() {
        let set = KeywordSet::new(["  Nursing Home ", "", "ALZHEIMER"]);
        assert_eq!(set.as_slice(), &["nursing home", "alzheimer"]);
        assert_eq!(set.len(), 2);
        assert!(set.matches("Choosing a nursing home", ""));
        assert!(!set.matches("Choosing a daycare", ""));
    }

    #[test]
    fn test_empty_keyword_set() {
        let set = KeywordSet::new(Vec::<String>::new());
        assert!(set.is_empty());
        assert!(!set.matches("dementia care", ""));
    }
}
