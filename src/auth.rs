use anyhow::{Context, Result};
use std::collections::HashMap;

/// Maps usernames to their access tokens.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "alice": "7f3c...",
///   "bob": "91ab..."
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    entries: HashMap<String, String>,
}

impl TokenTable {
    /// Loads the table from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read token table '{path}'"))?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("token table '{path}' is not a JSON object of strings"))?;
        Ok(Self { entries })
    }

    /// Returns `true` when `token` is the one registered for `username`.
    pub fn is_valid(&self, username: &str, token: &str) -> bool {
        self.entries
            .get(username)
            .is_some_and(|expected| expected == token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TokenTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_is_valid_pairs() {
        let tokens: TokenTable = [("aaa", "bbb"), ("abc", "eee")].into_iter().collect();

        assert!(tokens.is_valid("aaa", "bbb"));
        assert!(!tokens.is_valid("aaa", "eee"));
        assert!(!tokens.is_valid("zzz", "bbb"));
    }

    #[test]
    fn test_load_from_file() {
        let path = format!("{}/group_rank_test_tokens.json", env::temp_dir().display());
        fs::write(&path, r#"{"cba": "ddd"}"#).unwrap();

        let tokens = TokenTable::load(&path).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens.is_valid("cba", "ddd"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_non_object() {
        let path = format!("{}/group_rank_test_tokens_bad.json", env::temp_dir().display());
        fs::write(&path, "[1, 2]").unwrap();

        assert!(TokenTable::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
