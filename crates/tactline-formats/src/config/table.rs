use super::error::Result;
use std::collections::HashMap;

/// Raw `key = value` pairs of a configuration file
///
/// Keys keep their first-seen order; a repeated key replaces the earlier
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTable {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl ConfigTable {
    /// Parse configuration text
    ///
    /// Blank lines, `#` comments and lines without `=` are skipped. Key and
    /// value are trimmed and split at the first `=`.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            table.insert(key.trim(), value.trim());
        }
        table
    }

    /// Parse configuration bytes, rejecting anything that is not UTF-8
    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::parse(std::str::from_utf8(data)?))
    }

    /// Set a value, replacing any earlier one
    pub fn insert(&mut self, key: &str, value: &str) {
        if self
            .values
            .insert(key.to_string(), value.to_string())
            .is_none()
        {
            self.order.push(key.to_string());
        }
    }

    /// Value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for a key split on whitespace; empty when absent
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no key was parsed
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Render back to text, one pair per line
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for key in &self.order {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&self.values[key]);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rules() {
        let text = "# Build Configuration\n\
                    \n\
                    root = abc\n\
                    no separator here\n\
                    build-name =  WOW-1234  \n\
                    equation = a=b\n\
                    root = def\n";
        let table = ConfigTable::parse(text);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("root"), Some("def"));
        assert_eq!(table.get("build-name"), Some("WOW-1234"));
        assert_eq!(table.get("equation"), Some("a=b"));
        assert_eq!(table.get("missing"), None);
        assert_eq!(
            table.keys().collect::<Vec<_>>(),
            vec!["root", "build-name", "equation"]
        );
    }

    #[test]
    fn test_values_split_on_whitespace() {
        let table = ConfigTable::parse("archives = aa  bb\tcc\nempty =\n");
        assert_eq!(table.values("archives"), vec!["aa", "bb", "cc"]);
        assert!(table.values("empty").is_empty());
        assert!(table.values("missing").is_empty());
    }

    #[test]
    fn test_text_round_trip() {
        let table = ConfigTable::parse("a = 1\nb = 2 3\n");
        assert_eq!(ConfigTable::parse(&table.to_text()), table);
    }

    #[test]
    fn test_rejects_non_utf8() {
        assert!(matches!(
            ConfigTable::parse_bytes(&[b'a', b'=', 0xFF]),
            Err(ConfigError::InvalidUtf8(_))
        ));
        assert!(ConfigTable::parse_bytes(b"").unwrap().is_empty());
    }
}
