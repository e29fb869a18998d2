use super::error::{ConfigError, Result};
use super::table::ConfigTable;
use crate::keys::{ContentKey, EncodingKey};

/// Content key of a system file with its encoding key when the config
/// carries one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    /// Content key of the decoded file
    pub content_key: ContentKey,
    /// Encoding key, fetchable without an encoding table lookup
    pub encoding_key: Option<EncodingKey>,
}

/// Typed view over a build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    table: ConfigTable,
}

impl BuildConfig {
    /// Wrap a parsed table
    pub fn new(table: ConfigTable) -> Self {
        Self { table }
    }

    /// Parse build configuration bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        ConfigTable::parse_bytes(data).map(Self::new)
    }

    /// Underlying key/value table
    pub fn table(&self) -> &ConfigTable {
        &self.table
    }

    /// Encoding table keys
    pub fn encoding(&self) -> Result<Option<KeyPair>> {
        self.key_pair("encoding")
    }

    /// Install manifest keys
    pub fn install(&self) -> Result<Option<KeyPair>> {
        self.key_pair("install")
    }

    /// Download manifest keys
    pub fn download(&self) -> Result<Option<KeyPair>> {
        self.key_pair("download")
    }

    /// Root file content key
    pub fn root(&self) -> Result<Option<ContentKey>> {
        match self.table.values("root").first() {
            Some(hex) => parse_key("root", hex).map(Some),
            None => Ok(None),
        }
    }

    /// Human readable build name
    pub fn build_name(&self) -> Option<&str> {
        self.table.get("build-name")
    }

    /// `<ckey> [<ekey>]`; only the first pair counts when several are listed
    fn key_pair(&self, field: &str) -> Result<Option<KeyPair>> {
        if self.table.get(field).is_none() {
            return Ok(None);
        }
        let values = self.table.values(field);
        let Some(ckey) = values.first() else {
            return Err(ConfigError::EmptyValue {
                field: field.to_string(),
            });
        };

        let content_key = parse_key::<ContentKey>(field, ckey)?;
        let encoding_key = values
            .get(1)
            .map(|ekey| parse_key::<EncodingKey>(field, ekey))
            .transpose()?;

        Ok(Some(KeyPair {
            content_key,
            encoding_key,
        }))
    }
}

fn parse_key<K: std::str::FromStr>(field: &str, hex: &str) -> Result<K> {
    hex.parse().map_err(|_| ConfigError::InvalidKey {
        field: field.to_string(),
        value: hex.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = "\
# Build Configuration

root = 00112233445566778899aabbccddeeff
install = 0123456789abcdef0123456789abcdef fedcba9876543210fedcba9876543210
download = 11111111111111111111111111111111
encoding = 22222222222222222222222222222222 33333333333333333333333333333333
encoding-size = 100 90
build-name = WOW-54205patch11.1.0_Retail
";

    #[test]
    fn test_system_file_keys() {
        let config = BuildConfig::parse(CONFIG.as_bytes()).unwrap();

        let encoding = config.encoding().unwrap().unwrap();
        assert_eq!(encoding.content_key, ContentKey::from_bytes([0x22; 16]));
        assert_eq!(encoding.encoding_key, Some(EncodingKey::from_bytes([0x33; 16])));

        let download = config.download().unwrap().unwrap();
        assert_eq!(download.encoding_key, None);

        assert!(config.install().unwrap().unwrap().encoding_key.is_some());
        assert_eq!(
            config.root().unwrap().unwrap().to_hex(),
            "00112233445566778899aabbccddeeff"
        );
        assert_eq!(config.build_name(), Some("WOW-54205patch11.1.0_Retail"));
    }

    #[test]
    fn test_missing_and_malformed() {
        let config = BuildConfig::new(ConfigTable::parse("encoding = xyz\ninstall =\n"));
        assert!(config.download().unwrap().is_none());
        assert!(matches!(
            config.encoding(),
            Err(ConfigError::InvalidKey { .. })
        ));
        assert!(matches!(
            config.install(),
            Err(ConfigError::EmptyValue { .. })
        ));
        assert!(config.root().unwrap().is_none());
    }
}
