//! Content and encoding keys
//!
//! Both key kinds are 16-byte MD5 digests. They are kept as distinct types
//! so a content key can never be handed to an API expecting an encoding key.

use binrw::{BinRead, BinWrite};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of every key in published tables
pub const KEY_LEN: usize = 16;

macro_rules! hash_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; KEY_LEN]);

        impl $name {
            /// Wrap raw key bytes
            pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
                Self(bytes)
            }

            /// Copy a key out of a slice, `None` unless it is exactly 16 bytes
            pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; KEY_LEN]>::try_from(bytes).ok().map(Self)
            }

            /// Parse a 32 character hex string
            pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; KEY_LEN];
                hex::decode_to_slice(hex.trim(), &mut bytes)?;
                Ok(Self(bytes))
            }

            /// Raw key bytes
            pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
                &self.0
            }

            /// Lower-case hex representation
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// True for the all-zero key used as page padding
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|&b| b == 0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_hex())
            }
        }

        impl From<[u8; KEY_LEN]> for $name {
            fn from(bytes: [u8; KEY_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }
    };
}

hash_key! {
    /// Identity of decoded file content (MD5 of the decoded bytes)
    ContentKey
}

hash_key! {
    /// Identity of an encoded byte stream as stored on the CDN
    EncodingKey
}

impl ContentKey {
    /// Derive the content key of decoded bytes
    pub fn from_data(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_from_data() {
        let key = ContentKey::from_data(b"Hello, World!");
        assert_eq!(key.to_hex(), "65a8e27d8879283831b664bd8b7f0ad4");
    }

    #[test]
    fn test_hex_parsing() {
        let key: EncodingKey = "00112233445566778899AABBCCDDEEFF".parse().unwrap();
        assert_eq!(key.to_hex(), "00112233445566778899aabbccddeeff");
        assert_eq!(key.to_string(), key.to_hex());

        assert!(EncodingKey::from_hex("0011").is_err());
        assert!(EncodingKey::from_hex("zz112233445566778899aabbccddeeff").is_err());
    }

    #[test]
    fn test_try_from_slice() {
        assert!(ContentKey::try_from_slice(&[1u8; 15]).is_none());
        let key = ContentKey::try_from_slice(&[1u8; 16]).unwrap();
        assert_eq!(key.as_bytes(), &[1u8; 16]);
    }

    #[test]
    fn test_ordering_follows_bytes() {
        let low = EncodingKey::from_bytes([0x00; 16]);
        let mut high_bytes = [0x00; 16];
        high_bytes[0] = 0x01;
        let high = EncodingKey::from_bytes(high_bytes);
        assert!(low < high);
        assert!(low.is_zero());
        assert!(!high.is_zero());
    }
}
