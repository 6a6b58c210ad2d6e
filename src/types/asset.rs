use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// What a balance is denominated in.
///
/// The native currency has no contract address; it is rendered as `0x`
/// (an empty hex string) and stored as an empty byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    pub const NATIVE_ID: &'static str = "0x";

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Asset::Native => &[],
            Asset::Token(address) => address.as_slice(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            0 => Some(Asset::Native),
            20 => Some(Asset::Token(Address::from_slice(bytes))),
            _ => None,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str(Self::NATIVE_ID),
            Asset::Token(address) => write!(f, "{}", address),
        }
    }
}

impl FromStr for Asset {
    type Err = alloy::hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::NATIVE_ID || s.is_empty() {
            return Ok(Asset::Native);
        }
        s.parse::<Address>().map(Asset::Token)
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_native_sentinel() {
        assert_eq!(Asset::Native.to_string(), "0x");
        assert_eq!("0x".parse::<Asset>().unwrap(), Asset::Native);
        assert!(Asset::Native.as_bytes().is_empty());
        assert_eq!(Asset::from_bytes(&[]), Some(Asset::Native));
    }

    #[test]
    fn test_token_round_trip() {
        let usdc = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        let asset = Asset::Token(usdc);
        let rendered = asset.to_string();
        assert_eq!(rendered, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
        assert_eq!(rendered.parse::<Asset>().unwrap(), asset);
        assert_eq!(Asset::from_bytes(asset.as_bytes()), Some(asset));
    }

    #[test]
    fn test_from_bytes_rejects_bad_length() {
        assert_eq!(Asset::from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn test_native_orders_first() {
        let token = Asset::Token(Address::ZERO);
        assert!(Asset::Native < token);
    }
}
