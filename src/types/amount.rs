//! Arbitrary-precision signed amounts.
//!
//! Every monetary value on the aggregation path is an [`Amount`]. On-chain
//! quantities routinely exceed 64 bits (token supplies are `uint256`), and
//! per-block deltas can be negative, so the representation is an unbounded
//! signed integer. Only addition and subtraction are exposed for netting;
//! `mul_u64` exists solely to turn gas used and gas price into a fee.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use num::bigint::Sign;
use num::{BigInt, Num, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid base-{radix} integer {input:?}")]
pub struct ParseAmountError {
    pub input: String,
    pub radix: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    /// Parse a base-10 integer with an optional leading `-`.
    ///
    /// Empty input, whitespace, `+` signs and `_` separators are rejected.
    pub fn from_dec_str(s: &str) -> Result<Self, ParseAmountError> {
        let err = || ParseAmountError {
            input: s.to_string(),
            radix: 10,
        };

        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        BigInt::from_str_radix(s, 10).map(Self).map_err(|_| err())
    }

    /// Interpret raw bytes as an unsigned big-endian integer.
    ///
    /// An empty payload carries no number at all and is rejected.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, ParseAmountError> {
        if bytes.is_empty() {
            return Err(ParseAmountError {
                input: String::from("0x"),
                radix: 16,
            });
        }
        Ok(Self(BigInt::from_bytes_be(Sign::Plus, bytes)))
    }

    pub fn mul_u64(&self, factor: u64) -> Self {
        Self(&self.0 * factor)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<BigInt> for Amount {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dec_str(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn sub(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Amount> for Amount {
    fn sub_assign(&mut self, rhs: &Amount) {
        self.0 -= &rhs.0;
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}
