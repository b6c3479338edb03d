use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
pub use u256::U256;

use crate::errors::{error, Error, Result};

// Kept apart from the crate's `Result` and `Error`, which the macro expansion
// would otherwise pick up.
mod u256 {
    #![allow(clippy::assign_op_pattern)]

    use uint::construct_uint;

    construct_uint! {
        pub struct U256(4);
    }
}

/// A 4-byte function or error selector.
pub type Selector = [u8; 4];

fn strip_hex_prefix(hex: &str) -> &str {
    hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex)
}

macro_rules! fixed_hex_type {
    ($name:ident, $len:literal, $what:literal) => {
        #[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn zeroed() -> Self {
                Self([0; $len])
            }

            /// Accepts both `0x` prefixed and non-prefixed hex strings.
            pub fn from_hex_str(hex: &str) -> Result<Self> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(strip_hex_prefix(hex), &mut bytes as &mut [u8]).map_err(
                    |err| error!(InvalidConfig, "`{hex}` is not a valid {}: {err}", $what),
                )?;

                Ok(Self(bytes))
            }

            /// Lowercase hex without the `0x` prefix.
            pub fn to_hex_string(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x{}", self.to_hex_string())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex_str(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let hex: String = Deserialize::deserialize(deserializer)?;
                Self::from_hex_str(&hex).map_err(de::Error::custom)
            }
        }
    };
}

fixed_hex_type!(Address, 20, "address");
fixed_hex_type!(H256, 32, "32-byte hash");

impl Address {
    /// The address occupying the low 20 bytes of a 32-byte log topic.
    pub fn from_topic(topic: &H256) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&topic.0[12..]);
        Self(bytes)
    }
}

/// Two's complement signed 256-bit integer stored in a [`U256`].
#[derive(Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
pub struct I256(U256);

impl I256 {
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> U256 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.bit(255)
    }

    pub fn from_i64(value: i64) -> Self {
        let magnitude = U256::from(value.unsigned_abs());
        if value < 0 {
            Self((!magnitude).overflowing_add(U256::one()).0)
        } else {
            Self(magnitude)
        }
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_big_endian(&bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn address_from_hex_str() -> Result<()> {
        let hex_str = "0x0101010101010101010101010101010101010101";

        let address: Address = hex_str.parse()?;

        assert_eq!(address.0, [1u8; 20]);
        assert_eq!(address.to_string(), hex_str);

        Ok(())
    }

    #[test]
    fn address_of_wrong_length_is_rejected() {
        let err = Address::from_hex_str("0x0101").expect_err("should have failed");

        assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
    }

    #[test]
    fn address_is_taken_from_low_topic_bytes() {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&[0xab; 20]);

        let address = Address::from_topic(&H256(topic));

        assert_eq!(address, Address([0xab; 20]));
    }

    #[test]
    fn negative_i256_round_trips_through_be_bytes() {
        let minus_one = I256::from_i64(-1);

        assert!(minus_one.is_negative());
        assert_eq!(minus_one.to_be_bytes(), [0xff; 32]);
        assert_eq!(I256::from_be_bytes([0xff; 32]), minus_one);
        assert!(!I256::from_i64(7).is_negative());
        assert_eq!(I256::from_i64(7).into_raw(), U256::from(7u64));
    }

    #[test]
    fn u256_supports_full_width_arithmetic() {
        let max = U256::MAX;

        let (wrapped, overflowed) = max.overflowing_add(U256::one());

        assert!(overflowed);
        assert_eq!(wrapped, U256::zero());
        assert_eq!(
            U256::from_dec_str("18446744073709551616").ok(),
            Some(U256::from(u64::MAX) + U256::one())
        );
    }
}
