use ethbind_core::{
    error,
    types::{Address, H256, I256, U256},
    utils::keccak256,
    Result,
};

use crate::logs::{DecodeLog, RawLog};

/// Values that can be matched against an indexed event argument. Only types
/// stored verbatim in a topic implement this; dynamic arguments are matched
/// through [`hashed_topic`].
pub trait IntoTopic {
    fn into_topic(self) -> H256;
}

impl IntoTopic for H256 {
    fn into_topic(self) -> H256 {
        self
    }
}

impl IntoTopic for Address {
    fn into_topic(self) -> H256 {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&self.0);
        H256(topic)
    }
}

impl IntoTopic for bool {
    fn into_topic(self) -> H256 {
        let mut topic = [0u8; 32];
        topic[31] = u8::from(self);
        H256(topic)
    }
}

impl IntoTopic for U256 {
    fn into_topic(self) -> H256 {
        let mut topic = [0u8; 32];
        self.to_big_endian(&mut topic);
        H256(topic)
    }
}

impl IntoTopic for I256 {
    fn into_topic(self) -> H256 {
        H256(self.to_be_bytes())
    }
}

// `bytesN` values are left aligned. Only `bytes1` to `bytes32` exist, so longer
// arrays get no impl rather than being cut short.
macro_rules! fixed_bytes_into_topic {
    ($($len:literal),*) => {
        $(
            impl IntoTopic for [u8; $len] {
                fn into_topic(self) -> H256 {
                    let mut topic = [0u8; 32];
                    topic[..$len].copy_from_slice(&self);
                    H256(topic)
                }
            }
        )*
    };
}

fixed_bytes_into_topic!(
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31, 32
);

macro_rules! unsigned_into_topic {
    ($($ty:ty),*) => {
        $(
            impl IntoTopic for $ty {
                fn into_topic(self) -> H256 {
                    let bytes = self.to_be_bytes();
                    let mut topic = [0u8; 32];
                    topic[32 - bytes.len()..].copy_from_slice(&bytes);
                    H256(topic)
                }
            }
        )*
    };
}

macro_rules! signed_into_topic {
    ($($ty:ty),*) => {
        $(
            impl IntoTopic for $ty {
                fn into_topic(self) -> H256 {
                    let bytes = self.to_be_bytes();
                    let fill = if self < 0 { 0xff } else { 0 };
                    let mut topic = [fill; 32];
                    topic[32 - bytes.len()..].copy_from_slice(&bytes);
                    H256(topic)
                }
            }
        )*
    };
}

unsigned_into_topic!(u8, u16, u32, u64);
signed_into_topic!(i8, i16, i32, i64);

/// The topic under which an indexed `string` or `bytes` argument is logged.
pub fn hashed_topic(value: impl AsRef<[u8]>) -> H256 {
    H256(keccak256(value))
}

/// Selects logs by emitting contract, block range and topics. Every topic
/// position holds the accepted values; `None` accepts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Option<Address>,
    pub topics: [Option<Vec<H256>>; 4],
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query for the logs of `E`, with topic0 filled in.
    pub fn for_event<E: DecodeLog>() -> Result<Self> {
        let topic0 = E::topic0().ok_or_else(|| {
            error!(
                InvalidConfig,
                "anonymous event `{}` has no topic to filter on",
                std::any::type_name::<E>()
            )
        })?;

        let mut query = Self::new();
        query.topics[0] = Some(vec![topic0]);

        Ok(query)
    }

    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Restricts the topic at `position` to any of `values`. An empty list
    /// lifts the restriction.
    pub fn topic<T: IntoTopic>(
        mut self,
        position: usize,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        let slot = self.topics.get_mut(position).ok_or_else(|| {
            error!(
                InvalidConfig,
                "topic position {position} is out of range, logs carry at most 4 topics"
            )
        })?;

        let values: Vec<_> = values.into_iter().map(IntoTopic::into_topic).collect();
        *slot = (!values.is_empty()).then_some(values);

        Ok(self)
    }

    pub fn matches(&self, log: &RawLog) -> bool {
        if self.address.is_some_and(|address| address != log.address) {
            return false;
        }

        if let Some(block) = log.block_number {
            if self.from_block.is_some_and(|from| block < from)
                || self.to_block.is_some_and(|to| block > to)
            {
                return false;
            }
        }

        self.topics
            .iter()
            .enumerate()
            .all(|(position, accepted)| match accepted {
                None => true,
                Some(accepted) => log
                    .topics
                    .get(position)
                    .is_some_and(|topic| accepted.contains(topic)),
            })
    }
}

#[cfg(test)]
mod tests {
    use ethbind_core::Error;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::logs::test_events::{address, transfer_log, Transfer};

    fn hex_topic(hex: &str) -> H256 {
        H256::from_hex_str(hex).expect("valid topic")
    }

    #[test_case(true.into_topic(), "0000000000000000000000000000000000000000000000000000000000000001"; "bool")]
    #[test_case(0x1234u16.into_topic(), "0000000000000000000000000000000000000000000000000000000000001234"; "uint16")]
    #[test_case((-2i32).into_topic(), "fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe"; "negative int32")]
    #[test_case(I256::from_i64(-1).into_topic(), "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"; "negative int256")]
    #[test_case(U256::from(256u64).into_topic(), "0000000000000000000000000000000000000000000000000000000000000100"; "uint256")]
    #[test_case([0xabu8, 0xcd].into_topic(), "abcd000000000000000000000000000000000000000000000000000000000000"; "bytes2")]
    #[test_case(address(0x11).into_topic(), "0000000000000000000000001111111111111111111111111111111111111111"; "address")]
    fn static_values_are_encoded_in_place(topic: H256, expected: &str) {
        assert_eq!(topic, hex_topic(expected));
    }

    #[test]
    fn full_width_bytes32_is_kept_whole() {
        let mut value = [0u8; 32];
        value[0] = 0x01;
        value[31] = 0xff;

        assert_eq!(
            value.into_topic(),
            hex_topic("01000000000000000000000000000000000000000000000000000000000000ff")
        );
    }

    #[test]
    fn longer_byte_arrays_are_hashed_not_truncated() {
        // `[u8; 33]` has no `IntoTopic`; such values go through `hashed_topic`.
        let long = [0x42u8; 33];

        assert_eq!(hashed_topic(long), H256(keccak256(long)));
        assert_ne!(hashed_topic(long).0[..], long[..32]);
    }

    #[test]
    fn strings_are_matched_by_hash() {
        assert_eq!(
            hashed_topic("hello"),
            hex_topic("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8")
        );
    }

    #[test]
    fn event_query_filters_on_topic0() -> Result<()> {
        let query = LogQuery::for_event::<Transfer>()?;

        assert!(query.matches(&transfer_log(1, 2, 3)));
        assert!(!query.matches(&crate::logs::test_events::approval_log()));

        Ok(())
    }

    #[test]
    fn anonymous_events_cannot_be_queried_by_topic0() {
        struct Anonymous;
        impl DecodeLog for Anonymous {
            fn topic0() -> Option<H256> {
                None
            }

            fn decode_log(_: &RawLog) -> Result<Self> {
                Ok(Self)
            }
        }

        let err = LogQuery::for_event::<Anonymous>().expect_err("should have failed");

        assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
    }

    #[test]
    fn indexed_values_narrow_the_query() -> Result<()> {
        let query = LogQuery::for_event::<Transfer>()?.topic(1, [address(1), address(3)])?;

        assert!(query.matches(&transfer_log(1, 2, 3)));
        assert!(query.matches(&transfer_log(3, 2, 3)));
        assert!(!query.matches(&transfer_log(2, 1, 3)));

        let query = query.topic::<Address>(1, [])?;
        assert!(query.matches(&transfer_log(2, 1, 3)));

        Ok(())
    }

    #[test]
    fn address_and_block_range_narrow_the_query() {
        let query = LogQuery::new()
            .address(address(0xee))
            .from_block(10)
            .to_block(20);
        let at_block = |block| RawLog {
            block_number: Some(block),
            ..transfer_log(1, 2, 3)
        };

        assert!(query.matches(&at_block(10)));
        assert!(query.matches(&at_block(20)));
        assert!(!query.matches(&at_block(21)));
        assert!(!query.matches(&at_block(9)));
        assert!(!query.matches(&RawLog {
            address: address(0xdd),
            ..at_block(15)
        }));
    }

    #[test]
    fn topic_position_past_the_fourth_is_rejected() {
        let err = LogQuery::new()
            .topic(4, [true])
            .expect_err("should have failed");

        assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
    }
}
