use ethbind_core::{
    error,
    types::{Address, H256},
    Result,
};

pub use filter::{hashed_topic, IntoTopic, LogQuery};
pub use iterator::LogIterator;
pub use subscription::{watch, Subscription};

mod filter;
mod iterator;
mod subscription;

/// A log entry as delivered by the node, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<u64>,
    /// Set when the log was reverted by a chain reorganization.
    pub removed: bool,
}

impl RawLog {
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }

    /// The topic at `position`, failing with a decoding error if the log has
    /// fewer topics.
    pub fn topic(&self, position: usize) -> Result<H256> {
        self.topics.get(position).copied().ok_or_else(|| {
            error!(
                Decode,
                "log has {} topics, expected one at position {position}",
                self.topics.len()
            )
        })
    }
}

/// Implemented by the generated event types.
pub trait DecodeLog: Sized {
    /// `None` for anonymous events.
    fn topic0() -> Option<H256>;

    fn decode_log(log: &RawLog) -> Result<Self>;

    /// Whether `log` carries this event. Anonymous events match every log.
    fn is_emitted_in(log: &RawLog) -> bool {
        match Self::topic0() {
            Some(topic0) => log.topic0() == Some(&topic0),
            None => true,
        }
    }
}

/// A decoded event together with the log it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog<E> {
    pub event: E,
    pub raw: RawLog,
}

impl<E: DecodeLog> DecodedLog<E> {
    pub fn decode(raw: RawLog) -> Result<Self> {
        let event = E::decode_log(&raw)?;
        Ok(Self { event, raw })
    }
}

#[cfg(test)]
pub(crate) mod test_events {
    use ethbind_core::{
        types::{Address, H256, U256},
        utils::event_topic,
        Result,
    };

    use super::{DecodeLog, RawLog};

    /// `Transfer(address indexed from, address indexed to, uint256 value)`
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Transfer {
        pub from: Address,
        pub to: Address,
        pub value: U256,
    }

    impl DecodeLog for Transfer {
        fn topic0() -> Option<H256> {
            Some(event_topic("Transfer(address,address,uint256)"))
        }

        fn decode_log(log: &RawLog) -> Result<Self> {
            let data: &[u8; 32] = log.data.as_slice().try_into().map_err(|_| {
                ethbind_core::error!(Decode, "expected 32 bytes of data, got {}", log.data.len())
            })?;

            Ok(Self {
                from: Address::from_topic(&log.topic(1)?),
                to: Address::from_topic(&log.topic(2)?),
                value: U256::from_big_endian(data),
            })
        }
    }

    pub(crate) fn address(byte: u8) -> Address {
        Address([byte; 20])
    }

    pub(crate) fn transfer_log(from: u8, to: u8, value: u64) -> RawLog {
        let mut data = vec![0; 24];
        data.extend(value.to_be_bytes());

        RawLog {
            address: address(0xee),
            topics: vec![
                event_topic("Transfer(address,address,uint256)"),
                topic_of(address(from)),
                topic_of(address(to)),
            ],
            data,
            ..RawLog::default()
        }
    }

    pub(crate) fn approval_log() -> RawLog {
        RawLog {
            address: address(0xee),
            topics: vec![event_topic("Approval(address,address,uint256)")],
            data: vec![0; 32],
            ..RawLog::default()
        }
    }

    pub(crate) fn transfer(from: u8, to: u8, value: u64) -> Transfer {
        Transfer {
            from: address(from),
            to: address(to),
            value: U256::from(value),
        }
    }

    fn topic_of(address: Address) -> H256 {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&address.0);
        H256(topic)
    }
}
