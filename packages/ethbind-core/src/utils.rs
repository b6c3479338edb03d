use tiny_keccak::{Hasher, Keccak};

use crate::types::{Selector, H256};

pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data.as_ref());

    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// First four bytes of the keccak-256 hash of a canonical signature, e.g. `transfer(address,uint256)`.
pub fn selector_of(signature: &str) -> Selector {
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&keccak256(signature)[..4]);
    selector
}

/// The topic0 an event with the given canonical signature is logged under.
pub fn event_topic(signature: &str) -> H256 {
    H256(keccak256(signature))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn known_function_selectors() {
        assert_eq!(
            hex::encode(selector_of("transfer(address,uint256)")),
            "a9059cbb"
        );
        assert_eq!(hex::encode(selector_of("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn known_event_topic() {
        assert_eq!(
            event_topic("Transfer(address,address,uint256)").to_hex_string(),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }
}
