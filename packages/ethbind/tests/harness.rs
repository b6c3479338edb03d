use std::sync::Mutex;

use async_trait::async_trait;
use ethbind::{
    core::{
        linking::{library_fingerprint, placeholder},
        utils::event_topic,
    },
    prelude::*,
};
use pretty_assertions::assert_eq;

const MATH: &str = "contracts/Math.sol:Math";

const TOKEN_ABI: &str = r#"[
    {"type": "constructor", "stateMutability": "nonpayable",
     "inputs": [{"name": "supply", "type": "uint256"}]},
    {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
        {"name": "from", "type": "address", "indexed": true},
        {"name": "to", "type": "address", "indexed": true},
        {"name": "value", "type": "uint256", "indexed": false}
    ]}
]"#;

fn token_bytecode() -> String {
    format!("0x6080{}00", placeholder(&library_fingerprint(MATH)))
}

fn generate() -> Result<Bindings> {
    let target = AbigenTarget::new("Token", TOKEN_ABI).with_bytecode(token_bytecode());
    let options = BindgenOptions::default().with_library(MATH, "");

    Abigen::generate(vec![target], &options)
}

/// What the bindings of `Token` declare for its `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transfer {
    from: Address,
    to: Address,
    value: U256,
}

impl DecodeLog for Transfer {
    fn topic0() -> Option<H256> {
        Some(event_topic("Transfer(address,address,uint256)"))
    }

    fn decode_log(log: &RawLog) -> Result<Self> {
        if log.data.len() != 32 {
            return Err(Error::Decode(format!(
                "expected 32 bytes of data, got {}",
                log.data.len()
            )));
        }

        Ok(Self {
            from: Address::from_topic(&log.topic(1)?),
            to: Address::from_topic(&log.topic(2)?),
            value: U256::from_big_endian(&log.data),
        })
    }
}

fn transfer_log(from: Address, to: Address, value: u64) -> RawLog {
    let mut data = vec![0; 24];
    data.extend(value.to_be_bytes());

    RawLog {
        topics: vec![
            Transfer::topic0().expect("not anonymous"),
            from.into_topic(),
            to.into_topic(),
        ],
        data,
        ..RawLog::default()
    }
}

#[test]
fn event_topic_of_the_bindings_selects_the_logs() -> Result<()> {
    let bindings = generate()?;
    let transfer = bindings
        .contract("Token")
        .and_then(|contract| contract.event("Transfer"))
        .expect("event is generated");
    assert_eq!(transfer.topic0, Transfer::topic0());

    let alice = Address([0xa1; 20]);
    let bob = Address([0xb0; 20]);
    let query = LogQuery::for_event::<Transfer>()?.topic(1, [alice])?;
    let logs = [transfer_log(alice, bob, 5), transfer_log(bob, alice, 7)]
        .into_iter()
        .filter(|log| query.matches(log))
        .map(Ok)
        .collect::<Vec<_>>();

    let events = LogIterator::<Transfer>::new(logs)
        .map(|decoded| decoded.map(|decoded| decoded.event))
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(
        events,
        vec![Transfer {
            from: alice,
            to: bob,
            value: U256::from(5u64),
        }]
    );

    Ok(())
}

#[derive(Default)]
struct RecordingDeployer {
    deployed: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Deployer for RecordingDeployer {
    async fn deploy(&self, code: Vec<u8>) -> Result<Address> {
        let mut deployed = self.deployed.lock().expect("not poisoned");
        deployed.push(code);
        Ok(Address([deployed.len() as u8; 20]))
    }
}

#[tokio::test]
async fn contract_is_deployed_after_its_libraries() -> Result<()> {
    let bindings = generate()?;
    let token = bindings.contract("Token").expect("contract is generated");
    assert!(token.requires_linking());
    assert_eq!(token.library_deploy_order, vec![MATH.to_string()]);

    let libraries = token
        .library_deploy_order
        .iter()
        .map(|name| LibraryArtifact::new(name.as_str(), "0x6001"))
        .collect::<Vec<_>>();
    let bytecode = token.bytecode.as_deref().expect("bytecode is given");
    let deployer = RecordingDeployer::default();

    let deployment = deploy_with_libraries(&deployer, &libraries, bytecode, &[]).await?;

    let mut expected_code = vec![0x60, 0x80];
    expected_code.extend([1; 20]);
    expected_code.push(0x00);
    let deployed = deployer.deployed.lock().expect("not poisoned").clone();
    assert_eq!(deployed, vec![vec![0x60, 0x01], expected_code]);
    assert_eq!(deployment.address, Address([2; 20]));

    Ok(())
}
