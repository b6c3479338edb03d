use async_trait::async_trait;
use ethbind_core::{
    error,
    linking::{library_fingerprint, link, scan, Libraries},
    types::Address,
    Error, Result, WithContext,
};

/// Sends contract creation transactions.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Deployer {
    /// Deploys `code` (creation code followed by any encoded constructor
    /// arguments) and returns the address of the new contract.
    async fn deploy(&self, code: Vec<u8>) -> Result<Address>;
}

/// Unlinked creation code of a library that has to be deployed before the
/// contracts using it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryArtifact {
    /// Fully qualified name, e.g. `contracts/Math.sol:Math`.
    pub name: String,
    pub fingerprint: String,
    pub bytecode: String,
}

impl LibraryArtifact {
    /// The fingerprint is derived from `name`.
    pub fn new(name: impl Into<String>, bytecode: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fingerprint: library_fingerprint(&name),
            name,
            bytecode: bytecode.into(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into().to_ascii_lowercase();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    /// Addresses of the deployed libraries, in deployment order.
    pub libraries: Vec<(String, Address)>,
}

/// Deploys `libraries` in the given order, each linked against the ones before
/// it, then deploys `bytecode` linked against all of them with
/// `constructor_args` appended.
///
/// `libraries` must already be in dependency order, as listed by the binding's
/// library deploy order. Every placeholder is checked before anything is sent,
/// so a missing or misordered library fails without deploying anything.
pub async fn deploy_with_libraries<D>(
    deployer: &D,
    libraries: &[LibraryArtifact],
    bytecode: &str,
    constructor_args: &[u8],
) -> Result<Deployment>
where
    D: Deployer + ?Sized,
{
    check_link_order(libraries, bytecode)?;

    let mut linked = Libraries::new();
    let mut deployed = Vec::with_capacity(libraries.len());
    for library in libraries {
        let code = decode_code(&link(&library.bytecode, &linked)?)?;
        let address = deployer
            .deploy(code)
            .await
            .with_context(|| format!("deploying library `{}`", library.name))?;
        tracing::debug!(library = %library.name, %address, "deployed library");

        linked.insert_fingerprint(&library.fingerprint, address);
        deployed.push((library.name.clone(), address));
    }

    let mut code = decode_code(&link(bytecode, &linked)?)?;
    code.extend_from_slice(constructor_args);
    let address = deployer.deploy(code).await?;
    tracing::debug!(%address, libraries = deployed.len(), "deployed contract");

    Ok(Deployment {
        address,
        libraries: deployed,
    })
}

fn check_link_order(libraries: &[LibraryArtifact], bytecode: &str) -> Result<()> {
    let codes = libraries
        .iter()
        .map(|library| (Some(library), library.bytecode.as_str()))
        .chain([(None, bytecode)]);

    for (position, (library, code)) in codes.enumerate() {
        let available = &libraries[..position];
        let missing = scan(code)?.into_iter().find(|placeholder| {
            !available
                .iter()
                .any(|artifact| artifact.fingerprint == placeholder.fingerprint)
        });

        if let Some(placeholder) = missing {
            let err = Error::UnresolvedLibraryPlaceholder {
                fingerprint: placeholder.fingerprint,
                offset: placeholder.offsets[0],
            };
            return Err(match library {
                Some(library) => err.context(format!("library `{}`", library.name)),
                None => err,
            });
        }
    }

    Ok(())
}

fn decode_code(linked: &str) -> Result<Vec<u8>> {
    let code = linked.trim();
    let code = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
        .unwrap_or(code);

    hex::decode(code).map_err(|err| error!(InvalidBytecode, "{err}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ethbind_core::linking::placeholder;
    use pretty_assertions::assert_eq;

    use super::*;

    const MATH: &str = "contracts/Math.sol:Math";
    const STRINGS: &str = "contracts/Strings.sol:Strings";

    #[derive(Default)]
    struct RecordingDeployer {
        deployed: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingDeployer {
        fn deployed(&self) -> Vec<Vec<u8>> {
            self.deployed.lock().expect("not poisoned").clone()
        }
    }

    #[async_trait]
    impl Deployer for RecordingDeployer {
        async fn deploy(&self, code: Vec<u8>) -> Result<Address> {
            let mut deployed = self.deployed.lock().expect("not poisoned");
            deployed.push(code);
            Ok(Address([deployed.len() as u8; 20]))
        }
    }

    fn linked_against(library: &str) -> String {
        format!("0x60{}00", placeholder(&library_fingerprint(library)))
    }

    fn code_with_address(byte: u8) -> Vec<u8> {
        let mut code = vec![0x60];
        code.extend([byte; 20]);
        code.push(0x00);
        code
    }

    #[tokio::test]
    async fn libraries_are_deployed_first_and_linked() -> Result<()> {
        let deployer = RecordingDeployer::default();
        let libraries = [
            LibraryArtifact::new(MATH, "0x6001"),
            LibraryArtifact::new(STRINGS, linked_against(MATH)),
        ];

        let deployment =
            deploy_with_libraries(&deployer, &libraries, &linked_against(STRINGS), &[0xaa, 0xbb])
                .await?;

        let mut contract_code = code_with_address(2);
        contract_code.extend([0xaa, 0xbb]);
        assert_eq!(
            deployer.deployed(),
            vec![vec![0x60, 0x01], code_with_address(1), contract_code]
        );
        assert_eq!(
            deployment,
            Deployment {
                address: Address([3; 20]),
                libraries: vec![
                    (MATH.to_string(), Address([1; 20])),
                    (STRINGS.to_string(), Address([2; 20])),
                ],
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn explicit_fingerprints_are_honoured() -> Result<()> {
        let deployer = RecordingDeployer::default();
        let fingerprint = "0123456789abcdef0123456789abcdef01";
        let libraries = [LibraryArtifact::new("Math", "0x6001").with_fingerprint(fingerprint)];

        deploy_with_libraries(
            &deployer,
            &libraries,
            &format!("0x60{}00", placeholder(fingerprint)),
            &[],
        )
        .await?;

        assert_eq!(deployer.deployed()[1], code_with_address(1));

        Ok(())
    }

    #[tokio::test]
    async fn misordered_libraries_fail_before_deploying() {
        let deployer = RecordingDeployer::default();
        let libraries = [
            LibraryArtifact::new(STRINGS, linked_against(MATH)),
            LibraryArtifact::new(MATH, "0x6001"),
        ];

        let err = deploy_with_libraries(&deployer, &libraries, "0x6001", &[])
            .await
            .expect_err("should have failed");

        assert!(
            matches!(err.root_cause(), Error::UnresolvedLibraryPlaceholder { offset: 1, .. }),
            "got {err:?}"
        );
        assert!(deployer.deployed().is_empty());
    }

    #[tokio::test]
    async fn missing_library_fails_before_deploying() {
        let deployer = RecordingDeployer::default();

        let err = deploy_with_libraries(&deployer, &[], &linked_against(MATH), &[])
            .await
            .expect_err("should have failed");

        let expected_fingerprint = library_fingerprint(MATH);
        assert!(
            matches!(
                &err,
                Error::UnresolvedLibraryPlaceholder { fingerprint, .. } if *fingerprint == expected_fingerprint
            ),
            "got {err:?}"
        );
        assert!(deployer.deployed().is_empty());
    }

    #[tokio::test]
    async fn unlinked_contract_is_deployed_as_is() -> Result<()> {
        let deployer = RecordingDeployer::default();

        let deployment = deploy_with_libraries(&deployer, &[], "6080604052", &[]).await?;

        assert_eq!(deployer.deployed(), vec![vec![0x60, 0x80, 0x60, 0x40, 0x52]]);
        assert!(deployment.libraries.is_empty());

        Ok(())
    }
}
