//! Router package deployment for the Radix mocknet
//!
//! Publishes the router package from its compiled artifacts and
//! instantiates the router and the no-op aggregator components, printing
//! each new entity address for the mocknet wiring to pick up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use super::intent::{notarize, Manifest, ManifestBuilder, NotaryKey, TransactionHeader};
use super::{new_entity_address, RadixClient, RadixSession};
use crate::submit::submit_and_await;

/// Blueprint names inside the published router package.
const ROUTER_BLUEPRINT: &str = "LiquidityRouter";
const AGGREGATOR_BLUEPRINT: &str = "NoOpAggregator";

/// Deploys the router package and its components. The notary key is one of
/// the throwaway mocknet keys; which one does not matter since the faucet
/// pays all fees.
pub struct RouterDeployer {
    client: RadixClient,
    session: RadixSession,
    notary: NotaryKey,
    wasm_path: PathBuf,
    rpd_path: PathBuf,
    poll_interval: Duration,
    timeout: Duration,
}

/// Addresses created by a full deployment run.
#[derive(Debug)]
pub struct DeployedRouter {
    pub package_address: String,
    pub router_address: String,
    pub aggregator_address: String,
}

impl RouterDeployer {
    pub fn new(
        client: RadixClient,
        notary: NotaryKey,
        wasm_path: PathBuf,
        rpd_path: PathBuf,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            session: RadixSession::new(),
            notary,
            wasm_path,
            rpd_path,
            poll_interval,
            timeout,
        }
    }

    /// Publish the package and instantiate both components.
    pub async fn run(&mut self) -> Result<DeployedRouter> {
        self.client.wait_for_node(30).await?;

        let package_address = self.publish_package().await?;
        println!("Package address {}", package_address);

        let router_address = self.instantiate(&package_address, ROUTER_BLUEPRINT).await?;
        println!("Router component address {}", router_address);

        let aggregator_address = self
            .instantiate(&package_address, AGGREGATOR_BLUEPRINT)
            .await?;
        println!("Aggregator component address {}", aggregator_address);

        Ok(DeployedRouter {
            package_address,
            router_address,
            aggregator_address,
        })
    }

    /// Publish the package from its code and schema files, read once.
    async fn publish_package(&mut self) -> Result<String> {
        let wasm = read_artifact(&self.wasm_path)?;
        let rpd = read_artifact(&self.rpd_path)?;
        info!(
            "publishing package ({} byte wasm, {} byte schema)",
            wasm.len(),
            rpd.len()
        );

        let faucet = self.client.config().faucet.clone();
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee(&faucet)
            .publish_package(wasm, rpd)
            .build();
        let receipt = self.submit(manifest).await?;
        new_entity_address(&receipt)
    }

    /// Instantiate a blueprint from the published package.
    async fn instantiate(&mut self, package_address: &str, blueprint: &str) -> Result<String> {
        let faucet = self.client.config().faucet.clone();
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee(&faucet)
            .call_function(package_address, blueprint, "instantiate")
            .build();
        let receipt = self.submit(manifest).await?;
        new_entity_address(&receipt)
    }

    async fn submit(&mut self, manifest: Manifest) -> Result<serde_json::Value> {
        let epoch = self.client.current_epoch().await?;
        let header = TransactionHeader {
            network_id: self.client.config().network_id,
            start_epoch_inclusive: epoch,
            end_epoch_exclusive: epoch + 1000,
            nonce: self.session.next_nonce(),
            notary_is_signatory: true,
            tip_percentage: 0,
        };
        let intent = notarize(&header, &manifest, &self.notary)?;
        let receipt = submit_and_await(&self.client, &intent, self.poll_interval, self.timeout)
            .await
            .context("deployment transaction did not commit")?;
        Ok(receipt)
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read artifact {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\0asm").unwrap();
        let bytes = read_artifact(file.path()).unwrap();
        assert_eq!(bytes, b"\0asm");

        assert!(read_artifact(Path::new("/nonexistent/router.wasm")).is_err());
    }
}
