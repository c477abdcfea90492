//! Radix mocknet client
//!
//! Talks to a local Radix-style validator's core HTTP API: network status,
//! transaction submission, status polling, receipts, and account state. All
//! smoke-test operations (seeding, transfers, router deposits, balance
//! checks) go through here, each one a manifest built locally, notarized,
//! and pushed through the shared submit-and-poll loop.

pub mod deploy;
pub mod intent;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::aliases::{self, AliasBook};
use crate::chain::Chain;
use crate::submit::{
    submit_and_await, SubmitError, TransactionIntent, TransactionNode, TxStatus,
};
use self::intent::{notarize, Manifest, ManifestBuilder, NotaryKey, TransactionHeader};

/// Decimals of the protocol's base units. Chain amounts are truncated to
/// this precision when reported.
const PROTOCOL_DECIMALS: u32 = 8;

/// Hardcoded mocknet account keys, in alias order. Throwaway fixtures for a
/// local network only.
pub const MOCKNET_KEYS: &[(&str, &str)] = &[
    (
        "MASTER",
        "ee9cb7d5076ad1578de8e5d160dee794b61dcf03ef31233cc7cecaf7454eeadb",
    ),
    (
        "CONTRIB",
        "099fbf134e23ac176ac3e34e0c88578e0354dd403aa937e88f059fa0560d0425",
    ),
    (
        "USER-1",
        "22e05c2479608958020c9da290f24daf9ad72c4927fa88f1da5c19d64a50efc8",
    ),
    (
        "PROVIDER-1",
        "76736c78f64e84131218944e6f7ea06d4ec84a2caf363b215a6c951a98bcf41c",
    ),
    (
        "PROVIDER-2",
        "39e78bb8c6274e1f07a03668af0fc14160bb7829be034cd6033f61bb34fe6fce",
    ),
];

/// Radix client configuration.
#[derive(Debug, Clone)]
pub struct RadixConfig {
    /// Core API base URL.
    pub base_url: String,
    /// Logical network name sent with every request.
    pub network: String,
    /// Network id baked into transaction headers.
    pub network_id: u8,
    /// Native token resource address on this network.
    pub xrd_resource: String,
    /// Faucet component paying every transaction fee.
    pub faucet: String,
}

impl RadixConfig {
    /// Configuration for the docker mocknet validator.
    pub fn localnet(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            network: "localnet".to_string(),
            network_id: 0xF0,
            xrd_resource: "resource_loc1tknxrdxrdxrdxrdxrdxrdxrdxrdxrdxrdxrdxrdxrdxrdxrdxrd"
                .to_string(),
            faucet: "component_loc1faucetfaucetfaucetfaucetfaucetfaucetfaucetfauc".to_string(),
        }
    }
}

/// HTTP client for the validator's core API.
pub struct RadixClient {
    client: Client,
    config: RadixConfig,
}

impl RadixClient {
    pub fn new(config: RadixConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RadixConfig {
        &self.config
    }

    /// POST a JSON body and return the parsed JSON response. Non-success
    /// responses carry the body text in the error.
    async fn post(&self, path: &str, mut body: Value) -> Result<Value> {
        debug!("POST {}{}", self.config.base_url, path);
        body["network"] = json!(self.config.network);
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to reach node at {}", path))?;

        let status = response.status();
        let text = response.text().await.context("failed to read node response")?;
        if !status.is_success() {
            return Err(anyhow!("node returned {} for {}: {}", status, path, text));
        }
        serde_json::from_str(&text).with_context(|| format!("malformed JSON from {}", path))
    }

    /// Block until the node answers a status query, with a bounded number
    /// of one-second retries.
    pub async fn wait_for_node(&self, attempts: u32) -> Result<()> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match self.post("/status/network-status", json!({})).await {
                Ok(_) => {
                    info!("radix node ready after {} attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    debug!("node not ready (attempt {}): {}", attempt, e);
                    sleep(Duration::from_secs(1)).await;
                }
                Err(e) => return Err(e.context("radix node never became ready")),
            }
        }
        unreachable!("loop returns on last attempt")
    }

    pub async fn current_epoch(&self) -> Result<u64> {
        let response = self.post("/status/network-status", json!({})).await?;
        response
            .pointer("/current_epoch_round/epoch")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("network status missing current epoch"))
    }

    /// Vaults held by an account, as reported by the state endpoint.
    pub async fn account_vaults(&self, address: &str) -> Result<Vec<Value>> {
        let response = self
            .post("/state/account", json!({ "account_address": address }))
            .await?;
        Ok(response
            .get("vaults")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Read-only component method call via transaction preview.
    pub async fn call_preview(&self, component: &str, method: &str, arguments: Value) -> Result<Value> {
        self.post(
            "/transaction/call-preview",
            json!({
                "target": {
                    "type": "Method",
                    "component_address": component,
                    "method_name": method,
                },
                "arguments": arguments,
            }),
        )
        .await
    }
}

#[async_trait]
impl TransactionNode for RadixClient {
    async fn submit(&self, intent: &TransactionIntent) -> Result<String, SubmitError> {
        let id = intent
            .intent_hash()
            .ok_or_else(|| SubmitError::Rejected {
                reason: "radix intent missing intent hash".to_string(),
            })?
            .to_string();
        self.post(
            "/transaction/submit",
            json!({ "notarized_transaction_hex": intent.payload() }),
        )
        .await
        .map_err(|e| SubmitError::Rejected {
            reason: e.to_string(),
        })?;
        Ok(id)
    }

    async fn status(&self, id: &str) -> Result<TxStatus, SubmitError> {
        let response = self
            .post("/transaction/status", json!({ "intent_hash": id }))
            .await?;
        let status = response
            .pointer("/known_payloads/0/status")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("status response missing known payload status"))?;
        Ok(TxStatus::from_report(status))
    }

    async fn receipt(&self, id: &str) -> Result<Value, SubmitError> {
        let response = self
            .post("/transaction/receipt", json!({ "intent_hash": id }))
            .await?;
        response
            .pointer("/committed/receipt")
            .cloned()
            .ok_or_else(|| anyhow!("receipt response missing committed receipt").into())
    }
}

/// Explicit per-session submission state. The nonce is incremented before
/// every submission so no two intents in a session collide.
#[derive(Debug)]
pub struct RadixSession {
    next_nonce: u32,
}

impl RadixSession {
    pub fn new() -> Self {
        Self { next_nonce: 1 }
    }

    pub fn next_nonce(&mut self) -> u32 {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        nonce
    }
}

impl Default for RadixSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a chain decimal string (up to 18 fractional digits) to protocol
/// base units, truncating the precision the protocol does not track.
pub fn decimal_to_base_units(dec: &str) -> Result<u128> {
    let mut parts = dec.splitn(2, '.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next().unwrap_or("");
    if frac_part.len() > 18 {
        return Err(anyhow!("more than 18 fractional digits: {}", dec));
    }
    let combined = format!("{}{:0<18}", if int_part.is_empty() { "0" } else { int_part }, frac_part);
    let chain_units: u128 = combined
        .parse()
        .with_context(|| format!("invalid decimal amount: {}", dec))?;
    Ok(chain_units / 10u128.pow(18 - PROTOCOL_DECIMALS))
}

/// Inverse of [`decimal_to_base_units`]: protocol base units to the chain's
/// 18-decimal string form.
pub fn base_units_to_decimal(units: u128) -> String {
    let chain_units = units * 10u128.pow(18 - PROTOCOL_DECIMALS);
    let digits = format!("{:0>19}", chain_units);
    let (int_part, frac_part) = digits.split_at(digits.len() - 18);
    format!("{}.{}", int_part, frac_part)
}

/// The full smoke-test surface for the Radix chain: fixed mocknet accounts,
/// a session nonce, and the router component under test.
pub struct RadixChain {
    client: RadixClient,
    session: RadixSession,
    notaries: HashMap<String, NotaryKey>,
    book: AliasBook,
    router_address: String,
    test_resource: Option<String>,
    poll_interval: Duration,
    timeout: Duration,
}

impl RadixChain {
    /// Connect to the node, wait for readiness, and load the mocknet
    /// accounts.
    pub async fn connect(
        config: RadixConfig,
        router_address: String,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = RadixClient::new(config)?;
        client.wait_for_node(30).await?;

        let mut notaries = HashMap::new();
        for (alias, key_hex) in MOCKNET_KEYS {
            let address = aliases::address_of(Chain::Xrd, alias)
                .ok_or_else(|| anyhow!("no XRD address for alias {}", alias))?;
            notaries.insert(address.to_string(), NotaryKey::from_hex(key_hex)?);
        }

        Ok(Self {
            client,
            session: RadixSession::new(),
            notaries,
            book: AliasBook::new(),
            router_address,
            test_resource: None,
            poll_interval,
            timeout,
        })
    }

    pub fn set_vault_address(&mut self, address: String) {
        self.book.set_vault(Chain::Xrd, address);
    }

    /// Reuse a test resource created by an earlier invocation.
    pub fn set_test_resource(&mut self, address: String) {
        self.test_resource = Some(address);
    }

    pub fn test_resource(&self) -> Option<&str> {
        self.test_resource.as_deref()
    }

    fn resolve(&self, alias_or_addr: &str) -> String {
        self.book.resolve(Chain::Xrd, alias_or_addr)
    }

    fn notary_for(&self, address: &str) -> Result<&NotaryKey> {
        self.notaries
            .get(address)
            .ok_or_else(|| anyhow!("no mocknet key for address {}", address))
    }

    /// Resource address for a symbol: the native token or the session's
    /// test resource.
    fn resource_for(&self, symbol: &str) -> Result<String> {
        if symbol == "XRD" {
            Ok(self.client.config().xrd_resource.clone())
        } else {
            self.test_resource
                .clone()
                .ok_or_else(|| anyhow!("test resource not created yet"))
        }
    }

    /// Notarize and submit a manifest, polling until it commits. Returns
    /// the receipt.
    async fn submit_manifest(&mut self, manifest: Manifest, signer: &str) -> Result<Value> {
        let epoch = self.client.current_epoch().await?;
        let header = TransactionHeader {
            network_id: self.client.config().network_id,
            start_epoch_inclusive: epoch,
            end_epoch_exclusive: epoch + 1000,
            nonce: self.session.next_nonce(),
            notary_is_signatory: true,
            tip_percentage: 0,
        };
        let notary = self.notary_for(signer)?;
        let intent = notarize(&header, &manifest, notary)?;
        let receipt = submit_and_await(&self.client, &intent, self.poll_interval, self.timeout)
            .await
            .context("radix transaction did not commit")?;
        Ok(receipt)
    }

    /// Fill the master account from the faucet.
    pub async fn seed_master(&mut self) -> Result<()> {
        let master = self.resolve("MASTER");
        let faucet = self.client.config().faucet.clone();
        let xrd = self.client.config().xrd_resource.clone();
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee(&faucet)
            .faucet_free_xrd(&faucet)
            .take_all_from_worktop(&xrd, "bucket")
            .account_deposit_bucket(&master, "bucket")
            .build();
        self.submit_manifest(manifest, &master).await?;
        info!("seeded master account {}", master);
        Ok(())
    }

    /// Create the fungible test resource and mint its supply to the master
    /// account. The new resource address is taken from the receipt.
    pub async fn create_test_resource(&mut self) -> Result<String> {
        let master = self.resolve("MASTER");
        let faucet = self.client.config().faucet.clone();
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee(&faucet)
            .create_fungible_resource(10, "100000")
            .account_deposit_entire_worktop(&master)
            .build();
        let receipt = self.submit_manifest(manifest, &master).await?;
        let address = new_entity_address(&receipt)?;
        info!("created test resource {}", address);
        self.test_resource = Some(address.clone());
        Ok(address)
    }

    /// Plain token transfer between two (possibly aliased) accounts.
    /// Amount is in protocol base units.
    pub async fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: u128,
        symbol: &str,
    ) -> Result<Value> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        let resource = self.resource_for(symbol)?;
        let faucet = self.client.config().faucet.clone();
        let amount_dec = base_units_to_decimal(amount);

        let manifest = ManifestBuilder::new()
            .faucet_lock_fee(&faucet)
            .account_withdraw(&from, &resource, &amount_dec)
            .take_all_from_worktop(&resource, "bucket")
            .account_deposit_bucket(&to, "bucket")
            .build();
        self.submit_manifest(manifest, &from).await
    }

    /// Deposit into the router's vault with a protocol memo. Aliases inside
    /// the memo are resolved to protocol-chain addresses before submission.
    pub async fn deposit_to_router(
        &mut self,
        from: &str,
        amount: u128,
        symbol: &str,
        memo: &str,
    ) -> Result<Value> {
        let from = self.resolve(from);
        let vault = self
            .book
            .address_of(Chain::Xrd, "VAULT")
            .ok_or_else(|| anyhow!("vault address not set for this session"))?
            .to_string();
        let resource = self.resource_for(symbol)?;
        let faucet = self.client.config().faucet.clone();
        let amount_dec = base_units_to_decimal(amount);
        let memo = aliases::resolve_memo(Chain::Maya, memo);

        let manifest = ManifestBuilder::new()
            .faucet_lock_fee(&faucet)
            .account_withdraw(&from, &resource, &amount_dec)
            .take_all_from_worktop(&resource, "bucket")
            .router_user_deposit(&self.router_address, &from, &vault, "bucket", &memo)
            .build();
        self.submit_manifest(manifest, &from).await
    }

    /// Balance of an account (or the vault) in protocol base units.
    pub async fn balance(&self, alias_or_addr: &str, symbol: &str) -> Result<u128> {
        if is_vault(&self.book, alias_or_addr) {
            return self.vault_balance(symbol).await;
        }
        let address = self.resolve(alias_or_addr);
        let resource = self.resource_for(symbol)?;
        let vaults = self.client.account_vaults(&address).await?;
        let amount = vaults
            .iter()
            .find(|v| {
                v.pointer("/resource_amount/resource_address")
                    .and_then(Value::as_str)
                    == Some(resource.as_str())
            })
            .and_then(|v| v.pointer("/resource_amount/amount"))
            .and_then(Value::as_str);
        match amount {
            Some(dec) => decimal_to_base_units(dec),
            None => Ok(0),
        }
    }

    /// Router-tracked vault balance via read-only call preview.
    pub async fn vault_balance(&self, symbol: &str) -> Result<u128> {
        let vault = self
            .book
            .address_of(Chain::Xrd, "VAULT")
            .ok_or_else(|| anyhow!("vault address not set for this session"))?;
        let resource = self.resource_for(symbol)?;
        let response = self
            .client
            .call_preview(
                &self.router_address,
                "get_vault_balance",
                json!([vault, resource]),
            )
            .await?;
        let dec = response
            .pointer("/output/programmatic_json/value")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("call preview output missing balance value"))?;
        decimal_to_base_units(dec)
    }
}

/// True when a balance query targets the session vault, by alias or by its
/// resolved address.
fn is_vault(book: &AliasBook, target: &str) -> bool {
    target == "VAULT" || book.address_of(Chain::Xrd, "VAULT") == Some(target)
}

/// First newly created global entity in a committed receipt. Deployments
/// read their package/component/resource addresses from here.
pub fn new_entity_address(receipt: &Value) -> Result<String> {
    receipt
        .pointer("/state_updates/new_global_entities/0/entity_address")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("receipt has no new global entities"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_nonces_strictly_increase() {
        let mut session = RadixSession::new();
        let nonces: Vec<u32> = (0..5).map(|_| session.next_nonce()).collect();
        for pair in nonces.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_eq!(nonces, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decimal_to_base_units() {
        assert_eq!(decimal_to_base_units("1").unwrap(), 100_000_000);
        assert_eq!(decimal_to_base_units("1.5").unwrap(), 150_000_000);
        assert_eq!(decimal_to_base_units("0.00000001").unwrap(), 1);
        // precision below the protocol's 8 decimals truncates
        assert_eq!(decimal_to_base_units("0.000000000000000001").unwrap(), 0);
        assert!(decimal_to_base_units("1.0000000000000000001").is_err());
        assert!(decimal_to_base_units("not-a-number").is_err());
    }

    #[test]
    fn test_base_units_to_decimal() {
        assert_eq!(base_units_to_decimal(150_000_000), "1.500000000000000000");
        assert_eq!(base_units_to_decimal(0), "0.000000000000000000");
        assert_eq!(base_units_to_decimal(1), "0.000000010000000000");
    }

    #[test]
    fn test_decimal_round_trip() {
        for units in [0u128, 1, 42, 100_000_000, 62_942_468, 5_000_000_000_000] {
            let dec = base_units_to_decimal(units);
            assert_eq!(decimal_to_base_units(&dec).unwrap(), units);
        }
    }

    #[test]
    fn test_vault_queries_match_alias_and_resolved_address() {
        let mut book = AliasBook::new();
        assert!(is_vault(&book, "VAULT"));
        assert!(!is_vault(&book, "account_loc1vaultvaultvault"));

        book.set_vault(Chain::Xrd, "account_loc1vaultvaultvault".to_string());
        assert!(is_vault(&book, "account_loc1vaultvaultvault"));
        assert!(is_vault(&book, "VAULT"));
        assert!(!is_vault(&book, "account_loc1somebodyelse"));
    }

    #[test]
    fn test_new_entity_address() {
        let receipt = json!({
            "state_updates": {
                "new_global_entities": [
                    { "entity_address": "resource_loc1newnewnew" }
                ]
            }
        });
        assert_eq!(new_entity_address(&receipt).unwrap(), "resource_loc1newnewnew");
        assert!(new_entity_address(&json!({})).is_err());
    }
}
