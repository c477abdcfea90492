//! EVM mocknet setup and smoke-test actions
//!
//! Deploys the router, token, and dex contracts on a local EVM chain and
//! provides the deposit/balance convenience actions the smoke tests drive.
//! Vault and router addresses for an already-wired chain are discovered
//! from the protocol node's inbound-addresses endpoint.

use std::path::PathBuf;
use std::time::Duration;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::U256;
use anyhow::{anyhow, Context, Result};
use log::info;
use serde_json::{json, Value};

use super::artifacts::{parse_address, ContractArtifact};
use super::{calculate_gas, EvmClient};
use crate::chain::Chain;
use crate::submit::{submit_and_await, TransactionIntent};

/// Funding amount for the admin and simulation accounts: 1000 native units.
const SEED_WEI: u128 = 1_000_000_000_000_000_000_000;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
/// Simulation master account funded on every chain at startup.
pub const SIMULATION_MASTER: &str = "0xEE4eaA642b992412F628fF4Cec1C96cf2Fd0eA4D";
/// Mainnet ERC-20 RUNE address; the ETH router constructor wants one and
/// the value does not matter on a mocknet.
pub const ERC20_RUNE: &str = "0x3155BA85D5F96b2d030a4966AF206230e46849cb";

/// Far-future deadline passed to aggregator swaps.
const SWAP_DEADLINE: u64 = 9_999_999_999;

/// EVM deployment and smoke-test driver for one chain.
pub struct EvmSetup {
    client: EvmClient,
    chain: Chain,
    /// Admin account address, unlocked on the dev node.
    admin: String,
    artifacts_dir: PathBuf,
    /// Protocol node REST URL for inbound-address discovery.
    protocol_api_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

/// Addresses created by a full deployment run.
#[derive(Debug)]
pub struct DeployedContracts {
    pub token_address: Option<String>,
    pub router_address: String,
    pub dex_address: String,
}

impl EvmSetup {
    /// Connect to the chain's node, wait for readiness, and fund the admin
    /// and simulation accounts from the coinbase where needed.
    pub async fn connect(
        client: EvmClient,
        chain: Chain,
        admin: String,
        artifacts_dir: PathBuf,
        protocol_api_url: String,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        client.wait_for_node(30).await?;
        let setup = Self {
            client,
            chain,
            admin,
            artifacts_dir,
            protocol_api_url,
            poll_interval,
            timeout,
        };

        // geth creates a random first account on ARB, so skip seeding there
        if chain != Chain::Arb {
            let coinbase = setup
                .client
                .accounts()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("node has no unlocked accounts"))?;
            setup
                .fund_account(&coinbase, SIMULATION_MASTER, SEED_WEI)
                .await?;
            if setup.client.get_balance(&setup.admin).await? == 0 {
                let admin = setup.admin.clone();
                setup.fund_account(&coinbase, &admin, SEED_WEI).await?;
            }
        }
        let balance = setup.client.get_balance(&setup.admin).await?;
        info!("{} admin {} balance: {}", chain, setup.admin, balance);
        Ok(setup)
    }

    /// Native asset identifier for deposit memos.
    pub fn gas_asset(&self) -> String {
        match self.chain {
            Chain::Eth => "ETH.ETH".to_string(),
            Chain::Arb => "ARB.ETH".to_string(),
            Chain::Avax => "AVAX.AVAX".to_string(),
            other => format!("{}.{}", other, other),
        }
    }

    /// Send a plain value transfer and wait for it to be mined.
    pub async fn fund_account(&self, from: &str, to: &str, amount: u128) -> Result<Value> {
        info!("funding account: {} -> {} {}", from, to, amount);
        let tx = json!({
            "from": from,
            "to": to,
            "value": format!("0x{:x}", amount),
            "gas": format!("0x{:x}", calculate_gas("")),
        });
        self.send_and_await(&tx).await
    }

    /// Deploy token (skipped on ARB, which has no test token), router, and
    /// dex contracts.
    pub async fn deploy_init_contracts(&self) -> Result<DeployedContracts> {
        let token_address = if self.chain != Chain::Arb {
            info!("deploying token contract...");
            let address = self.deploy_contract(&self.token_artifact()?, &[]).await?;
            println!("Token Contract Address: {}", address);
            Some(address)
        } else {
            None
        };

        info!("deploying router contract...");
        let (router, args) = self.router_artifact()?;
        let router_address = self.deploy_contract(&router, &args).await?;
        println!("Router Contract Address: {}", router_address);

        info!("deploying dex contract...");
        let dex_address = self.deploy_contract(&self.dex_artifact()?, &[]).await?;
        println!("Dex Contract Address: {}", dex_address);

        Ok(DeployedContracts {
            token_address,
            router_address,
            dex_address,
        })
    }

    /// Deposit the gas asset into the router with a memo.
    pub async fn deposit(&self, amount: u128, memo: &str) -> Result<Value> {
        let (vault, router_address) = self.inbound_addresses().await?;
        let router = self.router_artifact()?.0;
        let data = router.call_data(
            "deposit",
            &[
                DynSolValue::Address(parse_address(&vault)?),
                DynSolValue::Address(parse_address(ZERO_ADDRESS)?),
                DynSolValue::Uint(U256::ZERO, 256),
                DynSolValue::String(memo.to_string()),
            ],
        )?;
        let tx = json!({
            "from": self.admin,
            "to": router_address,
            "value": format!("0x{:x}", amount),
            "data": data,
        });
        let receipt = self.send_and_await(&tx).await?;
        println!("Deposit Receipt: {}", receipt);
        Ok(receipt)
    }

    /// Approve the router to spend a token, then deposit it with a memo.
    pub async fn deposit_token(&self, token_address: &str, amount: u128, memo: &str) -> Result<Value> {
        let (vault, router_address) = self.inbound_addresses().await?;
        let token = self.token_artifact()?;
        let router = self.router_artifact()?.0;

        let approve_data = token.call_data(
            "approve",
            &[
                DynSolValue::Address(parse_address(&router_address)?),
                DynSolValue::Uint(U256::from(amount), 256),
            ],
        )?;
        let approve_tx = json!({
            "from": self.admin,
            "to": token_address,
            "data": approve_data,
        });
        let approve_receipt = self.send_and_await(&approve_tx).await?;
        println!("Approve Receipt: {}", approve_receipt);

        let deposit_data = router.call_data(
            "deposit",
            &[
                DynSolValue::Address(parse_address(&vault)?),
                DynSolValue::Address(parse_address(token_address)?),
                DynSolValue::Uint(U256::from(amount), 256),
                DynSolValue::String(memo.to_string()),
            ],
        )?;
        let deposit_tx = json!({
            "from": self.admin,
            "to": router_address,
            "data": deposit_data,
        });
        let receipt = self.send_and_await(&deposit_tx).await?;
        println!("Deposit Receipt: {}", receipt);
        Ok(receipt)
    }

    /// Deposit the gas asset through the dex contract, which forwards the
    /// funds to the router. `with_logs` selects the variant that also emits
    /// the dex's own deposit event.
    pub async fn deposit_from_dex(
        &self,
        dex_address: &str,
        amount: u128,
        memo: &str,
        with_logs: bool,
    ) -> Result<Value> {
        let (vault, router_address) = self.inbound_addresses().await?;
        let dex = self.dex_artifact()?;
        let function = if with_logs {
            "callDepositWithLogs"
        } else {
            "callDeposit"
        };
        let data = dex.call_data(
            function,
            &[
                DynSolValue::Address(parse_address(&router_address)?),
                DynSolValue::Address(parse_address(&vault)?),
                DynSolValue::Address(parse_address(ZERO_ADDRESS)?),
                DynSolValue::Uint(U256::ZERO, 256),
                DynSolValue::String(memo.to_string()),
            ],
        )?;
        let tx = json!({
            "from": self.admin,
            "to": dex_address,
            "value": format!("0x{:x}", amount),
            "data": data,
        });
        let receipt = self.send_and_await(&tx).await?;
        println!("Deposit from DEX Receipt: {}", receipt);
        Ok(receipt)
    }

    /// Swap into the protocol through an aggregator: approve its token
    /// transfer proxy to spend, then call `swapIn` against the router and
    /// current vault.
    pub async fn swap_in(
        &self,
        aggregator_address: &str,
        token_address: &str,
        amount: u128,
        memo: &str,
    ) -> Result<Value> {
        let (vault, router_address) = self.inbound_addresses().await?;
        let aggregator = self.aggregator_artifact()?;
        let token = self.token_artifact()?;

        let proxy_query = aggregator.call_data("tokenTransferProxy", &[])?;
        let proxy_output = self
            .client
            .eth_call(aggregator_address, &proxy_query)
            .await?;
        let proxy = aggregator.decode_address("tokenTransferProxy", &proxy_output)?;

        let approve_data = token.call_data(
            "approve",
            &[
                DynSolValue::Address(proxy),
                DynSolValue::Uint(U256::from(amount), 256),
            ],
        )?;
        let approve_tx = json!({
            "from": self.admin,
            "to": token_address,
            "data": approve_data,
        });
        let approve_receipt = self.send_and_await(&approve_tx).await?;
        println!("Approve Spending Receipt: {}", approve_receipt);

        let swap_data = aggregator.call_data(
            "swapIn",
            &[
                DynSolValue::Address(parse_address(&router_address)?),
                DynSolValue::Address(parse_address(&vault)?),
                DynSolValue::String(memo.to_string()),
                DynSolValue::Address(parse_address(token_address)?),
                DynSolValue::Uint(U256::from(amount), 256),
                DynSolValue::Uint(U256::ZERO, 256),
                DynSolValue::Uint(U256::from(SWAP_DEADLINE), 256),
            ],
        )?;
        let swap_tx = json!({
            "from": self.admin,
            "to": aggregator_address,
            "data": swap_data,
        });
        let receipt = self.send_and_await(&swap_tx).await?;
        println!("Swap-In Receipt: {}", receipt);
        Ok(receipt)
    }

    /// ERC-20 balance of an address.
    pub async fn token_balance(&self, token_address: &str, address: &str) -> Result<U256> {
        let token = self.token_artifact()?;
        let data = token.call_data(
            "balanceOf",
            &[DynSolValue::Address(parse_address(address)?)],
        )?;
        let output = self.client.eth_call(token_address, &data).await?;
        token.decode_uint("balanceOf", &output)
    }

    /// Router-tracked vault allowance for a token.
    pub async fn vault_allowance(&self, token_address: &str) -> Result<U256> {
        let (vault, router_address) = self.inbound_addresses().await?;
        let router = self.router_artifact()?.0;
        let data = router.call_data(
            "vaultAllowance",
            &[
                DynSolValue::Address(parse_address(&vault)?),
                DynSolValue::Address(parse_address(token_address)?),
            ],
        )?;
        let output = self.client.eth_call(&router_address, &data).await?;
        router.decode_uint("vaultAllowance", &output)
    }

    /// Current vault and router addresses for this chain from the protocol
    /// node.
    pub async fn inbound_addresses(&self) -> Result<(String, String)> {
        let url = format!("{}/mayachain/inbound_addresses", self.protocol_api_url);
        let entries: Vec<Value> = reqwest::get(&url)
            .await
            .with_context(|| format!("failed to query {}", url))?
            .json()
            .await
            .context("malformed inbound addresses response")?;

        let chain_name = self.chain.name();
        for entry in &entries {
            if entry.get("chain").and_then(Value::as_str) == Some(chain_name) {
                let vault = entry
                    .get("address")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("inbound address entry missing vault"))?;
                let router = entry
                    .get("router")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("inbound address entry missing router"))?;
                return Ok((vault.to_string(), router.to_string()));
            }
        }
        Err(anyhow!("no inbound address for chain {}", chain_name))
    }

    /// Deploy a contract and return its address from the receipt.
    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        args: &[DynSolValue],
    ) -> Result<String> {
        let tx = json!({
            "from": self.admin,
            "data": artifact.deploy_data(args)?,
        });
        let receipt = self.send_and_await(&tx).await?;
        receipt
            .get("contractAddress")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("deployment receipt has no contract address"))
    }

    async fn send_and_await(&self, tx: &Value) -> Result<Value> {
        let intent = TransactionIntent::unhashed(tx.to_string());
        let receipt = submit_and_await(&self.client, &intent, self.poll_interval, self.timeout)
            .await
            .context("evm transaction did not commit")?;
        Ok(receipt)
    }

    fn token_artifact(&self) -> Result<ContractArtifact> {
        self.load_artifact("token-abi.json", "token-bytecode.txt")
    }

    /// Router artifact plus constructor args. On ETH the router constructor
    /// takes the ERC-20 RUNE token address and ships as a separate artifact.
    fn router_artifact(&self) -> Result<(ContractArtifact, Vec<DynSolValue>)> {
        if self.chain == Chain::Eth {
            let artifact = self.load_artifact("eth-router-abi.json", "eth-router-bytecode.txt")?;
            let args = vec![DynSolValue::Address(parse_address(ERC20_RUNE)?)];
            Ok((artifact, args))
        } else {
            let artifact = self.load_artifact("router-abi.json", "router-bytecode.txt")?;
            Ok((artifact, vec![]))
        }
    }

    fn dex_artifact(&self) -> Result<ContractArtifact> {
        self.load_artifact("dexcontract-abi.json", "dexcontract-bytecode.txt")
    }

    /// ABI-only: `swapIn` shapes differ across aggregators, so the ABI ships
    /// as an artifact and the contract itself is deployed elsewhere.
    fn aggregator_artifact(&self) -> Result<ContractArtifact> {
        ContractArtifact::from_abi(&self.artifacts_dir.join("aggregator-abi.json"))
    }

    fn load_artifact(&self, abi_file: &str, bytecode_file: &str) -> Result<ContractArtifact> {
        ContractArtifact::load(
            &self.artifacts_dir.join(abi_file),
            &self.artifacts_dir.join(bytecode_file),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_addresses_parse() {
        assert!(parse_address(ZERO_ADDRESS).is_ok());
        assert!(parse_address(SIMULATION_MASTER).is_ok());
        assert!(parse_address(ERC20_RUNE).is_ok());
    }
}
