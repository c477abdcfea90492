//! mocknet-tool CLI: deploy and smoke-test the cross-chain liquidity
//! protocol's local mock network
//!
//! Thin dispatch over the library: every subcommand builds a chain client,
//! waits for the node, and runs one action to completion.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use mocknet_tool::aliases;
use mocknet_tool::chain::Chain;
use mocknet_tool::evm::deploy::{EvmSetup, SIMULATION_MASTER};
use mocknet_tool::evm::EvmClient;
use mocknet_tool::radix::deploy::RouterDeployer;
use mocknet_tool::radix::intent::NotaryKey;
use mocknet_tool::radix::{RadixChain, RadixClient, RadixConfig, MOCKNET_KEYS};

/// Main CLI arguments
#[derive(Parser)]
#[command(name = "mocknet-tool")]
#[command(about = "Deploy and smoke-test the cross-chain liquidity protocol mocknet")]
#[command(version = "0.1.0")]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Commitment poll interval in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Commitment wait budget in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Radix mocknet operations
    Radix {
        /// Node core API URL
        #[arg(long, default_value = "http://radix:3333/core")]
        rpc: String,

        #[command(subcommand)]
        command: RadixCommands,
    },
    /// EVM mocknet operations
    Evm {
        /// Target chain
        #[arg(long)]
        chain: Chain,

        /// Node RPC URL (defaults to the chain's mocknet node)
        #[arg(long)]
        rpc: Option<String>,

        /// Admin account address, unlocked on the dev node
        #[arg(long, default_value = SIMULATION_MASTER)]
        from: String,

        /// Directory holding contract ABI and bytecode artifacts
        #[arg(long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Protocol node REST URL for inbound-address discovery
        #[arg(long, default_value = "http://mayanode:1317")]
        protocol_api: String,

        #[command(subcommand)]
        command: EvmCommands,
    },
    /// Alias table lookups
    Alias {
        #[command(subcommand)]
        command: AliasCommands,
    },
}

/// Radix subcommands
#[derive(Subcommand)]
enum RadixCommands {
    /// Publish the router package and instantiate its components
    Deploy {
        /// Compiled package code
        #[arg(long)]
        wasm: PathBuf,
        /// Package schema file
        #[arg(long)]
        rpd: PathBuf,
    },
    /// Seed the master account from the faucet and create the test resource
    Seed {
        /// Router component address
        #[arg(long)]
        router: String,
    },
    /// Transfer between aliased accounts (amount in protocol base units)
    Transfer {
        #[arg(long)]
        router: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u128,
        #[arg(long, default_value = "XRD")]
        symbol: String,
        /// Test resource address, for non-XRD symbols
        #[arg(long)]
        test_resource: Option<String>,
    },
    /// Deposit into the router vault with a protocol memo
    Deposit {
        #[arg(long)]
        router: String,
        /// Current vault address
        #[arg(long)]
        vault: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        amount: u128,
        #[arg(long, default_value = "XRD")]
        symbol: String,
        /// Test resource address, for non-XRD symbols
        #[arg(long)]
        test_resource: Option<String>,
        /// Memo; aliases inside it are resolved to protocol addresses
        #[arg(long)]
        memo: String,
    },
    /// Balance of an account or the vault, in protocol base units
    Balance {
        #[arg(long)]
        router: String,
        /// Vault address, required when querying VAULT
        #[arg(long)]
        vault: Option<String>,
        /// Alias or address
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "XRD")]
        symbol: String,
        /// Test resource address, for non-XRD symbols
        #[arg(long)]
        test_resource: Option<String>,
    },
    /// Router-tracked vault balance, in protocol base units
    VaultBalance {
        #[arg(long)]
        router: String,
        /// Current vault address
        #[arg(long)]
        vault: String,
        #[arg(long, default_value = "XRD")]
        symbol: String,
        /// Test resource address, for non-XRD symbols
        #[arg(long)]
        test_resource: Option<String>,
    },
}

/// EVM subcommands
#[derive(Subcommand)]
enum EvmCommands {
    /// Deploy the token, router, and dex contracts
    Deploy,
    /// Fund an account from the admin account
    Fund {
        #[arg(long)]
        to: String,
        /// Amount in wei
        #[arg(long, default_value = "1000000000000000000")]
        amount: u128,
    },
    /// Deposit the gas asset into the router
    Deposit {
        /// Amount in wei
        #[arg(long, default_value = "1000000000000000000")]
        amount: u128,
        /// Protocol address receiving the deposit credit
        #[arg(long, default_value = "MASTER")]
        dest: String,
        /// Memo override (default is an ADD memo for the gas asset)
        #[arg(long)]
        memo: Option<String>,
    },
    /// Deposit the gas asset through the dex contract
    DepositFromDex {
        /// Dex contract address
        #[arg(long)]
        dex: String,
        /// Amount in wei
        #[arg(long, default_value = "1000000000000000000")]
        amount: u128,
        #[arg(long, default_value = "MASTER")]
        dest: String,
        /// Memo override (default is a swap memo for the protocol asset)
        #[arg(long)]
        memo: Option<String>,
        /// Use the variant that emits the dex's own deposit log
        #[arg(long)]
        with_logs: bool,
    },
    /// Swap into the protocol through an aggregator contract
    SwapIn {
        /// Aggregator contract address
        #[arg(long)]
        aggregator: String,
        #[arg(long)]
        token: String,
        /// Amount in token base units
        #[arg(long, default_value = "1000000000")]
        amount: u128,
        #[arg(long, default_value = "MASTER")]
        dest: String,
        #[arg(long)]
        memo: Option<String>,
    },
    /// Approve and deposit an ERC-20 token into the router
    DepositToken {
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "1000000000000000000")]
        amount: u128,
        #[arg(long, default_value = "MASTER")]
        dest: String,
        #[arg(long)]
        memo: Option<String>,
    },
    /// ERC-20 balance of an address
    TokenBalance {
        #[arg(long)]
        token: String,
        /// Defaults to the admin account
        #[arg(long)]
        address: Option<String>,
    },
    /// Router-tracked vault allowance for a token
    VaultAllowance {
        #[arg(long)]
        token: String,
    },
}

/// Alias subcommands
#[derive(Subcommand)]
enum AliasCommands {
    /// Address for an alias on a chain
    Resolve {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        alias: String,
    },
    /// Alias for an address on a chain, or the address itself
    Lookup {
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        address: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&args.log_level),
    )
    .init();

    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    let timeout = Duration::from_millis(args.timeout_ms);

    match args.command {
        Commands::Radix { rpc, command } => {
            run_radix(&rpc, command, poll_interval, timeout).await
        }
        Commands::Evm {
            chain,
            rpc,
            from,
            artifacts,
            protocol_api,
            command,
        } => {
            let rpc = rpc.unwrap_or_else(|| chain.params().default_rpc_url.to_string());
            run_evm(
                chain,
                &rpc,
                from,
                artifacts,
                protocol_api,
                command,
                poll_interval,
                timeout,
            )
            .await
        }
        Commands::Alias { command } => run_alias(command),
    }
}

async fn run_radix(
    rpc: &str,
    command: RadixCommands,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let config = RadixConfig::localnet(rpc);

    match command {
        RadixCommands::Deploy { wasm, rpd } => {
            // any throwaway mocknet key works as notary; fees come from the
            // faucet
            let (_, key_hex) = MOCKNET_KEYS
                .iter()
                .find(|(alias, _)| *alias == "PROVIDER-1")
                .ok_or_else(|| anyhow!("PROVIDER-1 key missing from mocknet key table"))?;
            let notary = NotaryKey::from_hex(key_hex)?;
            let client = RadixClient::new(config)?;
            let mut deployer =
                RouterDeployer::new(client, notary, wasm, rpd, poll_interval, timeout);
            deployer.run().await?;
            Ok(())
        }
        RadixCommands::Seed { router } => {
            let mut chain = RadixChain::connect(config, router, poll_interval, timeout).await?;
            chain.seed_master().await?;
            let resource = chain.create_test_resource().await?;
            println!("Test resource address {}", resource);
            Ok(())
        }
        RadixCommands::Transfer {
            router,
            from,
            to,
            amount,
            symbol,
            test_resource,
        } => {
            let mut chain = RadixChain::connect(config, router, poll_interval, timeout).await?;
            if let Some(resource) = test_resource {
                chain.set_test_resource(resource);
            }
            chain.transfer(&from, &to, amount, &symbol).await?;
            println!("Transferred {} {} from {} to {}", amount, symbol, from, to);
            Ok(())
        }
        RadixCommands::Deposit {
            router,
            vault,
            from,
            amount,
            symbol,
            test_resource,
            memo,
        } => {
            let mut chain = RadixChain::connect(config, router, poll_interval, timeout).await?;
            chain.set_vault_address(vault);
            if let Some(resource) = test_resource {
                chain.set_test_resource(resource);
            }
            let receipt = chain.deposit_to_router(&from, amount, &symbol, &memo).await?;
            println!("Deposit receipt: {}", receipt);
            Ok(())
        }
        RadixCommands::Balance {
            router,
            vault,
            address,
            symbol,
            test_resource,
        } => {
            let mut chain = RadixChain::connect(config, router, poll_interval, timeout).await?;
            if let Some(vault) = vault {
                chain.set_vault_address(vault);
            }
            if let Some(resource) = test_resource {
                chain.set_test_resource(resource);
            }
            let balance = chain.balance(&address, &symbol).await?;
            println!("{} {} balance: {}", address, symbol, balance);
            Ok(())
        }
        RadixCommands::VaultBalance {
            router,
            vault,
            symbol,
            test_resource,
        } => {
            let mut chain = RadixChain::connect(config, router, poll_interval, timeout).await?;
            chain.set_vault_address(vault);
            if let Some(resource) = test_resource {
                chain.set_test_resource(resource);
            }
            let balance = chain.vault_balance(&symbol).await?;
            println!("VAULT {} balance: {}", symbol, balance);
            Ok(())
        }
    }
}

/// Resolve a protocol-chain destination that may be an alias.
fn resolve_dest(dest: String) -> String {
    aliases::address_of(Chain::Maya, &dest)
        .map(str::to_string)
        .unwrap_or(dest)
}

#[allow(clippy::too_many_arguments)]
async fn run_evm(
    chain: Chain,
    rpc: &str,
    from: String,
    artifacts: PathBuf,
    protocol_api: String,
    command: EvmCommands,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let client = EvmClient::new(rpc)?;
    let setup = EvmSetup::connect(
        client,
        chain,
        from.clone(),
        artifacts,
        protocol_api,
        poll_interval,
        timeout,
    )
    .await
    .with_context(|| format!("failed to set up {} node at {}", chain, rpc))?;

    match command {
        EvmCommands::Deploy => {
            setup.deploy_init_contracts().await?;
            Ok(())
        }
        EvmCommands::Fund { to, amount } => {
            setup.fund_account(&from, &to, amount).await?;
            Ok(())
        }
        EvmCommands::Deposit { amount, dest, memo } => {
            let dest = resolve_dest(dest);
            let memo = memo.unwrap_or_else(|| format!("ADD:{}:{}", setup.gas_asset(), dest));
            setup.deposit(amount, &memo).await?;
            Ok(())
        }
        EvmCommands::DepositFromDex {
            dex,
            amount,
            dest,
            memo,
            with_logs,
        } => {
            let dest = resolve_dest(dest);
            let memo = memo.unwrap_or_else(|| format!("=:MAYA.CACAO:{}", dest));
            setup.deposit_from_dex(&dex, amount, &memo, with_logs).await?;
            Ok(())
        }
        EvmCommands::SwapIn {
            aggregator,
            token,
            amount,
            dest,
            memo,
        } => {
            let dest = resolve_dest(dest);
            let memo = memo.unwrap_or_else(|| format!("SWAP:MAYA.CACAO:{}", dest));
            setup.swap_in(&aggregator, &token, amount, &memo).await?;
            Ok(())
        }
        EvmCommands::DepositToken {
            token,
            amount,
            dest,
            memo,
        } => {
            let dest = resolve_dest(dest);
            let memo = memo.unwrap_or_else(|| {
                format!("ADD:{}.TKN-{}:{}", chain, token.to_uppercase(), dest)
            });
            setup.deposit_token(&token, amount, &memo).await?;
            Ok(())
        }
        EvmCommands::TokenBalance { token, address } => {
            let address = address.unwrap_or(from);
            let balance = setup.token_balance(&token, &address).await?;
            println!("Token Balance: {}", balance);
            Ok(())
        }
        EvmCommands::VaultAllowance { token } => {
            let allowance = setup.vault_allowance(&token).await?;
            println!("Vault Allowance: {}", allowance);
            Ok(())
        }
    }
}

fn run_alias(command: AliasCommands) -> Result<()> {
    match command {
        AliasCommands::Resolve { chain, alias } => {
            let address = aliases::address_of(chain, &alias)
                .ok_or_else(|| anyhow!("no {} address for alias {}", chain, alias))?;
            println!("{}", address);
            Ok(())
        }
        AliasCommands::Lookup { chain, address } => {
            println!("{}", aliases::alias_of(chain, &address));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radix_subcommand_surface() {
        for argv in [
            vec![
                "mocknet-tool",
                "radix",
                "seed",
                "--router",
                "component_loc1router",
            ],
            vec![
                "mocknet-tool",
                "radix",
                "vault-balance",
                "--router",
                "component_loc1router",
                "--vault",
                "account_loc1vault",
            ],
        ] {
            Args::try_parse_from(argv).unwrap();
        }
    }

    #[test]
    fn test_evm_dex_and_aggregator_actions_parse() {
        for argv in [
            vec![
                "mocknet-tool",
                "evm",
                "--chain",
                "ETH",
                "deposit-from-dex",
                "--dex",
                "0x0000000000000000000000000000000000000001",
                "--with-logs",
            ],
            vec![
                "mocknet-tool",
                "evm",
                "--chain",
                "AVAX",
                "swap-in",
                "--aggregator",
                "0x0000000000000000000000000000000000000002",
                "--token",
                "0x0000000000000000000000000000000000000003",
            ],
        ] {
            Args::try_parse_from(argv).unwrap();
        }
    }

    #[test]
    fn test_resolve_dest_aliases() {
        assert_eq!(
            resolve_dest("MASTER".to_string()),
            "tmaya1nrsk6f4kalwwrqqyrfmxzl96hyjhe96t4gmvp2"
        );
        assert_eq!(resolve_dest("tmaya1literal".to_string()), "tmaya1literal");
    }
}
