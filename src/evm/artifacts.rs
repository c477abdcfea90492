//! Contract artifact loading and call encoding
//!
//! Deployment artifacts are an ABI JSON file plus a hex bytecode file,
//! read once per action. Calls are encoded against the loaded ABI, so the
//! tool carries no generated bindings.

use std::fs;
use std::path::Path;

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};

/// A contract's ABI and deployable bytecode.
pub struct ContractArtifact {
    pub abi: JsonAbi,
    pub bytecode: String,
}

impl ContractArtifact {
    /// Load from an ABI JSON file and a bytecode hex file.
    pub fn load(abi_path: &Path, bytecode_path: &Path) -> Result<Self> {
        let abi_text = fs::read_to_string(abi_path)
            .with_context(|| format!("failed to read ABI {}", abi_path.display()))?;
        let abi: JsonAbi = serde_json::from_str(&abi_text)
            .with_context(|| format!("invalid ABI JSON in {}", abi_path.display()))?;

        let bytecode = fs::read_to_string(bytecode_path)
            .with_context(|| format!("failed to read bytecode {}", bytecode_path.display()))?
            .trim()
            .trim_start_matches("0x")
            .to_string();

        Ok(Self { abi, bytecode })
    }

    /// ABI-only artifact for contracts the tool calls but never deploys.
    pub fn from_abi(abi_path: &Path) -> Result<Self> {
        let abi_text = fs::read_to_string(abi_path)
            .with_context(|| format!("failed to read ABI {}", abi_path.display()))?;
        let abi: JsonAbi = serde_json::from_str(&abi_text)
            .with_context(|| format!("invalid ABI JSON in {}", abi_path.display()))?;
        Ok(Self {
            abi,
            bytecode: String::new(),
        })
    }

    /// Deployment data: bytecode followed by encoded constructor arguments.
    pub fn deploy_data(&self, args: &[DynSolValue]) -> Result<String> {
        if self.bytecode.is_empty() {
            return Err(anyhow!("artifact has no bytecode to deploy"));
        }
        let mut data = hex::decode(&self.bytecode).context("invalid bytecode hex")?;
        match &self.abi.constructor {
            Some(ctor) if !ctor.inputs.is_empty() => {
                data.extend(
                    ctor.abi_encode_input(args)
                        .context("failed to encode constructor arguments")?,
                );
            }
            _ if !args.is_empty() => {
                return Err(anyhow!("constructor takes no arguments"));
            }
            _ => {}
        }
        Ok(format!("0x{}", hex::encode(data)))
    }

    /// Encoded call data (selector + arguments) for a named function.
    pub fn call_data(&self, name: &str, args: &[DynSolValue]) -> Result<String> {
        let function = self.function(name)?;
        let data = function
            .abi_encode_input(args)
            .with_context(|| format!("failed to encode call to {}", name))?;
        Ok(format!("0x{}", hex::encode(data)))
    }

    /// Decode a single-uint return value from an `eth_call` result.
    pub fn decode_uint(&self, name: &str, output_hex: &str) -> Result<U256> {
        let function = self.function(name)?;
        let bytes = hex::decode(output_hex.trim_start_matches("0x"))
            .context("invalid eth_call output hex")?;
        let values = function
            .abi_decode_output(&bytes, true)
            .with_context(|| format!("failed to decode {} output", name))?;
        match values.first() {
            Some(DynSolValue::Uint(value, _)) => Ok(*value),
            other => Err(anyhow!("{} did not return a uint: {:?}", name, other)),
        }
    }

    /// Decode a single-address return value from an `eth_call` result.
    pub fn decode_address(&self, name: &str, output_hex: &str) -> Result<Address> {
        let function = self.function(name)?;
        let bytes = hex::decode(output_hex.trim_start_matches("0x"))
            .context("invalid eth_call output hex")?;
        let values = function
            .abi_decode_output(&bytes, true)
            .with_context(|| format!("failed to decode {} output", name))?;
        match values.first() {
            Some(DynSolValue::Address(address)) => Ok(*address),
            other => Err(anyhow!("{} did not return an address: {:?}", name, other)),
        }
    }

    fn function(&self, name: &str) -> Result<&Function> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| anyhow!("ABI has no function {}", name))
    }
}

/// Parse a checksummed or lowercase hex address.
pub fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .with_context(|| format!("invalid EVM address: {}", address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOKEN_ABI: &str = r#"[
        {"type": "constructor", "inputs": []},
        {
            "type": "function",
            "name": "balanceOf",
            "stateMutability": "view",
            "inputs": [{"name": "owner", "type": "address"}],
            "outputs": [{"name": "", "type": "uint256"}]
        },
        {
            "type": "function",
            "name": "approve",
            "stateMutability": "nonpayable",
            "inputs": [
                {"name": "spender", "type": "address"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [{"name": "", "type": "bool"}]
        }
    ]"#;

    const AGGREGATOR_ABI: &str = r#"[
        {
            "type": "function",
            "name": "tokenTransferProxy",
            "stateMutability": "view",
            "inputs": [],
            "outputs": [{"name": "", "type": "address"}]
        },
        {
            "type": "function",
            "name": "swapIn",
            "stateMutability": "payable",
            "inputs": [
                {"name": "tcRouter", "type": "address"},
                {"name": "tcVault", "type": "address"},
                {"name": "tcMemo", "type": "string"},
                {"name": "token", "type": "address"},
                {"name": "amount", "type": "uint256"},
                {"name": "amountOutMin", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ],
            "outputs": []
        }
    ]"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn test_artifact() -> ContractArtifact {
        let abi_file = write_temp(TOKEN_ABI);
        let code_file = write_temp("0x6080604052");
        ContractArtifact::load(abi_file.path(), code_file.path()).unwrap()
    }

    #[test]
    fn test_load_strips_bytecode_prefix() {
        let artifact = test_artifact();
        assert_eq!(artifact.bytecode, "6080604052");
    }

    #[test]
    fn test_deploy_data_without_args() {
        let artifact = test_artifact();
        assert_eq!(artifact.deploy_data(&[]).unwrap(), "0x6080604052");
        // args against a no-arg constructor are refused
        let extra = DynSolValue::Uint(U256::from(1), 256);
        assert!(artifact.deploy_data(&[extra]).is_err());
    }

    #[test]
    fn test_call_data_has_selector_and_words() {
        let artifact = test_artifact();
        let owner = parse_address("0x3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473").unwrap();
        let data = artifact
            .call_data("balanceOf", &[DynSolValue::Address(owner)])
            .unwrap();
        // 0x + 4-byte selector + one 32-byte word
        assert_eq!(data.len(), 2 + 8 + 64);
        // balanceOf(address) selector
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473"));
    }

    #[test]
    fn test_decode_uint() {
        let artifact = test_artifact();
        let output = format!("0x{:064x}", 1_000_000u64);
        let value = artifact.decode_uint("balanceOf", &output).unwrap();
        assert_eq!(value, U256::from(1_000_000u64));
    }

    #[test]
    fn test_decode_address() {
        let abi_file = write_temp(AGGREGATOR_ABI);
        let artifact = ContractArtifact::from_abi(abi_file.path()).unwrap();
        let output = format!("0x{:0>64}", "3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473");
        let proxy = artifact.decode_address("tokenTransferProxy", &output).unwrap();
        assert_eq!(
            proxy,
            parse_address("0x3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473").unwrap()
        );
    }

    #[test]
    fn test_swap_in_call_encodes_all_args() {
        let abi_file = write_temp(AGGREGATOR_ABI);
        let artifact = ContractArtifact::from_abi(abi_file.path()).unwrap();
        let token = parse_address("0x3155BA85D5F96b2d030a4966AF206230e46849cb").unwrap();
        let data = artifact
            .call_data(
                "swapIn",
                &[
                    DynSolValue::Address(token),
                    DynSolValue::Address(token),
                    DynSolValue::String("SWAP:MAYA.CACAO:x".to_string()),
                    DynSolValue::Address(token),
                    DynSolValue::Uint(U256::from(1_000_000_000u64), 256),
                    DynSolValue::Uint(U256::ZERO, 256),
                    DynSolValue::Uint(U256::from(9_999_999_999u64), 256),
                ],
            )
            .unwrap();
        // 0x + selector + 7 head words + string length and data words
        assert_eq!(data.len(), 2 + 8 + 9 * 64);
        // ABI-only artifacts refuse deployment
        assert!(artifact.deploy_data(&[]).is_err());
    }

    #[test]
    fn test_unknown_function_is_an_error() {
        let artifact = test_artifact();
        assert!(artifact.call_data("transferFrom", &[]).is_err());
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("0x3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473").is_ok());
        assert!(parse_address("not-an-address").is_err());
    }
}
