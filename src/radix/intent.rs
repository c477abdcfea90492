//! Manifest construction and intent notarization
//!
//! The real protocol delegates transaction encoding to the chain vendor's
//! SDK. For the mocknet tool the payload only has to be a deterministic,
//! signed, hex-encodable blob with a derivable intent hash; the node side
//! of every test is either a throwaway local validator or a mock. The
//! layout here is: header fields in fixed order, manifest text, blob
//! lengths and bytes, then the notary public key and signature appended
//! after hashing.

use anyhow::{Context, Result};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

use crate::submit::TransactionIntent;

/// Header fields carried by every notarized transaction.
#[derive(Debug, Clone)]
pub struct TransactionHeader {
    pub network_id: u8,
    pub start_epoch_inclusive: u64,
    pub end_epoch_exclusive: u64,
    pub nonce: u32,
    pub notary_is_signatory: bool,
    pub tip_percentage: u16,
}

/// Secp256k1 notary key for signing intents.
pub struct NotaryKey {
    secret: SecretKey,
}

impl NotaryKey {
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key).context("invalid notary key hex")?;
        let secret = SecretKey::from_slice(&bytes).context("invalid secp256k1 secret key")?;
        Ok(Self { secret })
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &self.secret)
    }
}

/// A transaction manifest: ordered instruction text plus any binary blobs
/// (package code and schema for publish operations).
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    instructions: Vec<String>,
    blobs: Vec<Vec<u8>>,
}

/// Builds manifests instruction by instruction, mirroring the call shapes
/// the router and faucet expose.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pay the fee from the network faucet. All mocknet transactions do
    /// this so no test account ever spends gas.
    pub fn faucet_lock_fee(self, faucet_address: &str) -> Self {
        self.call_method(faucet_address, "lock_fee", &[decimal_arg("25")])
    }

    pub fn faucet_free_xrd(self, faucet_address: &str) -> Self {
        self.call_method(faucet_address, "free", &[])
    }

    pub fn account_withdraw(self, account: &str, resource: &str, amount: &str) -> Self {
        self.call_method(
            account,
            "withdraw",
            &[address_arg(resource), decimal_arg(amount)],
        )
    }

    pub fn take_all_from_worktop(mut self, resource: &str, bucket: &str) -> Self {
        self.manifest.instructions.push(format!(
            "TAKE_ALL_FROM_WORKTOP {} Bucket(\"{}\");",
            address_arg(resource),
            bucket
        ));
        self
    }

    pub fn account_deposit_bucket(self, account: &str, bucket: &str) -> Self {
        self.call_method(account, "try_deposit_or_abort", &[format!("Bucket(\"{}\")", bucket)])
    }

    pub fn account_deposit_entire_worktop(self, account: &str) -> Self {
        self.call_method(account, "try_deposit_batch_or_abort", &["Expression(\"ENTIRE_WORKTOP\")".to_string()])
    }

    /// Router `user_deposit` call: sender, vault, the taken bucket, and the
    /// protocol memo.
    pub fn router_user_deposit(
        self,
        router: &str,
        sender: &str,
        vault: &str,
        bucket: &str,
        memo: &str,
    ) -> Self {
        self.call_method(
            router,
            "user_deposit",
            &[
                address_arg(sender),
                address_arg(vault),
                format!("Bucket(\"{}\")", bucket),
                string_arg(memo),
            ],
        )
    }

    /// Create a fungible resource and leave the initial supply on the
    /// worktop.
    pub fn create_fungible_resource(mut self, divisibility: u8, initial_supply: &str) -> Self {
        self.manifest.instructions.push(format!(
            "CREATE_FUNGIBLE_RESOURCE_WITH_INITIAL_SUPPLY OwnerRole(\"None\") false {}u8 {};",
            divisibility,
            decimal_arg(initial_supply)
        ));
        self
    }

    /// Publish a package from its compiled code and schema blobs.
    pub fn publish_package(mut self, wasm: Vec<u8>, rpd: Vec<u8>) -> Self {
        self.manifest.instructions.push(format!(
            "PUBLISH_PACKAGE_ADVANCED OwnerRole(\"None\") Blob({}) Blob({});",
            self.manifest.blobs.len(),
            self.manifest.blobs.len() + 1
        ));
        self.manifest.blobs.push(wasm);
        self.manifest.blobs.push(rpd);
        self
    }

    /// Call a function on a published package blueprint.
    pub fn call_function(mut self, package: &str, blueprint: &str, function: &str) -> Self {
        self.manifest.instructions.push(format!(
            "CALL_FUNCTION {} \"{}\" \"{}\";",
            address_arg(package),
            blueprint,
            function
        ));
        self
    }

    pub fn call_method(mut self, component: &str, method: &str, args: &[String]) -> Self {
        let mut instruction = format!("CALL_METHOD {} \"{}\"", address_arg(component), method);
        for arg in args {
            instruction.push(' ');
            instruction.push_str(arg);
        }
        instruction.push(';');
        self.manifest.instructions.push(instruction);
        self
    }

    pub fn build(self) -> Manifest {
        self.manifest
    }
}

fn address_arg(address: &str) -> String {
    format!("Address(\"{}\")", address)
}

fn decimal_arg(amount: &str) -> String {
    format!("Decimal(\"{}\")", amount)
}

fn string_arg(value: &str) -> String {
    format!("\"{}\"", value)
}

impl Manifest {
    pub fn instructions_text(&self) -> String {
        self.instructions.join("\n")
    }
}

/// Sign a manifest under the given header and compile it to a submittable
/// intent. The intent hash identifies the transaction on the status and
/// receipt endpoints.
pub fn notarize(
    header: &TransactionHeader,
    manifest: &Manifest,
    notary: &NotaryKey,
) -> Result<TransactionIntent> {
    let mut intent_bytes = Vec::new();
    intent_bytes.push(header.network_id);
    intent_bytes.extend_from_slice(&header.start_epoch_inclusive.to_be_bytes());
    intent_bytes.extend_from_slice(&header.end_epoch_exclusive.to_be_bytes());
    intent_bytes.extend_from_slice(&header.nonce.to_be_bytes());
    intent_bytes.extend_from_slice(&notary.public_key().serialize());
    intent_bytes.push(header.notary_is_signatory as u8);
    intent_bytes.extend_from_slice(&header.tip_percentage.to_be_bytes());
    intent_bytes.extend_from_slice(manifest.instructions_text().as_bytes());
    for blob in &manifest.blobs {
        intent_bytes.extend_from_slice(&(blob.len() as u64).to_be_bytes());
        intent_bytes.extend_from_slice(blob);
    }

    let digest: [u8; 32] = Sha256::digest(&intent_bytes).into();
    let secp = Secp256k1::new();
    let signature = secp.sign_ecdsa(&Message::from_digest(digest), &notary.secret);

    let mut payload = intent_bytes;
    payload.extend_from_slice(&notary.public_key().serialize());
    payload.extend_from_slice(&signature.serialize_compact());

    let intent_hash = format!("txid_{}", hex::encode(digest));
    Ok(TransactionIntent::with_hash(hex::encode(payload), intent_hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "76736c78f64e84131218944e6f7ea06d4ec84a2caf363b215a6c951a98bcf41c";

    fn test_header(nonce: u32) -> TransactionHeader {
        TransactionHeader {
            network_id: 0xF0,
            start_epoch_inclusive: 1,
            end_epoch_exclusive: 5000,
            nonce,
            notary_is_signatory: true,
            tip_percentage: 0,
        }
    }

    #[test]
    fn test_manifest_instruction_text() {
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee("component_loc1faucet")
            .account_withdraw("account_loc1source", "resource_loc1xrd", "1.5")
            .take_all_from_worktop("resource_loc1xrd", "bucket")
            .account_deposit_bucket("account_loc1dest", "bucket")
            .build();

        let text = manifest.instructions_text();
        assert!(text.contains("CALL_METHOD Address(\"component_loc1faucet\") \"lock_fee\" Decimal(\"25\");"));
        assert!(text.contains("\"withdraw\" Address(\"resource_loc1xrd\") Decimal(\"1.5\");"));
        assert!(text.contains("TAKE_ALL_FROM_WORKTOP Address(\"resource_loc1xrd\") Bucket(\"bucket\");"));
        assert!(text.contains("\"try_deposit_or_abort\" Bucket(\"bucket\");"));
    }

    #[test]
    fn test_notarize_is_deterministic() {
        let notary = NotaryKey::from_hex(TEST_KEY).unwrap();
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee("component_loc1faucet")
            .build();

        let a = notarize(&test_header(1), &manifest, &notary).unwrap();
        let b = notarize(&test_header(1), &manifest, &notary).unwrap();
        assert_eq!(a.payload(), b.payload());
        assert_eq!(a.intent_hash(), b.intent_hash());
        assert!(a.intent_hash().unwrap().starts_with("txid_"));
    }

    #[test]
    fn test_nonce_changes_intent_hash() {
        let notary = NotaryKey::from_hex(TEST_KEY).unwrap();
        let manifest = ManifestBuilder::new()
            .faucet_lock_fee("component_loc1faucet")
            .build();

        let a = notarize(&test_header(1), &manifest, &notary).unwrap();
        let b = notarize(&test_header(2), &manifest, &notary).unwrap();
        assert_ne!(a.intent_hash(), b.intent_hash());
    }

    #[test]
    fn test_blobs_are_compiled_into_payload() {
        let notary = NotaryKey::from_hex(TEST_KEY).unwrap();
        let manifest = ManifestBuilder::new()
            .publish_package(vec![0u8; 16], vec![1u8; 8])
            .build();
        let without_blobs = ManifestBuilder::new()
            .publish_package(vec![], vec![])
            .build();

        let a = notarize(&test_header(1), &manifest, &notary).unwrap();
        let b = notarize(&test_header(1), &without_blobs, &notary).unwrap();
        assert_ne!(a.payload(), b.payload());
    }
}
