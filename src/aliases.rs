//! Test-actor alias tables for the mocknet
//!
//! Smoke tests refer to accounts by role (`MASTER`, `USER-1`, ...) rather
//! than by raw address. Each chain carries a fixed table mapping those
//! aliases to the addresses of the hardcoded mocknet keys. Vault addresses
//! are not static (they depend on the churned vault pubkey), so a small
//! per-session overlay carries them without mutating these tables.
//!
//! The keys and addresses below are throwaway mocknet fixtures, not a
//! pattern for anything security-sensitive.

use std::collections::HashMap;

use crate::chain::Chain;

const ALIASES_BTC: &[(&str, &str)] = &[
    ("MASTER", "bcrt1qf4l5dlqhaujgkxxqmug4stfvmvt58vx2h44c39"),
    ("CONTRIB", "bcrt1qzupk5lmc84r2dh738a9g3zscavannjy3084p2x"),
    ("USER-1", "bcrt1qqqnde7kqe5sf96j6zf8jpzwr44dh4gkd3ehaqh"),
    ("PROVIDER-1", "bcrt1q0s4mg25tu6termrk8egltfyme4q7sg3h8kkydt"),
    ("PROVIDER-2", "bcrt1qjw8h4l3dtz5xxc7uyh5ys70qkezspgfutyswxm"),
    ("VAULT", ""),
];

const ALIASES_DASH: &[(&str, &str)] = &[
    ("MASTER", "yZnyJAdouDu3gmAuhG3dTc66hroS4AXxnL"),
    ("CONTRIB", "yNR8UxqY4ZUq8wYYgJ19pW42mJ7xt2J8FU"),
    ("USER-1", "yLLFQTxaW3wybbahkhyZcrdfqoRCnfzAV5"),
    ("PROVIDER-1", "yXdzzagQPwWXdZzFD2vRmsYMxgeD6o9D2L"),
    ("PROVIDER-2", "yZmg4bdi9oeN1b1UrkUYFCtMEiXUoSazYy"),
    ("VAULT", ""),
];

const ALIASES_ETH: &[(&str, &str)] = &[
    ("MASTER", "0x3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473"),
    ("CONTRIB", "0x970e8128ab834e8eac17ab8e3812f010678cf791"),
    ("USER-1", "0xf6da288748ec4c77642f6c5543717539b3ae001b"),
    ("PROVIDER-1", "0xfabb9cc6ec839b1214bb11c53377a56a6ed81762"),
    ("PROVIDER-2", "0x1f30a82340f08177aba70e6f48054917c74d7d38"),
    ("VAULT", ""),
];

const ALIASES_ARB: &[(&str, &str)] = &[
    ("MASTER", "0x3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e"),
    ("CONTRIB", "0x970e8128ab834e8eac17ab8e3812f010678cf791"),
    ("USER-1", "0x1dD3B27eD3CAA2fba3345D105819f86D9D414778"),
    ("PROVIDER-1", "0x0d5ef8047b37C8D26D066ff1De85bdEB8D5D2916"),
    ("PROVIDER-2", "0x140AD7786f9578c8ff6371c69bC3fFC776863933"),
    ("VAULT", ""),
];

const ALIASES_KUJI: &[(&str, &str)] = &[
    ("MASTER", "kujira1y4lj8cg47kfm70nht5f8ajyvr4dftfc6lmvga7"),
    ("CONTRIB", "kujira1qr79m0r8hzj0t88c3c6k99prxv0fe34ulfzyzk"),
    ("USER-1", "kujira1zek67xjzkf47apws7flq69npfkyzdgknm9hs7s"),
    ("PROVIDER-1", "kujira13g34vvhmlj5ehg06lj4yjnwux0p7hesall5pfm"),
    ("PROVIDER-2", ""),
    ("VAULT", ""),
];

const ALIASES_THOR: &[(&str, &str)] = &[
    ("MASTER", "tthor1z63f3mzwv3g75az80xwmhrawdqcjpaekk0kd54"),
    ("CONTRIB", "tthor1phaxpevm5wecex2jyaqty2a4v02qj7qm4sedw4"),
    ("USER-1", "tthor1xwusttz86hqfuk5z7amcgqsg7vp6g8zhsp5lu2"),
    ("PROVIDER-1", "tthor1wz78qmrkplrdhy37tw0tnvn0tkm5pqd6zdp257"),
    ("PROVIDER-2", "tthor1xwusttz86hqfuk5z7amcgqsg7vp6g8zhsp5lu2"),
    ("VAULT", ""),
    ("SYNTH", "tthor1v8ppstuf6e3x0r4glqc68d5jqcs2tf38ulmsrp"),
    ("RESERVE", "tthor1dheycdevq39qlkxs2a6wuuzyn4aqxhve3hhmlw"),
    ("BOND", "tthor17gw75axcnr8747pkanye45pnrwk7p9c3uhzgff"),
];

const ALIASES_MAYA: &[(&str, &str)] = &[
    ("MASTER", "tmaya1nrsk6f4kalwwrqqyrfmxzl96hyjhe96t4gmvp2"),
    ("CONTRIB", "tmaya1m8prd4pvqe5p3cu7tu82pn50a5f9xzxzetc35t"),
    ("USER-1", "tmaya1z63f3mzwv3g75az80xwmhrawdqcjpaekkcgpz9"),
    ("PROVIDER-1", "tmaya1wz78qmrkplrdhy37tw0tnvn0tkm5pqd6z6lxzw"),
    ("PROVIDER-2", "tmaya1xwusttz86hqfuk5z7amcgqsg7vp6g8zhsk2n26"),
    ("VAULT", "tmaya1g98cy3n9mmjrpn0sxmn63lztelera37nrn4zh6"),
    ("SYNTH", "tmaya1zxw7mpq9zc4pe97unf85lljcwnhf4h2ky5dcyf"),
    ("RESERVE", "tmaya1dheycdevq39qlkxs2a6wuuzyn4aqxhve3qfhf7"),
    ("BOND", "tmaya17gw75axcnr8747pkanye45pnrwk7p9c3uquyle"),
];

const ALIASES_XRD: &[(&str, &str)] = &[
    (
        "MASTER",
        "account_loc16xdw5jm4l70r37p8fzk29777e52e99dh5dk443ygwpg2ql3h7um770",
    ),
    (
        "CONTRIB",
        "account_loc168u46dsk3ae4v8s3uvccwyxsu90zc6ewmhp7rd0k7hs32xavsjkf49",
    ),
    (
        "USER-1",
        "account_loc1693rhqss8thtsv5jlsta5mkxl2l27qqnrc6dp699a84vcd2cjlc7c5",
    ),
    (
        "PROVIDER-1",
        "account_loc169h7jctav80kpm4h9sw7n9egh80admp44ctqfm0d0u9sj3hvu9xqvu",
    ),
    (
        "PROVIDER-2",
        "account_loc168wpt8m8s9h200d4cs7gtge5akr6exyzwylxng9v0jwaj8hc0cux2g",
    ),
    ("VAULT", ""),
];

/// The static table for a chain. Chains without seeded accounts (AVAX) get
/// an empty table.
fn table(chain: Chain) -> &'static [(&'static str, &'static str)] {
    match chain {
        Chain::Btc => ALIASES_BTC,
        Chain::Dash => ALIASES_DASH,
        Chain::Eth => ALIASES_ETH,
        Chain::Arb => ALIASES_ARB,
        Chain::Avax => &[],
        Chain::Kuji => ALIASES_KUJI,
        Chain::Thor => ALIASES_THOR,
        Chain::Maya => ALIASES_MAYA,
        Chain::Xrd => ALIASES_XRD,
    }
}

/// The alias names every chain table carries.
pub fn alias_names() -> impl Iterator<Item = &'static str> {
    ALIASES_BTC.iter().map(|(name, _)| *name)
}

/// Fixed address for an alias on a chain, if the table has a non-empty
/// entry.
pub fn address_of(chain: Chain, alias: &str) -> Option<&'static str> {
    table(chain)
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, addr)| *addr)
        .filter(|addr| !addr.is_empty())
}

/// Reverse lookup: the alias for an address where one exists, else the
/// address itself.
pub fn alias_of(chain: Chain, addr: &str) -> &str {
    for (name, alias_addr) in table(chain) {
        if !alias_addr.is_empty() && *alias_addr == addr {
            return name;
        }
    }
    addr
}

/// Replace every alias name appearing in a memo with its address on the
/// given chain. Memos carry protocol-chain destinations, so callers pass
/// the chain the memo's addresses live on.
pub fn resolve_memo(chain: Chain, memo: &str) -> String {
    let mut resolved = memo.to_string();
    for name in alias_names() {
        if let Some(addr) = address_of(chain, name) {
            resolved = resolved.replace(name, addr);
        }
    }
    resolved
}

/// Per-session alias overlay. Holds addresses discovered at runtime (the
/// current vault) on top of the static tables.
#[derive(Debug, Default)]
pub struct AliasBook {
    overrides: HashMap<(Chain, String), String>,
}

impl AliasBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the vault address for a chain for the rest of the session.
    pub fn set_vault(&mut self, chain: Chain, address: String) {
        self.overrides.insert((chain, "VAULT".to_string()), address);
    }

    /// Session-aware lookup: overlay first, then the static table.
    pub fn address_of(&self, chain: Chain, alias: &str) -> Option<&str> {
        if let Some(addr) = self.overrides.get(&(chain, alias.to_string())) {
            return Some(addr.as_str());
        }
        address_of(chain, alias)
    }

    /// Resolve a CLI argument that may be either an alias or a literal
    /// address.
    pub fn resolve(&self, chain: Chain, alias_or_addr: &str) -> String {
        self.address_of(chain, alias_or_addr)
            .map(str::to_string)
            .unwrap_or_else(|| alias_or_addr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup_is_stable() {
        assert_eq!(
            address_of(Chain::Eth, "MASTER"),
            Some("0x3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473")
        );
        assert_eq!(
            address_of(Chain::Xrd, "USER-1"),
            Some("account_loc1693rhqss8thtsv5jlsta5mkxl2l27qqnrc6dp699a84vcd2cjlc7c5")
        );
        assert_eq!(address_of(Chain::Xrd, "VAULT"), None);
        assert_eq!(address_of(Chain::Avax, "MASTER"), None);
    }

    #[test]
    fn test_alias_of_is_left_inverse() {
        for chain in Chain::all() {
            for name in alias_names() {
                if let Some(addr) = address_of(chain, name) {
                    let back = alias_of(chain, addr);
                    // THOR maps USER-1 and PROVIDER-2 to the same address, so
                    // reverse lookup must return some alias for that address.
                    assert_eq!(address_of(chain, back), Some(addr));
                }
            }
        }
    }

    #[test]
    fn test_alias_of_identity_for_unknown() {
        assert_eq!(alias_of(Chain::Eth, "0x00000000deadbeef"), "0x00000000deadbeef");
        assert_eq!(alias_of(Chain::Btc, ""), "");
    }

    #[test]
    fn test_resolve_memo() {
        let memo = resolve_memo(Chain::Maya, "ADD:XRD.XRD:PROVIDER-1");
        assert_eq!(
            memo,
            "ADD:XRD.XRD:tmaya1wz78qmrkplrdhy37tw0tnvn0tkm5pqd6z6lxzw"
        );
        // memos without aliases come back unchanged
        assert_eq!(resolve_memo(Chain::Maya, "SEED"), "SEED");
    }

    #[test]
    fn test_alias_book_vault_override() {
        let mut book = AliasBook::new();
        assert_eq!(book.address_of(Chain::Xrd, "VAULT"), None);

        book.set_vault(Chain::Xrd, "account_loc1vaultvaultvault".to_string());
        assert_eq!(
            book.address_of(Chain::Xrd, "VAULT"),
            Some("account_loc1vaultvaultvault")
        );
        // static entries still resolve through the overlay
        assert_eq!(
            book.address_of(Chain::Xrd, "MASTER"),
            Some("account_loc16xdw5jm4l70r37p8fzk29777e52e99dh5dk443ygwpg2ql3h7um770")
        );
        // the static table itself is untouched
        assert_eq!(address_of(Chain::Xrd, "VAULT"), None);
    }

    #[test]
    fn test_resolve_passthrough() {
        let book = AliasBook::new();
        assert_eq!(
            book.resolve(Chain::Eth, "MASTER"),
            "0x3fd2d4ce97b082d4bce3f9fee2a3d60668d2f473"
        );
        assert_eq!(book.resolve(Chain::Eth, "0x1234"), "0x1234");
    }
}
