//! Output script to address decoding.
//!
//! The node's own decoding is authoritative: when the verbose response
//! carries an `address` (or the pre-22 `addresses` array) it is used as-is.
//! Otherwise the script hex is decoded locally, which covers the standard
//! mainnet types (P2PKH, P2SH, P2WPKH, P2WSH, P2TR). Non-standard scripts
//! yield no address.

use bitcoin::{Address, Network, ScriptBuf};

use crate::types::ScriptPubKey;

/// Decode a raw output script (hex) to an address, if it is standard.
pub fn address_from_script(script_hex: &str, network: Network) -> Option<String> {
    let bytes = hex::decode(script_hex).ok()?;
    let script = ScriptBuf::from_bytes(bytes);
    Address::from_script(&script, network)
        .ok()
        .map(|addr| addr.to_string())
}

/// The address an output script pays, preferring the node's decoding.
pub fn output_address(script_pub_key: &ScriptPubKey, network: Network) -> Option<String> {
    if let Some(address) = &script_pub_key.address {
        if !address.is_empty() {
            return Some(address.clone());
        }
    }
    if let Some(first) = script_pub_key
        .addresses
        .as_ref()
        .and_then(|addrs| addrs.first())
    {
        if !first.is_empty() {
            return Some(first.clone());
        }
    }
    if script_pub_key.hex.is_empty() {
        return None;
    }
    address_from_script(&script_pub_key.hex, network)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spk(hex: &str) -> ScriptPubKey {
        ScriptPubKey {
            hex: hex.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn node_decoding_wins() {
        let script = ScriptPubKey {
            hex: "6a".to_string(),
            address: Some("1NodeSaysSo".to_string()),
            ..Default::default()
        };
        assert_eq!(
            output_address(&script, Network::Bitcoin).as_deref(),
            Some("1NodeSaysSo")
        );
    }

    #[test]
    fn legacy_addresses_array_used_when_present() {
        let script = ScriptPubKey {
            addresses: Some(vec!["1Legacy".to_string()]),
            ..Default::default()
        };
        assert_eq!(
            output_address(&script, Network::Bitcoin).as_deref(),
            Some("1Legacy")
        );
    }

    #[test]
    fn p2pkh_decodes_locally() {
        // OP_DUP OP_HASH160 <20 zero bytes> OP_EQUALVERIFY OP_CHECKSIG
        let hex = format!("76a914{}88ac", "00".repeat(20));
        let addr = output_address(&spk(&hex), Network::Bitcoin).unwrap();
        assert!(addr.starts_with('1'));
    }

    #[test]
    fn p2wpkh_decodes_locally() {
        let hex = format!("0014{}", "00".repeat(20));
        let addr = output_address(&spk(&hex), Network::Bitcoin).unwrap();
        assert!(addr.starts_with("bc1q"));
    }

    #[test]
    fn p2tr_decodes_locally() {
        let hex = format!("5120{}", "02".repeat(32));
        let addr = output_address(&spk(&hex), Network::Bitcoin).unwrap();
        assert!(addr.starts_with("bc1p"));
    }

    #[test]
    fn op_return_has_no_address() {
        assert!(output_address(&spk("6a0401020304"), Network::Bitcoin).is_none());
    }

    #[test]
    fn p2pk_has_no_address() {
        // Raw pubkey scripts (early coinbases) have no canonical address
        // unless the node supplies one.
        let hex = format!("41{}ac", "04".repeat(65));
        assert!(output_address(&spk(&hex), Network::Bitcoin).is_none());
    }

    #[test]
    fn empty_script_has_no_address() {
        assert!(output_address(&ScriptPubKey::default(), Network::Bitcoin).is_none());
    }
}
