//! CIP-67 asset name labels and the CIP-68 metadata datum.
//!
//! # Layout
//! ```text
//! asset name = label prefix (4 bytes) || token name (UTF-8)
//! prefix     = 0 | label (16 bits) | crc8(label) | 0   (nibbles)
//! datum      = Constr 0 [ { "name": .., "image": .. }, version ]
//! ```

use crate::blockchain::plutus::PlutusData;
use crate::blockchain::types::PolicyId;

/// Reference NFT carrying the metadata datum.
pub const REFERENCE_NFT_LABEL: u16 = 100;
/// User-held NFT.
pub const USER_NFT_LABEL: u16 = 222;
/// User-held fungible token.
pub const USER_FT_LABEL: u16 = 333;
/// User-held rich fungible token.
pub const USER_RFT_LABEL: u16 = 444;

/// Asset names are capped at 32 bytes by the ledger.
pub const MAX_ASSET_NAME_LEN: usize = 32;

/// CRC-8 with polynomial 0x07, as CIP-67 prescribes for the label checksum.
fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Four byte CIP-67 prefix for `label`.
pub fn label_prefix(label: u16) -> [u8; 4] {
    let checksum = crc8(&label.to_be_bytes());
    let packed = (u32::from(label) << 12) | (u32::from(checksum) << 4);
    packed.to_be_bytes()
}

/// Recover the label from a prefixed asset name, if it carries a valid one.
pub fn parse_label(asset_name: &[u8]) -> Option<u16> {
    let prefix: [u8; 4] = asset_name.get(..4)?.try_into().ok()?;
    let packed = u32::from_be_bytes(prefix);
    if packed & 0xf000_000f != 0 {
        return None;
    }
    let label = u16::try_from(packed >> 12).ok()?;
    (label_prefix(label) == prefix).then_some(label)
}

/// Label prefix followed by the token name.
pub fn asset_name(label: u16, token_name: &str) -> Vec<u8> {
    let mut name = label_prefix(label).to_vec();
    name.extend_from_slice(token_name.as_bytes());
    name
}

/// Fully qualified asset unit: policy id hex followed by asset name hex.
pub fn to_unit(policy_id: &PolicyId, asset_name: &[u8]) -> String {
    format!("{}{}", policy_id, hex::encode(asset_name))
}

/// Token metadata carried in the reference datum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cip68Metadata {
    pub name: String,
    pub image: String,
    pub version: u64,
}

impl Cip68Metadata {
    pub fn to_datum(&self) -> PlutusData {
        let metadata = PlutusData::Map(vec![
            (PlutusData::text("name"), PlutusData::text(&self.name)),
            (PlutusData::text("image"), PlutusData::text(&self.image)),
        ]);
        PlutusData::constr(0, vec![metadata, PlutusData::Int(i128::from(self.version))])
    }

    /// Read name, image and version back out of a reference datum.
    pub fn from_datum(datum: &PlutusData) -> Option<Self> {
        let PlutusData::Constr { alternative: 0, fields } = datum else {
            return None;
        };
        let (PlutusData::Map(entries), PlutusData::Int(version)) = (fields.first()?, fields.get(1)?)
        else {
            return None;
        };
        let lookup = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| k.as_bytes() == Some(key.as_bytes()))
                .and_then(|(_, v)| v.as_bytes())
                .and_then(|b| String::from_utf8(b.to_vec()).ok())
        };
        Some(Self {
            name: lookup("name")?,
            image: lookup("image")?,
            version: u64::try_from(*version).ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_label_prefixes() {
        assert_eq!(hex::encode(label_prefix(REFERENCE_NFT_LABEL)), "000643b0");
        assert_eq!(hex::encode(label_prefix(USER_NFT_LABEL)), "000de140");
        assert_eq!(hex::encode(label_prefix(USER_FT_LABEL)), "0014df10");
        assert_eq!(hex::encode(label_prefix(USER_RFT_LABEL)), "001bc280");
    }

    #[test]
    fn test_parse_label() {
        let name = asset_name(USER_NFT_LABEL, "Akyba");
        assert_eq!(parse_label(&name), Some(USER_NFT_LABEL));
        assert_eq!(parse_label(b"Akyba"), None);
        // right shape, wrong checksum
        assert_eq!(parse_label(&hex::decode("000643c0").unwrap()), None);
    }

    #[test]
    fn test_asset_unit() {
        let policy = PolicyId([0x01; 28]);
        let name = asset_name(REFERENCE_NFT_LABEL, "Akyba");
        let unit = to_unit(&policy, &name);
        assert_eq!(unit, format!("{}000643b0416b796261", "01".repeat(28)));
    }

    #[test]
    fn test_datum_layout() {
        let metadata = Cip68Metadata {
            name: "Akyba".into(),
            image: "ipfs://x".into(),
            version: 1,
        };
        let hex_datum = metadata.to_datum().to_hex().unwrap();
        // Constr 0, two fields, map of two entries, "name" key first
        assert!(hex_datum.starts_with("d87982a2446e616d6545416b796261"));
        assert!(hex_datum.ends_with("01"));
        assert_eq!(Cip68Metadata::from_datum(&metadata.to_datum()), Some(metadata));
    }
}
