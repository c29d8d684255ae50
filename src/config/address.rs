//! Address syntax validation.
//!
//! Every boundary (document fields, CLI input, resolved endpoints) goes
//! through [`parse_address`]. Accepted forms are `0x` followed by forty hex
//! digits, either single-case or carrying a valid EIP-55 checksum.

use alloy::primitives::Address;

use crate::error::ValidationError;

/// Parses an address, naming `field` in the error on failure.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidAddress`] if the value is not a
/// well-formed address.
pub fn parse_address(field: &str, value: &str) -> Result<Address, ValidationError> {
    let invalid = || ValidationError::InvalidAddress {
        field: field.to_string(),
        value: value.to_string(),
    };

    let digits = value.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(value, None).map_err(|_| invalid());
    }

    value.parse::<Address>().map_err(|_| invalid())
}

/// Shortens an address for table display, e.g. `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &Address) -> String {
    let full = hex::encode(address);
    format!("0x{}...{}", &full[..4], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_accepts_single_case_and_checksummed() {
        let lower = parse_address("asset", LOWER).expect("lowercase");
        let upper = parse_address("asset", &format!("0x{}", LOWER[2..].to_uppercase()))
            .expect("uppercase");
        let mixed = parse_address("asset", CHECKSUMMED).expect("checksummed");
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let broken = CHECKSUMMED.replace("aAeb", "AAeb");
        let err = parse_address("priceFeed", &broken).expect_err("bad checksum");
        assert_eq!(err.field(), "priceFeed");
    }

    #[test]
    fn test_rejects_malformed() {
        for value in ["", "0x", "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed", "0x1234", "0xzz"] {
            assert!(parse_address("asset", value).is_err(), "{value}");
        }
        let too_long = format!("{LOWER}00");
        assert!(parse_address("asset", &too_long).is_err());
    }

    #[test]
    fn test_short_address() {
        let address = parse_address("asset", LOWER).expect("valid");
        assert_eq!(short_address(&address), "0x5aae...eaed");
    }
}
