//! Firmware version parsing
//!
//! The robot reports versions such as `v8.1.6.141` (GetFwVersion) or embeds
//! them in the welcome text (`Connected to Meca500 R3 v8.1.6.`). Only the
//! first three components are significant for protocol selection.

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

use crate::{MecaError, Result};

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"v?(\d+)\.(\d+)\.(\d+)").expect("version pattern is valid")
    })
}

/// Extract the first `major.minor.patch` triple from firmware text
pub fn parse_firmware_version(text: &str) -> Result<Version> {
    let captures = version_pattern()
        .captures(text)
        .ok_or_else(|| MecaError::Protocol(format!("No firmware version in {:?}", text)))?;

    let triple = format!("{}.{}.{}", &captures[1], &captures[2], &captures[3]);
    Ok(Version::parse(&triple)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fw_version_reply() {
        assert_eq!(parse_firmware_version("v8.1.6.141").unwrap(), Version::new(8, 1, 6));
    }

    #[test]
    fn test_welcome_text() {
        let version = parse_firmware_version("Connected to Meca500 R3 v7.0.6.").unwrap();
        assert_eq!(version, Version::new(7, 0, 6));
    }

    #[test]
    fn test_plain_triple() {
        assert_eq!(parse_firmware_version("9.0.0").unwrap(), Version::new(9, 0, 0));
    }

    #[test]
    fn test_missing_version() {
        assert!(parse_firmware_version("Connected to Meca500").is_err());
    }
}
