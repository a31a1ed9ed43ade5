//! IPv4 network ranges used to scope firewall rules.
//!
//! A `SubnetSpec` can only be built through validation, so every value the
//! rest of the crate sees has octets <= 255 and a prefix <= 32.
mod detect;
mod resolve;

pub use detect::{
    detect_subnet, parse_default_route_interface, parse_first_ipv4, IpCommandInspector,
    NetworkInspector,
};
pub use resolve::{Input, Prompt, Resolution, ResolveMachine, ResolveState, SubnetResolver};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Prefix lengths at or below this cover far more than a typical private LAN.
pub const BROAD_PREFIX_MAX: u8 = 16;
/// Literal pattern quoted in validation errors.
pub const SUBNET_PATTERN: &str = "A.B.C.D/N";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubnetError {
    #[error("invalid subnet {input:?}: expected {SUBNET_PATTERN} (e.g. 192.168.1.0/24)")]
    Format { input: String },

    #[error("invalid subnet {input:?}: octet {octet:?} is not numeric (expected {SUBNET_PATTERN})")]
    NonNumericOctet { input: String, octet: String },

    #[error("invalid subnet {input:?}: octet {octet} is greater than 255 (expected {SUBNET_PATTERN})")]
    OctetOutOfRange { input: String, octet: String },

    #[error("invalid subnet {input:?}: prefix /{prefix} is greater than 32 (expected {SUBNET_PATTERN})")]
    PrefixOutOfRange { input: String, prefix: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubnetSpec {
    octets: [u8; 4],
    prefix: u8,
}

impl SubnetSpec {
    /// Validate a literal such as `192.168.1.0/24`.
    pub fn parse(literal: &str) -> Result<Self, SubnetError> {
        let input = literal.trim();
        let format_error = || SubnetError::Format {
            input: input.to_string(),
        };
        let (address, prefix) = input.split_once('/').ok_or_else(format_error)?;
        let parts: Vec<&str> = address.split('.').collect();
        if parts.len() != 4 {
            return Err(format_error());
        }

        let mut octets = [0u8; 4];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SubnetError::NonNumericOctet {
                    input: input.to_string(),
                    octet: part.to_string(),
                });
            }
            *slot = part.parse().map_err(|_| SubnetError::OctetOutOfRange {
                input: input.to_string(),
                octet: part.to_string(),
            })?;
        }

        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format_error());
        }
        let prefix_value = prefix
            .parse::<u8>()
            .ok()
            .filter(|value| *value <= 32)
            .ok_or_else(|| SubnetError::PrefixOutOfRange {
                input: input.to_string(),
                prefix: prefix.to_string(),
            })?;

        Ok(Self {
            octets,
            prefix: prefix_value,
        })
    }

    /// Network containing `address` under `prefix`, host bits cleared.
    pub fn containing(address: Ipv4Addr, prefix: u8) -> Option<Self> {
        if prefix > 32 {
            return None;
        }
        let masked = u32::from(address) & prefix_mask(prefix);
        Some(Self {
            octets: Ipv4Addr::from(masked).octets(),
            prefix,
        })
    }

    pub fn network_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.octets)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }

    pub fn is_broad(&self) -> bool {
        self.prefix <= BROAD_PREFIX_MAX
    }

    /// Number of addresses the range spans.
    pub fn address_count(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let mask = prefix_mask(self.prefix);
        u32::from(address) & mask == u32::from(self.network_address()) & mask
    }
}

fn prefix_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl fmt::Display for SubnetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network_address(), self.prefix)
    }
}

impl FromStr for SubnetSpec {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SubnetSpec {
    type Error = SubnetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubnetSpec> for String {
    fn from(value: SubnetSpec) -> Self {
        value.to_string()
    }
}
