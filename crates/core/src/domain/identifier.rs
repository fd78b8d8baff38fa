// Identifier Domain Model
//
// Equality and hashing of these types define both queue dedup identity and
// cache key identity.

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Identifier kind (one queue and one provider chain per kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Cell,
    Wifi,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Cell => "cell",
            IdentifierKind::Wifi => "wifi",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cell" => Ok(IdentifierKind::Cell),
            "wifi" => Ok(IdentifierKind::Wifi),
            other => Err(DomainError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Cell tower identifier (network and cell topology)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIdentifier {
    /// Mobile country code
    pub mcc: u16,
    /// Mobile network code
    pub mnc: u16,
    /// Location area code
    pub lac: u32,
    /// Cell id
    pub cid: u64,
}

impl CellIdentifier {
    pub fn new(mcc: u16, mnc: u16, lac: u32, cid: u64) -> Self {
        Self { mcc, mnc, lac, cid }
    }
}

impl fmt::Display for CellIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.mcc, self.mnc, self.lac, self.cid)
    }
}

impl FromStr for CellIdentifier {
    type Err = DomainError;

    /// Parses `mcc:mnc:lac:cid`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DomainError::InvalidIdentifier(format!("cell '{}'", s));

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 4 {
            return Err(invalid());
        }

        Ok(Self {
            mcc: parts[0].parse().map_err(|_| invalid())?,
            mnc: parts[1].parse().map_err(|_| invalid())?,
            lac: parts[2].parse().map_err(|_| invalid())?,
            cid: parts[3].parse().map_err(|_| invalid())?,
        })
    }
}

/// Wi-Fi access point identifier (hardware address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WifiIdentifier {
    pub bssid: [u8; 6],
}

impl WifiIdentifier {
    pub fn new(bssid: [u8; 6]) -> Self {
        Self { bssid }
    }
}

impl fmt::Display for WifiIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bssid;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for WifiIdentifier {
    type Err = DomainError;

    /// Parses `aa:bb:cc:dd:ee:ff` (case-insensitive, `:` or `-` separated)
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DomainError::InvalidIdentifier(format!("bssid '{}'", s));

        let parts: Vec<&str> = s.trim().split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut bssid = [0u8; 6];
        for (octet, part) in bssid.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }

        Ok(Self { bssid })
    }
}

/// Locatable entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identifier {
    Cell(CellIdentifier),
    Wifi(WifiIdentifier),
}

impl Identifier {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::Cell(_) => IdentifierKind::Cell,
            Identifier::Wifi(_) => IdentifierKind::Wifi,
        }
    }

    /// Kind-local key (the untagged text form)
    pub fn key(&self) -> String {
        match self {
            Identifier::Cell(cell) => cell.to_string(),
            Identifier::Wifi(wifi) => wifi.to_string(),
        }
    }

    /// Parse a kind-local key for the given kind
    pub fn from_key(kind: IdentifierKind, key: &str) -> Result<Self> {
        match kind {
            IdentifierKind::Cell => Ok(Identifier::Cell(key.parse()?)),
            IdentifierKind::Wifi => Ok(Identifier::Wifi(key.parse()?)),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.key())
    }
}

impl FromStr for Identifier {
    type Err = DomainError;

    /// Parses the tagged form `cell:<mcc>:<mnc>:<lac>:<cid>` or `wifi:<bssid>`
    fn from_str(s: &str) -> Result<Self> {
        let (tag, key) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidIdentifier(format!("missing kind tag in '{}'", s)))?;
        let kind: IdentifierKind = tag.parse()?;
        Identifier::from_key(kind, key)
    }
}

impl From<CellIdentifier> for Identifier {
    fn from(cell: CellIdentifier) -> Self {
        Identifier::Cell(cell)
    }
}

impl From<WifiIdentifier> for Identifier {
    fn from(wifi: WifiIdentifier) -> Self {
        Identifier::Wifi(wifi)
    }
}

/// A concrete identifier type with its own queue and provider chain
pub trait Locatable:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + Into<Identifier> + 'static
{
    const KIND: IdentifierKind;
}

impl Locatable for CellIdentifier {
    const KIND: IdentifierKind = IdentifierKind::Cell;
}

impl Locatable for WifiIdentifier {
    const KIND: IdentifierKind = IdentifierKind::Wifi;
}
