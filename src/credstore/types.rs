//! Credential records and the enumerations used to address them.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Secure tags owned by the modem firmware. Bulk operations never touch them.
pub const RESERVED_TAGS: [u32; 3] = [4_294_967_292, 4_294_967_293, 4_294_967_294];

pub fn is_reserved_tag(tag: u32) -> bool {
    RESERVED_TAGS.contains(&tag)
}

/// Kind of a stored credential, with the modem's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredType {
    RootCaCert,
    ClientCert,
    ClientKey,
    Psk,
    PskIdentity,
    PublicKey,
    DeviceIdPublicKey,
    Reserved,
    EndorsementKey,
    OwnershipKey,
    NordicIdRootCa,
    NordicPublicKey,
}

impl CredType {
    pub const ALL: [CredType; 12] = [
        CredType::RootCaCert,
        CredType::ClientCert,
        CredType::ClientKey,
        CredType::Psk,
        CredType::PskIdentity,
        CredType::PublicKey,
        CredType::DeviceIdPublicKey,
        CredType::Reserved,
        CredType::EndorsementKey,
        CredType::OwnershipKey,
        CredType::NordicIdRootCa,
        CredType::NordicPublicKey,
    ];

    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            CredType::RootCaCert => 0,
            CredType::ClientCert => 1,
            CredType::ClientKey => 2,
            CredType::Psk => 3,
            CredType::PskIdentity => 4,
            CredType::PublicKey => 5,
            CredType::DeviceIdPublicKey => 6,
            CredType::Reserved => 7,
            CredType::EndorsementKey => 8,
            CredType::OwnershipKey => 9,
            CredType::NordicIdRootCa => 10,
            CredType::NordicPublicKey => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CredType::RootCaCert => "ROOT_CA_CERT",
            CredType::ClientCert => "CLIENT_CERT",
            CredType::ClientKey => "CLIENT_KEY",
            CredType::Psk => "PSK",
            CredType::PskIdentity => "PSK_IDENTITY",
            CredType::PublicKey => "PUBLIC_KEY",
            CredType::DeviceIdPublicKey => "DEVICE_ID_PUBLIC_KEY",
            CredType::Reserved => "RESERVED",
            CredType::EndorsementKey => "ENDORSEMENT_KEY",
            CredType::OwnershipKey => "OWNERSHIP_KEY",
            CredType::NordicIdRootCa => "NORDIC_ID_ROOT_CA",
            CredType::NordicPublicKey => "NORDIC_PUBLIC_KEY",
        }
    }
}

impl fmt::Display for CredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for CredType {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        CredType::ALL
            .into_iter()
            .find(|t| u32::from(t.code()) == code)
            .ok_or(code)
    }
}

impl FromStr for CredType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CredType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown credential type '{s}'"))
    }
}

/// Type restriction for a listing. `Any` exists only here, never on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    Any,
    Only(CredType),
}

impl From<CredType> for TypeFilter {
    fn from(cred_type: CredType) -> Self {
        TypeFilter::Only(cred_type)
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFilter::Any => f.write_str("ANY"),
            TypeFilter::Only(t) => t.fmt(f),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ANY") {
            Ok(TypeFilter::Any)
        } else {
            s.parse().map(TypeFilter::Only)
        }
    }
}

/// One credential as reported by the modem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub tag: u32,
    #[serde(rename = "type")]
    pub cred_type: CredType,
    /// Digest reported by the modem, never computed locally.
    pub sha: String,
}

/// Radio functional mode set with `AT+CFUN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionalMode {
    PowerOff,
    Normal,
    /// Radio off; required for credential storage operations.
    Offline,
}

impl FunctionalMode {
    pub fn code(self) -> u8 {
        match self {
            FunctionalMode::PowerOff => 0,
            FunctionalMode::Normal => 1,
            FunctionalMode::Offline => 4,
        }
    }
}
