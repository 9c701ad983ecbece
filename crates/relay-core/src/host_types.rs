use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Media host backend types
///
/// This enum defines the available outbound hosting backends.
/// It's defined in core because it's used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostBackend {
    Cloudinary,
    Local,
}

impl FromStr for HostBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloudinary" => Ok(HostBackend::Cloudinary),
            "local" => Ok(HostBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid media host backend: {}", s)),
        }
    }
}

impl Display for HostBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            HostBackend::Cloudinary => write!(f, "cloudinary"),
            HostBackend::Local => write!(f, "local"),
        }
    }
}

/// Visibility directive sent with every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Public,
    Authenticated,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Public => "public",
            AccessMode::Authenticated => "authenticated",
        }
    }
}

impl FromStr for AccessMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(AccessMode::Public),
            "authenticated" => Ok(AccessMode::Authenticated),
            _ => Err(anyhow::anyhow!("Invalid access mode: {}", s)),
        }
    }
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Digest used to sign Cloudinary upload parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl FromStr for SignatureAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            _ => Err(anyhow::anyhow!("Invalid signature algorithm: {}", s)),
        }
    }
}
