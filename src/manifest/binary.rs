//! Binary-only dependency manifest (`CartfileBinary.yml`)
//!
//! ```yaml
//! public:
//!   - name: Lottie
//!     version: 4.4.0
//!     json_url: https://example.com/Lottie.json
//!   - name: Analytics
//!     version: 1.2.0
//!     url: https://example.com/Analytics-1.2.0.zip
//! private:
//!   - name: PaymentsSDK
//!     version: 3.1.0
//! ```
//!
//! Public entries are downloaded from their URL. Private entries have no
//! URL and are only ever fetched from the package registry.

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use crate::registry::Fetcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryManifest {
    pub public: Vec<PublicBinary>,
    pub private: Vec<PrivateBinary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicBinary {
    pub name: String,
    pub version: String,
    /// Direct archive URL
    #[serde(default)]
    pub url: Option<String>,
    /// Carthage binary spec: a JSON object of version -> archive URL
    #[serde(default, alias = "jsonURL")]
    pub json_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateBinary {
    pub name: String,
    pub version: String,
}

impl BinaryManifest {
    pub fn from_yaml(text: &str) -> CartwheelResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Turn entries into dependencies, public ones first. JSON binary
    /// specs are fetched to find the archive URL of the pinned version.
    ///
    /// Without a fetcher (offline) nothing is fetched and `json_url`
    /// entries keep the JSON URL as their source.
    pub async fn resolve(&self, fetcher: Option<&dyn Fetcher>) -> CartwheelResult<Vec<Dependency>> {
        let mut deps = Vec::with_capacity(self.public.len() + self.private.len());
        for entry in &self.public {
            let url = resolve_url(entry, fetcher).await?;
            deps.push(Dependency::new(&entry.name, &entry.version).with_source_url(url));
        }
        for entry in &self.private {
            deps.push(Dependency::new(&entry.name, &entry.version));
        }
        Ok(deps)
    }
}

async fn resolve_url(entry: &PublicBinary, fetcher: Option<&dyn Fetcher>) -> CartwheelResult<String> {
    if let Some(ref url) = entry.url {
        return Ok(url.clone());
    }
    let Some(ref spec_url) = entry.json_url else {
        return Err(CartwheelError::BinarySourceMissing(entry.name.clone()));
    };
    let Some(fetcher) = fetcher else {
        return Ok(spec_url.clone());
    };

    debug!("Fetching version list of {} from {}", entry.name, spec_url);
    let text = fetcher.fetch_text(spec_url).await?;
    let versions: HashMap<String, String> = serde_json::from_str(&text)?;

    report_newer_version(entry, &versions);

    versions
        .get(&entry.version)
        .cloned()
        .ok_or_else(|| CartwheelError::BinaryVersionUnlisted {
            name: entry.name.clone(),
            version: entry.version.clone(),
            spec_url: spec_url.clone(),
        })
}

fn parse_semver(text: &str) -> Option<semver::Version> {
    semver::Version::parse(text.trim_start_matches('v')).ok()
}

/// Highest semver among `versions` when it is above the pinned one
fn newer_version<'a>(pinned: &str, versions: impl Iterator<Item = &'a String>) -> Option<semver::Version> {
    let pinned = parse_semver(pinned)?;
    versions
        .filter_map(|v| parse_semver(v))
        .max()
        .filter(|latest| *latest > pinned)
}

fn report_newer_version(entry: &PublicBinary, versions: &HashMap<String, String>) {
    if let Some(latest) = newer_version(&entry.version, versions.keys()) {
        warn!(
            "Latest available version of {} is {} (you are using {})",
            entry.name, latest, entry.version
        );
    }
}
