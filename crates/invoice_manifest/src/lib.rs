use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MANIFEST_SCHEMA: &str = "invoice_compositor.batch_manifest";
pub const MANIFEST_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub bytes: usize,
    pub sha256: String,
}

impl ManifestEntry {
    pub fn for_bytes(filename: impl Into<String>, data: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            bytes: data.len(),
            sha256: hex_sha256(data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFailure {
    pub record_id: String,
    pub message: String,
}

/// What a batch archive contains, and what it left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchManifest {
    pub schema: String,
    pub version: String,
    /// Archive members in archive order.
    pub entries: Vec<ManifestEntry>,
    pub failures: Vec<ManifestFailure>,
    /// Member names written more than once; the last write won.
    #[serde(default)]
    pub replaced: Vec<String>,
    /// SHA-256 over the name-sorted `(filename, sha256)` pairs.
    pub fingerprint: String,
}

impl BatchManifest {
    pub fn new(
        entries: Vec<ManifestEntry>,
        failures: Vec<ManifestFailure>,
        replaced: Vec<String>,
    ) -> Self {
        let fingerprint = fingerprint_entries(&entries);
        Self {
            schema: MANIFEST_SCHEMA.to_string(),
            version: MANIFEST_VERSION.to_string(),
            entries,
            failures,
            replaced,
            fingerprint,
        }
    }

    pub fn entry(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|entry| entry.filename == filename)
    }

    /// True when `data` is exactly what the manifest recorded for `filename`.
    pub fn verify_member(&self, filename: &str, data: &[u8]) -> bool {
        self.entry(filename)
            .is_some_and(|entry| entry.bytes == data.len() && entry.sha256 == hex_sha256(data))
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Recomputes the fingerprint and compares it with the stored one.
    pub fn fingerprint_matches(&self) -> bool {
        fingerprint_entries(&self.entries) == self.fingerprint
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn fingerprint_entries(entries: &[ManifestEntry]) -> String {
    let mut pairs: Vec<(&str, &str)> = entries
        .iter()
        .map(|entry| (entry.filename.as_str(), entry.sha256.as_str()))
        .collect();
    pairs.sort_unstable();
    let mut hasher = Sha256::new();
    for (filename, sha) in pairs {
        hasher.update(filename.as_bytes());
        hasher.update([0u8]);
        hasher.update(sha.as_bytes());
        hasher.update(b"\n");
    }
    let mut out = String::with_capacity(64);
    for b in hasher.finalize() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
