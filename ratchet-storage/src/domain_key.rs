//! Domain-scoped storage keys for multi-domain isolation.
//!
//! Several ledger domains (projects) can share one backing store. Every key
//! is prefixed with its domain tag so that one domain's sweep or listing can
//! never touch another domain's entries.

/// Separator byte between the domain tag and the entity id.
/// 0xFF never occurs in valid UTF-8, so the split is unambiguous for any
/// domain tag and id.
const SEPARATOR: u8 = 0xFF;

/// A storage key scoped to a specific ledger domain.
///
/// # Binary Format
///
/// The key encodes to `[domain utf8][0xFF][id utf8]`. Keys sort by domain
/// first, so a range scan over `domain_prefix` visits exactly one domain's
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainScopedKey {
    domain: String,
    id: String,
}

impl DomainScopedKey {
    /// Create a new domain-scoped key.
    pub fn new(domain: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            id: id.into(),
        }
    }

    /// The domain tag this key is scoped to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The entity id within the domain.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Encode this key to bytes for storage.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.domain.len() + 1 + self.id.len());
        bytes.extend_from_slice(self.domain.as_bytes());
        bytes.push(SEPARATOR);
        bytes.extend_from_slice(self.id.as_bytes());
        bytes
    }

    /// Decode a key from bytes.
    ///
    /// Returns `None` if the separator is missing or either side is not
    /// valid UTF-8.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let split = bytes.iter().position(|&b| b == SEPARATOR)?;
        let domain = std::str::from_utf8(&bytes[..split]).ok()?;
        let id = std::str::from_utf8(&bytes[split + 1..]).ok()?;
        Some(Self {
            domain: domain.to_string(),
            id: id.to_string(),
        })
    }

    /// Prefix for scanning all keys belonging to a domain.
    pub fn domain_prefix(domain: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(domain.len() + 1);
        prefix.extend_from_slice(domain.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }
}
