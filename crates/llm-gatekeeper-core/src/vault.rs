//! Request-scoped reversible redaction store.
//!
//! Anonymizing scanners record `placeholder -> original` mappings here and the
//! de-anonymizing scanner restores them on the way out. A vault lives exactly as
//! long as the request that created it; there is no shared or global instance.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

const PLACEHOLDER_PREFIX: &str = "REDACTED";
const SCOPE_TAG_LEN: usize = 8;

/// Errors returned by vault lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("no vault entry for placeholder {0}")]
    NotFound(String),
}

/// A single recorded redaction.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultEntry {
    pub placeholder: String,
    pub original_value: String,
    pub entity_type: String,
}

impl fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultEntry")
            .field("placeholder", &self.placeholder)
            .field("original_value", &"<redacted>")
            .field("entity_type", &self.entity_type)
            .finish()
    }
}

/// Handle to a freshly created placeholder.
///
/// The label (`REDACTED_SSN_1`) is the vault key; the token (`[REDACTED_SSN_1]`)
/// is what gets written into the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder(String);

impl Placeholder {
    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn token(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Reversible mapping store for one request.
pub struct Vault {
    scope: Option<String>,
    entries: HashMap<String, VaultEntry>,
    counters: HashMap<String, usize>,
}

impl Vault {
    /// Unscoped vault: placeholders take the plain sequential form
    /// `REDACTED_<TYPE>_<n>`, which repeats across vaults. Use [`Vault::scoped`]
    /// wherever vaults from different requests can meet.
    pub fn new() -> Self {
        Self {
            scope: None,
            entries: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    /// Vault with a random scope tag appended to every placeholder, so two
    /// requests never emit the same placeholder for the same value.
    pub fn scoped() -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        Self::with_scope(&tag[..SCOPE_TAG_LEN])
    }

    /// Vault with an explicit scope tag.
    pub fn with_scope(tag: impl Into<String>) -> Self {
        Self {
            scope: Some(normalize(&tag.into())),
            ..Self::new()
        }
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Store `original` and return a placeholder unique within this vault.
    ///
    /// Every call creates a new placeholder, even for a value seen before.
    pub fn anonymize(&mut self, original: &str, entity_type: &str) -> Placeholder {
        let entity = normalize(entity_type);

        loop {
            let counter = self.counters.entry(entity.clone()).or_insert(0);
            *counter += 1;

            let label = match &self.scope {
                Some(scope) => format!("{PLACEHOLDER_PREFIX}_{entity}_{counter}_{scope}"),
                None => format!("{PLACEHOLDER_PREFIX}_{entity}_{counter}"),
            };

            // Write-once: an occupied label is never overwritten.
            if let Entry::Vacant(slot) = self.entries.entry(label.clone()) {
                slot.insert(VaultEntry {
                    placeholder: label.clone(),
                    original_value: original.to_string(),
                    entity_type: entity.clone(),
                });
                return Placeholder(label);
            }
        }
    }

    /// Look up the original value for a placeholder label or token.
    pub fn resolve(&self, placeholder: &str) -> Result<&str, VaultError> {
        self.entry(placeholder)
            .map(|entry| entry.original_value.as_str())
            .ok_or_else(|| VaultError::NotFound(placeholder.to_string()))
    }

    /// Full entry for a placeholder label or token.
    pub fn entry(&self, placeholder: &str) -> Option<&VaultEntry> {
        self.entries.get(strip_brackets(placeholder))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("scope", &self.scope)
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn strip_brackets(placeholder: &str) -> &str {
    placeholder
        .strip_prefix('[')
        .and_then(|p| p.strip_suffix(']'))
        .unwrap_or(placeholder)
}

/// Uppercase entity names with `_` in place of anything non-alphanumeric.
fn normalize(value: &str) -> String {
    let normalized: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();

    if normalized.is_empty() {
        "ENTITY".to_string()
    } else {
        normalized
    }
}
