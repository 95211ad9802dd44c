//! Archivist configuration via `archivist.toml`
//!
//! Every field has a default, so an empty file is a valid configuration.
//! `Repository::new` validates the configuration before building the
//! store and the modifier registry from it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use archivist_core::{ArchivistError, ArchivistResult};
use archivist_storage::get_codec;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "archivist.toml";

/// How children of folderish objects are versioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildrenPolicy {
    /// Children keep their own lifecycle; a folder version only records
    /// which children it had
    Outside,
    /// Children are versioned together with the folder
    Inside,
}

/// Standard modifier settings, persisted under `[modifiers]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModifierConfig {
    /// Keep the live workflow state and history on retrieve.
    #[serde(default = "default_true")]
    pub retain_workflow: bool,
    /// Keep the live permission settings on retrieve.
    #[serde(default = "default_true")]
    pub retain_permissions: bool,
    /// Attribute holding a folder's children.
    #[serde(default = "default_children_attribute")]
    pub children_attribute: String,
    /// `"outside"` (default) or `"inside"`.
    #[serde(default = "default_children_policy")]
    pub children_policy: String,
    /// Types whose children are inside references regardless of
    /// `children_policy`.
    #[serde(default)]
    pub inside_children_types: Vec<String>,
    /// Attributes stored as referenced data instead of inline.
    #[serde(default = "default_by_reference")]
    pub by_reference: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_children_attribute() -> String {
    "children".to_string()
}

fn default_children_policy() -> String {
    "outside".to_string()
}

fn default_by_reference() -> Vec<String> {
    vec!["file".to_string()]
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            retain_workflow: true,
            retain_permissions: true,
            children_attribute: default_children_attribute(),
            children_policy: default_children_policy(),
            inside_children_types: Vec::new(),
            by_reference: default_by_reference(),
        }
    }
}

impl ModifierConfig {
    /// Parse the children policy string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"outside"` or `"inside"`.
    pub fn children_policy(&self) -> ArchivistResult<ChildrenPolicy> {
        match self.children_policy.as_str() {
            "outside" => Ok(ChildrenPolicy::Outside),
            "inside" => Ok(ChildrenPolicy::Inside),
            other => Err(ArchivistError::InvalidConfig(format!(
                "Invalid children_policy '{}'. Expected \"outside\" or \"inside\".",
                other
            ))),
        }
    }
}

/// Configuration loaded from `archivist.toml`.
///
/// # Example
///
/// ```toml
/// autoregister = false
/// codec = "crc32"
///
/// [modifiers]
/// children_policy = "inside"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivistConfig {
    /// Register unregistered objects on save instead of failing.
    #[serde(default)]
    pub autoregister: bool,
    /// How long a writer waits for a history's write lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Upper bound on objects copied by one clone.
    #[serde(default = "default_max_clone_nodes")]
    pub max_clone_nodes: usize,
    /// Snapshot codec: `"identity"` or `"crc32"`.
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Attributes whose live values are preserved when reverting.
    #[serde(default = "default_revert_preserve")]
    pub revert_preserve: Vec<String>,
    /// Standard modifier settings.
    #[serde(default)]
    pub modifiers: ModifierConfig,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_max_clone_nodes() -> usize {
    100_000
}

fn default_codec() -> String {
    "crc32".to_string()
}

fn default_revert_preserve() -> Vec<String> {
    vec!["review_state".to_string(), "workflow_history".to_string()]
}

impl Default for ArchivistConfig {
    fn default() -> Self {
        Self {
            autoregister: false,
            lock_timeout_ms: default_lock_timeout_ms(),
            max_clone_nodes: default_max_clone_nodes(),
            codec: default_codec(),
            revert_preserve: default_revert_preserve(),
            modifiers: ModifierConfig::default(),
        }
    }
}

impl ArchivistConfig {
    /// Check every field that has a restricted value set.
    ///
    /// # Errors
    ///
    /// Returns `ArchivistError::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> ArchivistResult<()> {
        get_codec(&self.codec).map_err(|e| {
            ArchivistError::InvalidConfig(format!("codec '{}': {}", self.codec, e))
        })?;
        if self.lock_timeout_ms == 0 {
            return Err(ArchivistError::InvalidConfig(
                "lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_clone_nodes == 0 {
            return Err(ArchivistError::InvalidConfig(
                "max_clone_nodes must be greater than zero".to_string(),
            ));
        }
        if self.modifiers.children_attribute.is_empty() {
            return Err(ArchivistError::InvalidConfig(
                "modifiers.children_attribute must not be empty".to_string(),
            ));
        }
        self.modifiers.children_policy()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Archivist configuration
#
# Register objects on their first save instead of failing (default: false)
autoregister = false

# Milliseconds a writer waits for a history's write lock (default: 5000)
lock_timeout_ms = 5000

# Upper bound on objects copied by a single clone (default: 100000)
max_clone_nodes = 100000

# Snapshot codec: "crc32" (default) or "identity"
codec = "crc32"

# Attributes whose live values are kept when reverting
revert_preserve = ["review_state", "workflow_history"]

[modifiers]
retain_workflow = true
retain_permissions = true
children_attribute = "children"
# "outside" = children keep their own history (default)
# "inside"  = children are versioned together with their folder
children_policy = "outside"
# inside_children_types = ["Folder"]
by_reference = ["file"]
"#
    }

    /// Parse config from a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> ArchivistResult<Self> {
        let config: ArchivistConfig = toml::from_str(content)
            .map_err(|e| ArchivistError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> ArchivistResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ArchivistError::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> ArchivistResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                ArchivistError::InvalidConfig(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> ArchivistResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ArchivistError::InvalidConfig(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content).map_err(|e| {
            ArchivistError::InvalidConfig(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
