//! Metadata envelope stored with every snapshot
//!
//! `sys_metadata` is built by the archivist when a save is prepared;
//! `app_metadata` is an opaque caller value passed through unmodified.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;
use crate::value::Value;

/// Principal recorded when no user is known
pub const ANONYMOUS_PRINCIPAL: &str = "Anonymous User";

/// Acting user for one operation
///
/// Passed explicitly into `prepare`; nothing is looked up from global state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityContext {
    principal: String,
}

impl SecurityContext {
    /// Context acting as `principal`
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
        }
    }

    /// Context for an unauthenticated caller
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_PRINCIPAL)
    }

    /// The acting principal's identity
    pub fn principal(&self) -> &str {
        &self.principal
    }
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Caller-supplied parts of the system metadata
///
/// Missing fields are defaulted when the envelope is built: empty comment,
/// timestamp of the save, no originator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysMetadataInput {
    /// Free-text comment
    pub comment: Option<String>,
    /// Epoch seconds
    pub timestamp: Option<u64>,
    /// Originator of the change, if different from the principal
    pub originator: Option<String>,
}

impl SysMetadataInput {
    /// Empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set an explicit timestamp (epoch seconds)
    pub fn timestamp(mut self, secs: u64) -> Self {
        self.timestamp = Some(secs);
        self
    }

    /// Set the originator
    pub fn originator(mut self, originator: impl Into<String>) -> Self {
        self.originator = Some(originator.into());
        self
    }
}

/// System metadata of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysMetadata {
    /// Free-text comment
    pub comment: String,
    /// Epoch seconds
    pub timestamp: u64,
    /// Originator of the change
    pub originator: Option<String>,
    /// Acting principal at prepare time
    pub principal: String,
}

/// Full metadata envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// System metadata
    pub sys_metadata: SysMetadata,
    /// Opaque application metadata
    pub app_metadata: Value,
}

impl Metadata {
    /// Build the envelope, defaulting missing system fields
    pub fn build(input: SysMetadataInput, app_metadata: Value, ctx: &SecurityContext) -> Self {
        let timestamp = input
            .timestamp
            .unwrap_or_else(|| Timestamp::now().as_secs());
        Self {
            sys_metadata: SysMetadata {
                comment: input.comment.unwrap_or_default(),
                timestamp,
                originator: input.originator,
                principal: ctx.principal().to_string(),
            },
            app_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let before = Timestamp::now().as_secs();
        let md = Metadata::build(
            SysMetadataInput::new(),
            Value::Null,
            &SecurityContext::anonymous(),
        );
        assert_eq!(md.sys_metadata.comment, "");
        assert!(md.sys_metadata.timestamp >= before);
        assert_eq!(md.sys_metadata.originator, None);
        assert_eq!(md.sys_metadata.principal, ANONYMOUS_PRINCIPAL);
        assert_eq!(md.app_metadata, Value::Null);
    }

    #[test]
    fn test_build_keeps_explicit_fields() {
        let input = SysMetadataInput::new()
            .comment("first save")
            .timestamp(1234)
            .originator("0.1");
        let md = Metadata::build(input, Value::from("app"), &SecurityContext::new("reviewer"));
        assert_eq!(md.sys_metadata.comment, "first save");
        assert_eq!(md.sys_metadata.timestamp, 1234);
        assert_eq!(md.sys_metadata.originator.as_deref(), Some("0.1"));
        assert_eq!(md.sys_metadata.principal, "reviewer");
        assert_eq!(md.app_metadata, Value::from("app"));
    }
}
