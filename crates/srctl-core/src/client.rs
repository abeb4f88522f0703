//! Capability surfaces the replication engine depends on instead of on HTTP
//! specifics directly (`spec.md` §6.2, §9 "Pattern: dynamic dispatch across
//! target/source clients"). `srctl-registry` provides a live `reqwest`
//! implementation of both traits; its `fake` module provides an in-memory
//! implementation used throughout the test suite.

use crate::error::SrctlError;
use crate::event::Reference;
use async_trait::async_trait;
use serde_json::Value;

/// Request body for registering a schema on the target.
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub schema: String,
    pub schema_type: String,
    pub references: Vec<Reference>,
    /// Present only when `preserve_ids` is set; the subject must already be
    /// in `IMPORT` mode on the target for this to be honoured.
    pub id: Option<i32>,
    /// Carried through opaquely from the source during initial sync
    /// (`spec.md` §4.7) — the core never interprets these, only forwards
    /// them. Absent on events decoded from the streaming log, which does
    /// not carry them.
    pub metadata: Option<Value>,
    pub rule_set: Option<Value>,
}

/// The write surface the applier needs against the target registry.
#[async_trait]
pub trait TargetClient: Send + Sync {
    async fn register_schema(
        &self,
        subject: &str,
        req: RegisterRequest,
    ) -> Result<i32, SrctlError>;

    /// Returns the versions that were deleted. "Not found" is an expected,
    /// non-fatal outcome the applier treats as idempotent success.
    async fn delete_subject(&self, subject: &str, permanent: bool) -> Result<Vec<i32>, SrctlError>;

    async fn set_config(&self, compatibility: &str) -> Result<(), SrctlError>;

    async fn set_subject_config(
        &self,
        subject: &str,
        compatibility: &str,
    ) -> Result<(), SrctlError>;

    /// `mode` is one of `READWRITE`, `READONLY`, `IMPORT`.
    async fn set_subject_mode(&self, subject: &str, mode: &str) -> Result<(), SrctlError>;
}

/// A schema version as read from the source registry during initial sync.
/// `metadata` and `ruleSet` are passed through opaquely — the core never
/// interprets them, only forwards them to the target on register.
#[derive(Debug, Clone)]
pub struct SourceSchema {
    pub id: i32,
    pub schema: String,
    pub schema_type: String,
    pub references: Vec<Reference>,
    pub metadata: Option<Value>,
    pub rule_set: Option<Value>,
}

/// The read surface the initial-sync walk needs against the source registry.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn list_subjects(&self) -> Result<Vec<String>, SrctlError>;
    async fn list_versions(&self, subject: &str) -> Result<Vec<i32>, SrctlError>;
    async fn get_schema(&self, subject: &str, version: i32) -> Result<SourceSchema, SrctlError>;
}
