//! `--dry-run` target: logs every write the applier would have made instead
//! of calling the real registry. Useful for operators validating a filter
//! or `preserve_ids` setting before pointing the replicator at a live
//! target.

use async_trait::async_trait;
use srctl_core::{RegisterRequest, SrctlError, TargetClient};
use tracing::info;

#[derive(Default)]
pub struct DryRunTargetClient;

#[async_trait]
impl TargetClient for DryRunTargetClient {
    async fn register_schema(
        &self,
        subject: &str,
        req: RegisterRequest,
    ) -> Result<i32, SrctlError> {
        info!(
            subject,
            schema_type = %req.schema_type,
            id = ?req.id,
            "dry-run: would register schema"
        );
        Ok(req.id.unwrap_or(0))
    }

    async fn delete_subject(&self, subject: &str, permanent: bool) -> Result<Vec<i32>, SrctlError> {
        info!(subject, permanent, "dry-run: would delete subject");
        Ok(Vec::new())
    }

    async fn set_config(&self, compatibility: &str) -> Result<(), SrctlError> {
        info!(compatibility, "dry-run: would set global config");
        Ok(())
    }

    async fn set_subject_config(
        &self,
        subject: &str,
        compatibility: &str,
    ) -> Result<(), SrctlError> {
        info!(subject, compatibility, "dry-run: would set subject config");
        Ok(())
    }

    async fn set_subject_mode(&self, subject: &str, mode: &str) -> Result<(), SrctlError> {
        info!(subject, mode, "dry-run: would set subject mode");
        Ok(())
    }
}
