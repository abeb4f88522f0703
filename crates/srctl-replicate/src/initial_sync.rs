//! Initial Sync (`spec.md` §4.7): a one-shot walk of the source registry run
//! before the streaming loop starts, for subjects that already existed
//! before replication began. List subjects, optionally filtered; for each,
//! list versions and fetch the full schema (including opaque `metadata`/
//! `ruleSet` passthrough) and register it on the target. A single subject's
//! failure is logged and counted, not fatal to the rest of the sync.

use srctl_core::{RegisterRequest, SourceClient, SrctlError, TargetClient};
use srctl_decode::Glob;
use srctl_metrics::Stats;
use tracing::warn;

pub async fn run(
    source: &dyn SourceClient,
    target: &dyn TargetClient,
    filter: &Glob,
    preserve_ids: bool,
    stats: &Stats,
) -> Result<(), SrctlError> {
    let subjects = source.list_subjects().await?;

    for subject in subjects {
        if !filter.matches(&subject) {
            stats.incr_events_filtered();
            continue;
        }
        if let Err(e) = sync_subject(source, target, &subject, preserve_ids, stats).await {
            warn!(subject = %subject, error = %e, "initial sync failed for subject");
            stats.incr_errors();
        }
    }

    Ok(())
}

async fn sync_subject(
    source: &dyn SourceClient,
    target: &dyn TargetClient,
    subject: &str,
    preserve_ids: bool,
    stats: &Stats,
) -> Result<(), SrctlError> {
    let versions = source.list_versions(subject).await?;

    if preserve_ids {
        target.set_subject_mode(subject, "IMPORT").await?;
    }

    let mut first_error = None;
    for version in versions {
        if let Err(e) = sync_version(source, target, subject, version, preserve_ids, stats).await {
            warn!(subject = %subject, version, error = %e, "failed to sync schema version");
            stats.incr_errors();
            first_error.get_or_insert(e);
        }
    }

    if preserve_ids {
        if let Err(e) = target.set_subject_mode(subject, "READWRITE").await {
            warn!(subject = %subject, error = %e, "failed to restore READWRITE mode after initial sync");
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn sync_version(
    source: &dyn SourceClient,
    target: &dyn TargetClient,
    subject: &str,
    version: i32,
    preserve_ids: bool,
    stats: &Stats,
) -> Result<(), SrctlError> {
    let schema = source.get_schema(subject, version).await?;
    let req = RegisterRequest {
        schema: schema.schema,
        schema_type: schema.schema_type,
        references: schema.references,
        id: if preserve_ids { Some(schema.id) } else { None },
        metadata: schema.metadata,
        rule_set: schema.rule_set,
    };
    match target.register_schema(subject, req).await {
        Ok(_) => {
            stats.incr_schemas();
            Ok(())
        }
        Err(e) if e.is_already_registered() => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srctl_registry::FakeRegistryClient;

    async fn seed(registry: &FakeRegistryClient, subject: &str, versions: usize) {
        for _ in 0..versions {
            registry
                .register_schema(
                    subject,
                    RegisterRequest {
                        schema: "{}".to_string(),
                        schema_type: "AVRO".to_string(),
                        references: vec![],
                        id: None,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn syncs_all_versions_of_every_matching_subject() {
        let source = FakeRegistryClient::new();
        seed(&source, "u-v", 2).await;
        seed(&source, "o-v", 1).await;
        let target = FakeRegistryClient::new();
        let stats = Stats::new();

        run(&source, &target, &Glob::new(""), false, &stats).await.unwrap();

        assert_eq!(stats.snapshot().schemas, 3);
    }

    #[tokio::test]
    async fn filter_excludes_non_matching_subjects() {
        let source = FakeRegistryClient::new();
        seed(&source, "user-v", 1).await;
        seed(&source, "order-v", 1).await;
        let target = FakeRegistryClient::new();
        let stats = Stats::new();

        run(&source, &target, &Glob::new("user-*"), false, &stats)
            .await
            .unwrap();

        assert_eq!(stats.snapshot().schemas, 1);
        assert_eq!(stats.snapshot().events_filtered, 1);
    }

    #[tokio::test]
    async fn preserve_ids_brackets_subject_in_import_mode() {
        let source = FakeRegistryClient::new();
        seed(&source, "u-v", 1).await;
        let target = FakeRegistryClient::new();
        let stats = Stats::new();

        run(&source, &target, &Glob::new(""), true, &stats).await.unwrap();

        let state = target.subject_state("u-v").unwrap();
        assert_eq!(state.mode, "READWRITE");
        assert_eq!(stats.snapshot().schemas, 1);
    }

    #[tokio::test]
    async fn one_subject_failing_does_not_stop_the_rest() {
        let source = FakeRegistryClient::new();
        seed(&source, "u-v", 1).await;
        // "o-v" was never seeded on the source, so list_versions on it would
        // fail if we tried — instead simulate a target-side failure for the
        // one subject that does exist, and confirm the walk still returns Ok
        // overall (errors are counted, not propagated) when invoked via the
        // top-level `run`.
        let target = FakeRegistryClient::new();
        target.fail_next_register(SrctlError::ServerError(500, "boom".to_string()));
        let stats = Stats::new();

        run(&source, &target, &Glob::new(""), false, &stats).await.unwrap();

        assert_eq!(stats.snapshot().errors, 1);
        assert_eq!(stats.snapshot().schemas, 0);
    }
}
