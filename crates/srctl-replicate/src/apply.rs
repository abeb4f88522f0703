//! Target Applier (`spec.md` §4.3): dispatches one decoded [`SchemaEvent`]
//! to the target registry and updates the relevant Stats Core counter.
//! Operates purely against the [`TargetClient`] capability trait, so it is
//! exercised in tests against `FakeRegistryClient` with no network.

use srctl_core::{EventPayload, RegisterRequest, SchemaEvent, SrctlError, TargetClient};
use srctl_metrics::Stats;
use tracing::warn;

/// Applies one event. `preserve_ids` brackets a SCHEMA register in
/// `IMPORT`/`READWRITE` mode so the target accepts the source's schema id
/// verbatim (`spec.md` §4.3(a)).
pub async fn apply(
    event: &SchemaEvent,
    target: &dyn TargetClient,
    preserve_ids: bool,
    stats: &Stats,
) -> Result<(), SrctlError> {
    match &event.payload {
        EventPayload::Schema {
            schema_id,
            schema,
            schema_type,
            references,
            deleted,
        } => {
            if *deleted || event.tombstone {
                apply_schema_delete(event, target, stats).await
            } else {
                apply_schema_register(
                    event,
                    schema,
                    schema_type,
                    references,
                    *schema_id,
                    preserve_ids,
                    target,
                    stats,
                )
                .await
            }
        }
        EventPayload::Config { compatibility } => apply_config(event, compatibility, target, stats).await,
        // Global MODE events (empty subject) are dropped, per spec.md §9 —
        // there is no subject-scoped target operation they correspond to.
        EventPayload::Mode { mode } => {
            if event.is_global() {
                return Ok(());
            }
            apply_mode(event, mode, target, stats).await
        }
        EventPayload::DeleteSubject | EventPayload::ClearSubject => {
            apply_delete_subject(event, target, stats).await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn apply_schema_register(
    event: &SchemaEvent,
    schema: &str,
    schema_type: &str,
    references: &[srctl_core::Reference],
    schema_id: i32,
    preserve_ids: bool,
    target: &dyn TargetClient,
    stats: &Stats,
) -> Result<(), SrctlError> {
    let req = RegisterRequest {
        schema: schema.to_string(),
        schema_type: schema_type.to_string(),
        references: references.to_vec(),
        id: if preserve_ids { Some(schema_id) } else { None },
        ..Default::default()
    };

    if preserve_ids {
        target.set_subject_mode(&event.subject, "IMPORT").await?;
    }

    let register_result = target.register_schema(&event.subject, req).await;

    if preserve_ids {
        if let Err(e) = target.set_subject_mode(&event.subject, "READWRITE").await {
            warn!(subject = %event.subject, error = %e, "failed to restore READWRITE mode after register");
        }
    }

    match register_result {
        Ok(_) => {
            stats.incr_schemas();
            Ok(())
        }
        Err(e) if e.is_already_registered() => Ok(()),
        Err(e) => Err(e),
    }
}

async fn apply_schema_delete(
    event: &SchemaEvent,
    target: &dyn TargetClient,
    stats: &Stats,
) -> Result<(), SrctlError> {
    if event.is_global() {
        return Ok(());
    }
    // A null-value tombstone is permanent deletion; a `deleted: true` SCHEMA
    // value with a non-null record is a soft delete.
    match target.delete_subject(&event.subject, event.tombstone).await {
        Ok(_) => {
            stats.incr_deletes();
            Ok(())
        }
        Err(e) if e.is_not_found() || e.is_method_not_allowed() => Ok(()),
        Err(e) => Err(e),
    }
}

async fn apply_config(
    event: &SchemaEvent,
    compatibility: &str,
    target: &dyn TargetClient,
    stats: &Stats,
) -> Result<(), SrctlError> {
    let result = if event.is_global() {
        target.set_config(compatibility).await
    } else {
        target.set_subject_config(&event.subject, compatibility).await
    };
    result.map(|_| stats.incr_configs())
}

async fn apply_mode(
    event: &SchemaEvent,
    mode: &str,
    target: &dyn TargetClient,
    stats: &Stats,
) -> Result<(), SrctlError> {
    match target.set_subject_mode(&event.subject, mode).await {
        Ok(_) => {
            stats.incr_modes();
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

async fn apply_delete_subject(
    event: &SchemaEvent,
    target: &dyn TargetClient,
    stats: &Stats,
) -> Result<(), SrctlError> {
    if event.is_global() {
        return Ok(());
    }
    match target.delete_subject(&event.subject, false).await {
        Ok(_) => {
            stats.incr_deletes();
            Ok(())
        }
        Err(e) if e.is_not_found() || e.is_method_not_allowed() => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srctl_core::Reference;
    use srctl_registry::fake::FakeCall;
    use srctl_registry::FakeRegistryClient;

    fn schema_event(subject: &str, schema_id: i32, tombstone: bool, deleted: bool) -> SchemaEvent {
        SchemaEvent {
            subject: subject.to_string(),
            version: 1,
            offset: 1,
            partition: 0,
            tombstone,
            payload: EventPayload::Schema {
                schema_id,
                schema: "{}".to_string(),
                schema_type: "AVRO".to_string(),
                references: vec![Reference {
                    name: "ref".to_string(),
                    subject: "other".to_string(),
                    version: 1,
                }],
                deleted,
            },
        }
    }

    #[tokio::test]
    async fn schema_register_counts_and_skips_duplicates() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = schema_event("u-v", 1, false, false);

        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().schemas, 1);

        // A duplicate register (different id, no preserve_ids) is allowed by
        // the fake and counted again — idempotent-duplicate suppression only
        // kicks in on an explicit Conflict from the target.
        target.fail_next_register(SrctlError::ClientError(
            srctl_core::ClientErrorKind::Conflict,
            "Schema already registered with id 1".to_string(),
        ));
        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().schemas, 1, "duplicate register must not double count");
    }

    #[tokio::test]
    async fn preserve_ids_brackets_register_in_import_mode() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = schema_event("u-v", 42, false, false);

        apply(&event, &target, true, &stats).await.unwrap();

        let calls = target.calls();
        assert_eq!(
            calls,
            vec![
                FakeCall::SetSubjectMode {
                    subject: "u-v".to_string(),
                    mode: "IMPORT".to_string(),
                },
                FakeCall::Register {
                    subject: "u-v".to_string(),
                    id: Some(42),
                },
                FakeCall::SetSubjectMode {
                    subject: "u-v".to_string(),
                    mode: "READWRITE".to_string(),
                },
            ]
        );
        assert_eq!(stats.snapshot().schemas, 1);
    }

    #[tokio::test]
    async fn tombstone_deletes_permanently() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        apply(&schema_event("u-v", 1, false, false), &target, false, &stats)
            .await
            .unwrap();

        let tombstone = schema_event("u-v", 0, true, false);
        apply(&tombstone, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().deletes, 1);
        assert!(target.subject_state("u-v").is_none());
    }

    #[tokio::test]
    async fn soft_delete_flag_deletes_non_permanently() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        apply(&schema_event("u-v", 1, false, false), &target, false, &stats)
            .await
            .unwrap();

        let soft_delete = schema_event("u-v", 1, false, true);
        apply(&soft_delete, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().deletes, 1);
        let state = target.subject_state("u-v").unwrap();
        assert!(state.deleted);
    }

    #[tokio::test]
    async fn delete_not_found_is_idempotent_success() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let tombstone = schema_event("never-existed", 0, true, false);
        apply(&tombstone, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().deletes, 0);
        assert_eq!(stats.snapshot().errors, 0);
    }

    #[tokio::test]
    async fn global_config_goes_to_set_config() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = SchemaEvent {
            subject: String::new(),
            version: 0,
            offset: 1,
            partition: 0,
            tombstone: false,
            payload: EventPayload::Config {
                compatibility: "FULL".to_string(),
            },
        };
        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(
            target.calls(),
            vec![FakeCall::SetConfig {
                compatibility: "FULL".to_string()
            }]
        );
        assert_eq!(stats.snapshot().configs, 1);
    }

    #[tokio::test]
    async fn subject_config_goes_to_set_subject_config() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = SchemaEvent {
            subject: "u-v".to_string(),
            version: 0,
            offset: 1,
            partition: 0,
            tombstone: false,
            payload: EventPayload::Config {
                compatibility: "BACKWARD".to_string(),
            },
        };
        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(
            target.calls(),
            vec![FakeCall::SetSubjectConfig {
                subject: "u-v".to_string(),
                compatibility: "BACKWARD".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn global_mode_event_is_dropped() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = SchemaEvent {
            subject: String::new(),
            version: 0,
            offset: 1,
            partition: 0,
            tombstone: false,
            payload: EventPayload::Mode {
                mode: "READONLY".to_string(),
            },
        };
        apply(&event, &target, false, &stats).await.unwrap();
        assert!(target.calls().is_empty());
        assert_eq!(stats.snapshot().modes, 0);
    }

    #[tokio::test]
    async fn subject_mode_event_is_applied() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = SchemaEvent {
            subject: "u-v".to_string(),
            version: 0,
            offset: 1,
            partition: 0,
            tombstone: false,
            payload: EventPayload::Mode {
                mode: "READONLY".to_string(),
            },
        };
        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().modes, 1);
    }

    #[tokio::test]
    async fn delete_subject_event_counts_as_delete() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        apply(&schema_event("u-v", 1, false, false), &target, false, &stats)
            .await
            .unwrap();
        let event = SchemaEvent {
            subject: "u-v".to_string(),
            version: 0,
            offset: 2,
            partition: 0,
            tombstone: false,
            payload: EventPayload::DeleteSubject,
        };
        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().deletes, 1);
    }

    #[tokio::test]
    async fn clear_subject_not_found_is_idempotent() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        let event = SchemaEvent {
            subject: "never-existed".to_string(),
            version: 0,
            offset: 2,
            partition: 0,
            tombstone: false,
            payload: EventPayload::ClearSubject,
        };
        apply(&event, &target, false, &stats).await.unwrap();
        assert_eq!(stats.snapshot().errors, 0);
    }

    #[tokio::test]
    async fn hard_failure_propagates() {
        let target = FakeRegistryClient::new();
        let stats = Stats::new();
        target.fail_next_register(SrctlError::ServerError(503, "down".to_string()));
        let event = schema_event("u-v", 1, false, false);
        let err = apply(&event, &target, false, &stats).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(stats.snapshot().schemas, 0);
    }
}
