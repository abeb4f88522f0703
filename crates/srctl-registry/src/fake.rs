//! In-memory [`TargetClient`]/[`SourceClient`] implementation used by the
//! `srctl-replicate` test suite (`spec.md` §9 "Pattern: dynamic dispatch
//! across target/source clients" — a capability set implemented by both a
//! live HTTP backend and an in-memory fake).

use async_trait::async_trait;
use srctl_core::{
    ClientErrorKind, RegisterRequest, SourceClient, SourceSchema, SrctlError, TargetClient,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct FakeSubjectState {
    pub mode: String,
    pub compatibility: Option<String>,
    pub versions: Vec<i32>,
    pub deleted: bool,
}

impl Default for FakeSubjectState {
    fn default() -> Self {
        Self {
            mode: "READWRITE".to_string(),
            compatibility: None,
            versions: Vec::new(),
            deleted: false,
        }
    }
}

/// Every call the fake received, in order — lets tests assert on call
/// sequence (e.g. `spec.md` §8 scenario 2: IMPORT before register, before
/// READWRITE).
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Register {
        subject: String,
        id: Option<i32>,
    },
    Delete {
        subject: String,
        permanent: bool,
    },
    SetConfig {
        compatibility: String,
    },
    SetSubjectConfig {
        subject: String,
        compatibility: String,
    },
    SetSubjectMode {
        subject: String,
        mode: String,
    },
}

struct Inner {
    subjects: HashMap<String, FakeSubjectState>,
    registered_ids: HashMap<(String, i32), i32>,
    global_compatibility: Option<String>,
    next_id: i32,
    calls: Vec<FakeCall>,
    fail_next_register: Option<SrctlError>,
}

pub struct FakeRegistryClient {
    inner: Mutex<Inner>,
}

impl Default for FakeRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRegistryClient {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                subjects: HashMap::new(),
                registered_ids: HashMap::new(),
                global_compatibility: None,
                next_id: 1,
                calls: Vec::new(),
                fail_next_register: None,
            }),
        }
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn subject_state(&self, subject: &str) -> Option<FakeSubjectState> {
        self.inner.lock().unwrap().subjects.get(subject).cloned()
    }

    /// Makes the next `register_schema` call fail with `err`, for testing
    /// the retry harness against a deterministic sequence of failures.
    pub fn fail_next_register(&self, err: SrctlError) {
        self.inner.lock().unwrap().fail_next_register = Some(err);
    }
}

#[async_trait]
impl TargetClient for FakeRegistryClient {
    async fn register_schema(
        &self,
        subject: &str,
        req: RegisterRequest,
    ) -> Result<i32, SrctlError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Register {
            subject: subject.to_string(),
            id: req.id,
        });

        if let Some(err) = inner.fail_next_register.take() {
            return Err(err);
        }

        let state = inner.subjects.entry(subject.to_string()).or_default();
        if let Some(id) = req.id {
            if state.mode != "IMPORT" {
                return Err(SrctlError::ClientError(
                    ClientErrorKind::Conflict,
                    "subject must be in IMPORT mode to register with an explicit id".to_string(),
                ));
            }
            if inner
                .registered_ids
                .get(&(subject.to_string(), id))
                .is_some()
            {
                return Err(SrctlError::ClientError(
                    ClientErrorKind::Conflict,
                    format!("schema already registered with id {id}"),
                ));
            }
            inner.registered_ids.insert((subject.to_string(), id), id);
            let state = inner.subjects.get_mut(subject).unwrap();
            state.versions.push(state.versions.len() as i32 + 1);
            state.deleted = false;
            return Ok(id);
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let state = inner.subjects.get_mut(subject).unwrap();
        state.versions.push(state.versions.len() as i32 + 1);
        state.deleted = false;
        Ok(id)
    }

    async fn delete_subject(&self, subject: &str, permanent: bool) -> Result<Vec<i32>, SrctlError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::Delete {
            subject: subject.to_string(),
            permanent,
        });
        match inner.subjects.get_mut(subject) {
            None => Err(SrctlError::ClientError(
                ClientErrorKind::NotFound,
                format!("subject {subject} not found"),
            )),
            Some(state) if state.deleted && !permanent => Err(SrctlError::ClientError(
                ClientErrorKind::NotFound,
                format!("subject {subject} already deleted"),
            )),
            Some(state) => {
                let versions = state.versions.clone();
                if permanent {
                    inner.subjects.remove(subject);
                } else {
                    inner.subjects.get_mut(subject).unwrap().deleted = true;
                }
                Ok(versions)
            }
        }
    }

    async fn set_config(&self, compatibility: &str) -> Result<(), SrctlError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::SetConfig {
            compatibility: compatibility.to_string(),
        });
        inner.global_compatibility = Some(compatibility.to_string());
        Ok(())
    }

    async fn set_subject_config(
        &self,
        subject: &str,
        compatibility: &str,
    ) -> Result<(), SrctlError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::SetSubjectConfig {
            subject: subject.to_string(),
            compatibility: compatibility.to_string(),
        });
        inner
            .subjects
            .entry(subject.to_string())
            .or_default()
            .compatibility = Some(compatibility.to_string());
        Ok(())
    }

    async fn set_subject_mode(&self, subject: &str, mode: &str) -> Result<(), SrctlError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(FakeCall::SetSubjectMode {
            subject: subject.to_string(),
            mode: mode.to_string(),
        });
        inner.subjects.entry(subject.to_string()).or_default().mode = mode.to_string();
        Ok(())
    }
}

#[async_trait]
impl SourceClient for FakeRegistryClient {
    async fn list_subjects(&self) -> Result<Vec<String>, SrctlError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.subjects.keys().cloned().collect())
    }

    async fn list_versions(&self, subject: &str) -> Result<Vec<i32>, SrctlError> {
        let inner = self.inner.lock().unwrap();
        match inner.subjects.get(subject) {
            Some(state) => Ok(state.versions.clone()),
            None => Err(SrctlError::ClientError(
                ClientErrorKind::NotFound,
                format!("subject {subject} not found"),
            )),
        }
    }

    async fn get_schema(&self, subject: &str, version: i32) -> Result<SourceSchema, SrctlError> {
        let inner = self.inner.lock().unwrap();
        if !inner
            .subjects
            .get(subject)
            .map(|s| s.versions.contains(&version))
            .unwrap_or(false)
        {
            return Err(SrctlError::ClientError(
                ClientErrorKind::NotFound,
                format!("{subject} version {version} not found"),
            ));
        }
        Ok(SourceSchema {
            id: version,
            schema: "{}".to_string(),
            schema_type: "AVRO".to_string(),
            references: vec![],
            metadata: None,
            rule_set: None,
        })
    }
}
