//! Session registry.
//!
//! Each operator has at most one live session, bound to one patient. A
//! session owns its orchestrator behind a mutex so turns for the same
//! operator are serialized while different operators proceed concurrently.

use crate::booking::BookingSnapshot;
use crate::error::{ConversationError, SessionError};
use crate::orchestrator::{Collaborators, Orchestrator, ToolCallRecord, TurnReply};
use care_coordinator_core::{Patient, PatientId, Result, SessionInstanceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

/// Identifies whose conversation a session is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub operator_id: String,
    pub patient_id: PatientId,
}

impl SessionKey {
    #[must_use]
    pub fn new(operator_id: impl Into<String>, patient_id: PatientId) -> Self {
        Self {
            operator_id: operator_id.into(),
            patient_id,
        }
    }
}

/// A live conversation.
#[derive(Debug)]
pub struct Session {
    id: SessionInstanceId,
    key: SessionKey,
    created_at: DateTime<Utc>,
    orchestrator: Mutex<Orchestrator>,
}

impl Session {
    fn new(key: SessionKey, patient: Patient, deps: Collaborators) -> Self {
        Self {
            id: SessionInstanceId::new(),
            key,
            created_at: Utc::now(),
            orchestrator: Mutex::new(Orchestrator::new(patient, deps)),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionInstanceId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Runs one turn. Waits for any turn already in progress.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if `text` is blank.
    pub async fn handle_message(
        &self,
        text: &str,
    ) -> std::result::Result<TurnReply, ConversationError> {
        self.orchestrator.lock().await.handle_message(text).await
    }

    pub async fn reset(&self) {
        self.orchestrator.lock().await.reset();
    }

    pub async fn booking_status(&self) -> BookingSnapshot {
        self.orchestrator.lock().await.booking_status()
    }

    pub async fn recent_tool_calls(&self) -> Vec<ToolCallRecord> {
        self.orchestrator.lock().await.recent_tool_calls()
    }

    /// The patient snapshot, including any insurance update.
    pub async fn patient(&self) -> Patient {
        self.orchestrator.lock().await.patient().clone()
    }
}

/// Holds the live session of every operator.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    deps: Collaborators,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(deps: Collaborators) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            deps,
        }
    }

    /// The operator's session, if any.
    pub async fn get(&self, operator_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(operator_id).cloned()
    }

    /// The operator's session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the operator has no session.
    pub async fn require(&self, operator_id: &str) -> Result<Arc<Session>, SessionError> {
        self.get(operator_id).await.ok_or_else(|| {
            SessionError::NotFound {
                operator_id: operator_id.to_string(),
            }
            .into()
        })
    }

    /// Returns the operator's session for this patient, opening one if needed.
    ///
    /// An existing session for a different patient is replaced.
    ///
    /// # Errors
    ///
    /// Returns `PatientUnavailable` if the patient chart cannot be loaded.
    #[instrument(skip(self), fields(operator_id = %key.operator_id, patient_id = %key.patient_id))]
    pub async fn get_or_create(&self, key: SessionKey) -> Result<Arc<Session>, SessionError> {
        if let Some(existing) = self.get(&key.operator_id).await
            && existing.key == key
        {
            debug!(session_id = %existing.id, "reusing session");
            return Ok(existing);
        }

        let fresh = self.open(key.clone()).await?;
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&key.operator_id)
            && existing.key == key
        {
            return Ok(existing.clone());
        }
        if let Some(previous) = sessions.insert(key.operator_id.clone(), fresh.clone()) {
            info!(
                previous_patient = %previous.key.patient_id,
                session_id = %fresh.id,
                "switched patient"
            );
        } else {
            info!(session_id = %fresh.id, "session opened");
        }
        Ok(fresh)
    }

    /// Clears the operator's transcript and booking. The patient is kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the operator has no session.
    pub async fn reset(&self, operator_id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self.require(operator_id).await?;
        session.reset().await;
        info!(operator_id, session_id = %session.id, "session reset");
        Ok(session)
    }

    /// Replaces the operator's session with a fresh one for `patient_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the operator has no session, or
    /// `PatientUnavailable` if the new chart cannot be loaded. The old session
    /// is kept when the chart cannot be loaded.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn switch_patient(
        &self,
        operator_id: &str,
        patient_id: PatientId,
    ) -> Result<Arc<Session>, SessionError> {
        let previous = self.require(operator_id).await?;
        let fresh = self.open(SessionKey::new(operator_id, patient_id)).await?;
        self.sessions
            .write()
            .await
            .insert(operator_id.to_string(), fresh.clone());
        info!(
            previous_patient = %previous.key.patient_id,
            session_id = %fresh.id,
            "switched patient"
        );
        Ok(fresh)
    }

    /// Ends the operator's session. Returns whether one existed.
    pub async fn close(&self, operator_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(operator_id);
        if let Some(session) = &removed {
            info!(operator_id, session_id = %session.id, "session closed");
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn open(&self, key: SessionKey) -> Result<Arc<Session>, SessionError> {
        let patient = self
            .deps
            .lookup
            .patient(key.patient_id)
            .await
            .map_err(|e| SessionError::PatientUnavailable {
                patient_id: key.patient_id,
                reason: e.to_string(),
            })?;
        Ok(Arc::new(Session::new(key, patient, self.deps.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, tool_batch};
    use async_trait::async_trait;
    use care_coordinator_ai::{Completion, CompletionProvider, MessageRole};
    use care_coordinator_core::{
        AppointmentRecord, Department, DepartmentId, FixedClock, Insurance, Provider,
        ProviderId, Specialty,
    };
    use care_coordinator_lookup::{
        CommitReceipt, CommitRequest, InMemoryDirectory, InsuranceAssignment, LookupError,
        LookupService, QueryRows, ReadOnlyStatement,
    };
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    fn build(
        provider: Arc<dyn CompletionProvider>,
        lookup: Arc<dyn LookupService>,
    ) -> SessionRegistry {
        let deps = Collaborators::new(provider, lookup).with_clock(Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2025, 6, 13).expect("date"),
        )));
        SessionRegistry::new(deps)
    }

    fn registry(script: Vec<Completion>) -> SessionRegistry {
        build(
            Arc::new(ScriptedProvider::new(script)),
            Arc::new(InMemoryDirectory::sample()),
        )
    }

    /// A registry whose provider holds each request until `gate` admits it.
    fn gated_registry(
        script: Vec<Completion>,
    ) -> (SessionRegistry, Arc<ScriptedProvider>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let provider = Arc::new(ScriptedProvider::new(script).with_gate(gate.clone()));
        let registry = build(provider.clone(), Arc::new(InMemoryDirectory::sample()));
        (registry, provider, gate)
    }

    /// Yields until `ready` holds, then admits `permits` waiters.
    async fn admit_when(gate: &Semaphore, permits: usize, ready: impl Fn() -> bool) {
        for _ in 0..10_000 {
            if ready() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(ready(), "waiters never arrived");
        gate.add_permits(permits);
    }

    /// Directory whose chart loads wait on a gate.
    struct GatedCharts {
        inner: InMemoryDirectory,
        gate: Semaphore,
        waiting: AtomicUsize,
    }

    #[async_trait]
    impl LookupService for GatedCharts {
        async fn patient(&self, id: PatientId) -> std::result::Result<Patient, LookupError> {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.inner.patient(id).await
        }

        async fn providers_by_specialty(
            &self,
            specialty: &str,
        ) -> std::result::Result<Vec<Provider>, LookupError> {
            self.inner.providers_by_specialty(specialty).await
        }

        async fn provider(&self, id: ProviderId) -> std::result::Result<Provider, LookupError> {
            self.inner.provider(id).await
        }

        async fn provider_departments(
            &self,
            id: ProviderId,
        ) -> std::result::Result<Vec<Department>, LookupError> {
            self.inner.provider_departments(id).await
        }

        async fn department(
            &self,
            id: DepartmentId,
        ) -> std::result::Result<Department, LookupError> {
            self.inner.department(id).await
        }

        async fn booked_appointments(
            &self,
            provider: ProviderId,
            department: DepartmentId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> std::result::Result<Vec<AppointmentRecord>, LookupError> {
            self.inner
                .booked_appointments(provider, department, start, end)
                .await
        }

        async fn appointment_history(
            &self,
            patient: PatientId,
            provider: ProviderId,
        ) -> std::result::Result<Vec<AppointmentRecord>, LookupError> {
            self.inner.appointment_history(patient, provider).await
        }

        async fn insurances(&self) -> std::result::Result<Vec<Insurance>, LookupError> {
            self.inner.insurances().await
        }

        async fn specialty(&self, name: &str) -> std::result::Result<Specialty, LookupError> {
            self.inner.specialty(name).await
        }

        async fn set_patient_insurance(
            &self,
            patient: PatientId,
            insurance_name: &str,
        ) -> std::result::Result<InsuranceAssignment, LookupError> {
            self.inner
                .set_patient_insurance(patient, insurance_name)
                .await
        }

        async fn commit_appointment(
            &self,
            request: &CommitRequest,
        ) -> std::result::Result<CommitReceipt, LookupError> {
            self.inner.commit_appointment(request).await
        }

        async fn query(
            &self,
            statement: &ReadOnlyStatement,
        ) -> std::result::Result<QueryRows, LookupError> {
            self.inner.query(statement).await
        }
    }

    fn key(operator: &str, patient: i64) -> SessionKey {
        SessionKey::new(operator, PatientId::new(patient))
    }

    #[tokio::test]
    async fn same_key_reuses_session() {
        let registry = registry(Vec::new());
        let first = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        let again = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        assert_eq!(first.id(), again.id());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn operators_get_separate_sessions() {
        let registry = registry(Vec::new());
        let a = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        let b = registry.get_or_create(key("nurse-2", 1)).await.expect("open");
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn new_patient_replaces_session() {
        let registry = registry(Vec::new());
        let john = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        let jane = registry.get_or_create(key("nurse-1", 2)).await.expect("open");
        assert_ne!(john.id(), jane.id());
        assert_eq!(jane.patient().await.name, "Jane Smith");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_patient_is_reported() {
        let registry = registry(Vec::new());
        let err = registry
            .get_or_create(key("nurse-1", 99))
            .await
            .expect_err("missing chart");
        assert!(matches!(
            err.current_context(),
            SessionError::PatientUnavailable { .. }
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let registry = registry(Vec::new());
        let err = registry.reset("nobody").await.expect_err("no session");
        assert!(matches!(err.current_context(), SessionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn reset_clears_booking_but_keeps_session() {
        let registry = registry(vec![
            tool_batch("check_appointment_history", json!({"provider_id": 2})),
            Completion::TextReply("It would be a NEW visit.".to_string()),
        ]);
        let session = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        session.handle_message("visit type with House?").await.expect("turn");
        assert!(session.booking_status().await.provider.is_some());
        assert_eq!(session.recent_tool_calls().await.len(), 1);

        let after = registry.reset("nurse-1").await.expect("reset");
        assert_eq!(after.id(), session.id());
        assert!(after.booking_status().await.provider.is_none());
        assert_eq!(after.patient().await.name, "John Doe");
    }

    #[tokio::test]
    async fn switch_patient_starts_fresh() {
        let registry = registry(Vec::new());
        let john = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        let jane = registry
            .switch_patient("nurse-1", PatientId::new(2))
            .await
            .expect("switch");
        assert_ne!(john.id(), jane.id());
        assert_eq!(jane.key().patient_id, PatientId::new(2));

        let kept = registry
            .switch_patient("nurse-1", PatientId::new(99))
            .await
            .expect_err("missing chart");
        assert!(matches!(
            kept.current_context(),
            SessionError::PatientUnavailable { .. }
        ));
        let current = registry.get("nurse-1").await.expect("session");
        assert_eq!(current.id(), jane.id());
    }

    #[tokio::test]
    async fn close_removes_session() {
        let registry = registry(Vec::new());
        registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        assert!(registry.close("nurse-1").await);
        assert!(!registry.close("nurse-1").await);
        assert!(registry.get("nurse-1").await.is_none());
    }

    #[tokio::test]
    async fn turns_on_one_session_do_not_overlap() {
        let (registry, provider, gate) = gated_registry(vec![
            Completion::TextReply("first answer".to_string()),
            Completion::TextReply("second answer".to_string()),
        ]);
        let session = registry.get_or_create(key("nurse-1", 1)).await.expect("open");

        let release = async {
            admit_when(&gate, 1, || {
                provider.in_flight() == 1 && provider.requests().is_empty()
            })
            .await;
            admit_when(&gate, 1, || {
                provider.in_flight() == 1 && provider.requests().len() == 1
            })
            .await;
        };
        let (a, b, ()) = tokio::join!(
            session.handle_message("question one"),
            session.handle_message("question two"),
            release,
        );
        a.expect("turn one");
        b.expect("turn two");
        assert_eq!(provider.peak(), 1);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let operator_turns = |transcript: &[care_coordinator_ai::Message]| {
            transcript
                .iter()
                .filter(|m| m.role == MessageRole::Operator)
                .count()
        };
        assert_eq!(operator_turns(&requests[0].transcript), 1);
        // The later turn sees the earlier turn and its reply, in order.
        let later = &requests[1].transcript;
        assert_eq!(operator_turns(later), 2);
        let reply_at = later
            .iter()
            .position(|m| m.role == MessageRole::Assistant && m.content == "first answer")
            .expect("earlier reply in transcript");
        let last_operator = later
            .iter()
            .rposition(|m| m.role == MessageRole::Operator)
            .expect("operator turn");
        assert!(reply_at < last_operator);
    }

    #[tokio::test]
    async fn different_operators_run_concurrently() {
        let (registry, provider, gate) = gated_registry(vec![
            Completion::TextReply("for nurse one".to_string()),
            Completion::TextReply("for nurse two".to_string()),
        ]);
        let a = registry.get_or_create(key("nurse-1", 1)).await.expect("open");
        let b = registry.get_or_create(key("nurse-2", 1)).await.expect("open");

        let (ra, rb, ()) = tokio::join!(
            a.handle_message("hello"),
            b.handle_message("hello"),
            admit_when(&gate, 2, || provider.in_flight() == 2),
        );
        ra.expect("turn a");
        rb.expect("turn b");
        assert_eq!(provider.peak(), 2);
    }

    #[tokio::test]
    async fn racing_opens_share_one_session() {
        let charts = Arc::new(GatedCharts {
            inner: InMemoryDirectory::sample(),
            gate: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
        });
        let registry = build(Arc::new(ScriptedProvider::default()), charts.clone());

        let (first, second, ()) = tokio::join!(
            registry.get_or_create(key("nurse-1", 1)),
            registry.get_or_create(key("nurse-1", 1)),
            admit_when(&charts.gate, 2, || charts.waiting.load(Ordering::SeqCst) == 2),
        );
        let first = first.expect("open");
        let second = second.expect("open");
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.len().await, 1);
        let kept = registry.get("nurse-1").await.expect("session");
        assert_eq!(kept.id(), first.id());
    }
}
