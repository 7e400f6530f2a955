//! In-memory lookup directory.
//!
//! Backs tests and local runs. [`InMemoryDirectory::sample`] seeds a small
//! hospital with three specialties, five providers, five departments and two
//! patients.

use crate::error::LookupError;
use crate::service::{CommitReceipt, CommitRequest, InsuranceAssignment, LookupService, QueryRows};
use crate::statement::ReadOnlyStatement;
use async_trait::async_trait;
use care_coordinator_core::{
    AppointmentId, AppointmentRecord, AppointmentStatus, Classification, Department, DepartmentId,
    Insurance, InsuranceId, Patient, PatientId, Provider, ProviderId, Referral, SelfPayRate,
    Specialty, SpecialtyId, VisitSummary,
};
use chrono::{NaiveDate, NaiveTime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct PatientEntry {
    patient: Patient,
    insurance_id: Option<InsuranceId>,
}

#[derive(Debug, Default)]
struct Tables {
    patients: Vec<PatientEntry>,
    providers: Vec<Provider>,
    departments: Vec<Department>,
    specialties: Vec<Specialty>,
    insurances: Vec<Insurance>,
    appointments: Vec<AppointmentRecord>,
}

impl Tables {
    fn provider(&self, id: ProviderId) -> Result<&Provider, LookupError> {
        self.providers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| LookupError::not_found("provider", id))
    }

    fn department(&self, id: DepartmentId) -> Result<&Department, LookupError> {
        self.departments
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| LookupError::not_found("department", id))
    }

    fn patient_entry(&self, id: PatientId) -> Result<&PatientEntry, LookupError> {
        self.patients
            .iter()
            .find(|p| p.patient.id == id)
            .ok_or_else(|| LookupError::not_found("patient", id))
    }

    /// Assembles the chart the records API would return.
    fn chart(&self, id: PatientId) -> Result<Patient, LookupError> {
        let entry = self.patient_entry(id)?;
        let mut patient = entry.patient.clone();
        patient.insurance = entry
            .insurance_id
            .and_then(|iid| self.insurances.iter().find(|i| i.id == iid).cloned());

        let mut visits: Vec<&AppointmentRecord> = self
            .appointments
            .iter()
            .filter(|a| a.patient_id == id)
            .collect();
        visits.sort_by(|a, b| (b.date, b.start_time).cmp(&(a.date, a.start_time)));
        patient.appointments = visits
            .into_iter()
            .map(|a| VisitSummary {
                date: a.date,
                time: Some(a.start_time),
                provider: self
                    .provider(a.provider_id)
                    .map(Provider::display_name)
                    .unwrap_or_default(),
                status: a.status,
                notes: a.notes.clone(),
            })
            .collect();
        Ok(patient)
    }
}

/// A [`LookupService`] over in-process tables.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tables: RwLock<Tables>,
    outage: RwLock<Option<LookupError>>,
    commit_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory seeded with the sample hospital.
    #[must_use]
    pub fn sample() -> Self {
        let directory = Self::new();
        {
            let mut tables = directory.write();
            seed(&mut tables);
        }
        directory
    }

    /// Makes every subsequent call fail with `error`, or restores service
    /// when `None`.
    pub fn set_outage(&self, error: Option<LookupError>) {
        *self.outage.write().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Number of `commit_appointment` calls received.
    #[must_use]
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Number of `query` calls received.
    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Adds an appointment record, e.g. to set up visit history.
    pub fn insert_appointment(&self, record: AppointmentRecord) {
        self.write().appointments.push(record);
    }

    /// Returns every stored appointment.
    #[must_use]
    pub fn appointments(&self) -> Vec<AppointmentRecord> {
        self.read().appointments.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), LookupError> {
        match self
            .outage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LookupService for InMemoryDirectory {
    async fn patient(&self, id: PatientId) -> Result<Patient, LookupError> {
        self.check_available()?;
        self.read().chart(id)
    }

    async fn providers_by_specialty(&self, specialty: &str) -> Result<Vec<Provider>, LookupError> {
        self.check_available()?;
        let wanted = specialty.trim();
        Ok(self
            .read()
            .providers
            .iter()
            .filter(|p| p.specialty.eq_ignore_ascii_case(wanted))
            .cloned()
            .collect())
    }

    async fn provider(&self, id: ProviderId) -> Result<Provider, LookupError> {
        self.check_available()?;
        self.read().provider(id).cloned()
    }

    async fn provider_departments(&self, id: ProviderId) -> Result<Vec<Department>, LookupError> {
        self.check_available()?;
        let tables = self.read();
        let provider = tables.provider(id)?;
        provider
            .department_ids
            .iter()
            .map(|did| tables.department(*did).cloned())
            .collect()
    }

    async fn department(&self, id: DepartmentId) -> Result<Department, LookupError> {
        self.check_available()?;
        self.read().department(id).cloned()
    }

    async fn booked_appointments(
        &self,
        provider: ProviderId,
        department: DepartmentId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, LookupError> {
        self.check_available()?;
        Ok(self
            .read()
            .appointments
            .iter()
            .filter(|a| {
                a.provider_id == provider
                    && a.department_id == department
                    && a.status == AppointmentStatus::Scheduled
                    && (start..=end).contains(&a.date)
            })
            .cloned()
            .collect())
    }

    async fn appointment_history(
        &self,
        patient: PatientId,
        provider: ProviderId,
    ) -> Result<Vec<AppointmentRecord>, LookupError> {
        self.check_available()?;
        let mut history: Vec<AppointmentRecord> = self
            .read()
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient && a.provider_id == provider)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(history)
    }

    async fn insurances(&self) -> Result<Vec<Insurance>, LookupError> {
        self.check_available()?;
        Ok(self.read().insurances.clone())
    }

    async fn specialty(&self, name: &str) -> Result<Specialty, LookupError> {
        self.check_available()?;
        let wanted = name.trim();
        self.read()
            .specialties
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| LookupError::not_found("specialty", wanted))
    }

    async fn set_patient_insurance(
        &self,
        patient: PatientId,
        insurance_name: &str,
    ) -> Result<InsuranceAssignment, LookupError> {
        self.check_available()?;
        let name = insurance_name.trim();
        if name.is_empty() {
            return Err(LookupError::Rejected {
                operation: "set_patient_insurance",
                reason: "insurance_name cannot be empty".to_string(),
            });
        }

        let mut tables = self.write();
        tables.patient_entry(patient)?;

        let insurance = match tables
            .insurances
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.clone(),
            None => {
                let next_id = tables.insurances.iter().map(|i| i.id.get()).max().unwrap_or(0) + 1;
                let created = Insurance {
                    id: InsuranceId::new(next_id),
                    name: name.to_string(),
                    accepted: false,
                };
                debug!(insurance = %created.name, "created unaccepted insurance record");
                tables.insurances.push(created.clone());
                created
            }
        };

        if let Some(entry) = tables.patients.iter_mut().find(|p| p.patient.id == patient) {
            entry.insurance_id = Some(insurance.id);
        }

        Ok(InsuranceAssignment {
            insurance_id: insurance.id,
            name: insurance.name,
            accepted: insurance.accepted,
        })
    }

    async fn commit_appointment(
        &self,
        request: &CommitRequest,
    ) -> Result<CommitReceipt, LookupError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let mut tables = self.write();
        tables.patient_entry(request.patient_id)?;
        let provider = tables.provider(request.provider_id)?;
        if !provider.department_ids.contains(&request.department_id) {
            return Err(LookupError::Rejected {
                operation: "commit_appointment",
                reason: format!(
                    "provider {} does not practice at department {}",
                    request.provider_id, request.department_id
                ),
            });
        }
        tables.department(request.department_id)?;

        let next_id = tables
            .appointments
            .iter()
            .map(|a| a.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        let appointment_id = AppointmentId::new(next_id);
        tables.appointments.push(AppointmentRecord {
            id: appointment_id,
            patient_id: request.patient_id,
            provider_id: request.provider_id,
            department_id: request.department_id,
            classification: request.classification,
            date: request.date,
            start_time: request.time,
            arrival_time: Some(request.arrival_time),
            status: AppointmentStatus::Scheduled,
            notes: request.notes.clone(),
        });

        Ok(CommitReceipt { appointment_id })
    }

    async fn query(&self, _statement: &ReadOnlyStatement) -> Result<QueryRows, LookupError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Err(LookupError::Unsupported {
            operation: "query",
        })
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

fn seed(tables: &mut Tables) {
    let specialty = |id, name: &str, rate| Specialty {
        id: SpecialtyId::new(id),
        name: name.to_string(),
        self_pay_rate: SelfPayRate::dollars(rate),
    };
    tables.specialties = vec![
        specialty(1, "Primary Care", 150),
        specialty(2, "Orthopedics", 300),
        specialty(3, "Surgery", 1000),
    ];

    let department = |id, name: &str, phone: &str, address: &str, hours: &str| Department {
        id: DepartmentId::new(id),
        name: name.to_string(),
        phone: phone.to_string(),
        address: address.to_string(),
        hours: hours.to_string(),
    };
    tables.departments = vec![
        department(
            1,
            "Sloan Primary Care",
            "(710) 555-2070",
            "202 Maple St, Winston-Salem, NC 27101",
            "M-F 9am-5pm",
        ),
        department(
            2,
            "PPTH Orthopedics",
            "(445) 555-6205",
            "101 Pine St, Greensboro, NC 27401",
            "M-W 9am-5pm",
        ),
        department(
            3,
            "Jefferson Hospital",
            "(215) 555-6123",
            "202 Maple St, Claremont, NC 28610",
            "Th-F 9am-5pm",
        ),
        department(
            4,
            "Seattle Grace Cardiac Surgery",
            "(710) 555-3082",
            "456 Elm St, Charlotte, NC 28202",
            "M-F 9am-5pm",
        ),
        department(
            5,
            "Sacred Heart Primary Care",
            "(339) 555-7480",
            "123 Main St, Raleigh, NC 27601",
            "M-F 9am-5pm",
        ),
    ];

    let provider = |id, first: &str, last: &str, cert: &str, spec: &str, depts: &[i64]| {
        Provider {
            id: ProviderId::new(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            certification: cert.to_string(),
            specialty: spec.to_string(),
            department_ids: depts.iter().copied().map(DepartmentId::new).collect(),
        }
    };
    tables.providers = vec![
        provider(1, "Meredith", "Grey", "MD", "Primary Care", &[1]),
        provider(2, "Gregory", "House", "MD", "Orthopedics", &[2, 3]),
        provider(3, "Cristina", "Yang", "MD", "Surgery", &[4]),
        provider(4, "Chris", "Perry", "MD", "Primary Care", &[5]),
        provider(5, "Temperance", "Brennan", "PA-C", "Orthopedics", &[2]),
    ];

    let insurance = |id, name: &str, accepted| Insurance {
        id: InsuranceId::new(id),
        name: name.to_string(),
        accepted,
    };
    tables.insurances = vec![
        insurance(1, "Medicaid", true),
        insurance(2, "United Health Care", true),
        insurance(3, "Blue Cross Blue Shield of North Carolina", true),
        insurance(4, "Aetna", true),
        insurance(5, "Humana", false),
    ];

    let patient = |id, name: &str, dob: &str, pcp: &str, ehr: &str, notes: &str| Patient {
        id: PatientId::new(id),
        name: name.to_string(),
        dob: dob.to_string(),
        pcp: pcp.to_string(),
        ehr_id: ehr.to_string(),
        notes: notes.to_string(),
        insurance: None,
        referrals: Vec::new(),
        appointments: Vec::new(),
    };
    let mut john = patient(
        1,
        "John Doe",
        "01/01/1975",
        "Dr. Meredith Grey",
        "1234abcd",
        "Patient prefers afternoon appointments. Previous no-show on 9/17/24.",
    );
    john.referrals = vec![Referral {
        specialty: "Orthopedics".to_string(),
        provider: Some("House, Gregory MD".to_string()),
    }];
    let mut jane = patient(
        2,
        "Jane Smith",
        "05/15/1982",
        "Dr. Chris Perry",
        "5678efgh",
        "Patient has morning availability only.",
    );
    jane.referrals = vec![Referral {
        specialty: "Surgery".to_string(),
        provider: None,
    }];
    tables.patients = vec![
        PatientEntry {
            patient: john,
            insurance_id: Some(InsuranceId::new(3)),
        },
        PatientEntry {
            patient: jane,
            insurance_id: None,
        },
    ];

    let visit = |id, patient, provider, dept, on: NaiveDate, at: NaiveTime, status| {
        AppointmentRecord {
            id: AppointmentId::new(id),
            patient_id: PatientId::new(patient),
            provider_id: ProviderId::new(provider),
            department_id: DepartmentId::new(dept),
            classification: Classification::Established,
            date: on,
            start_time: at,
            arrival_time: None,
            status,
            notes: String::new(),
        }
    };
    tables.appointments = vec![
        visit(1, 1, 1, 1, date(2018, 3, 5), time(9, 15), AppointmentStatus::Completed),
        visit(2, 1, 1, 1, date(2024, 8, 12), time(14, 30), AppointmentStatus::Completed),
        visit(3, 1, 1, 1, date(2024, 9, 17), time(10, 0), AppointmentStatus::Noshow),
        visit(4, 1, 1, 1, date(2024, 11, 25), time(16, 0), AppointmentStatus::Cancelled),
        visit(5, 2, 4, 5, date(2022, 6, 20), time(9, 0), AppointmentStatus::Completed),
    ];
}
