//! HTTP client for the records REST API.
//!
//! The API exposes a patient endpoint, booking and insurance mutations, and a
//! parameterised SELECT endpoint (`POST /api/query`). Reads other than the
//! patient chart go through the SELECT endpoint.

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
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PROVIDER_SELECT: &str = "\
    SELECT p.id, p.first_name, p.last_name, p.certification, s.name AS specialty, \
           COALESCE(array_agg(pd.department_id) FILTER (WHERE pd.department_id IS NOT NULL), '{}') \
               AS department_ids \
    FROM providers p \
    JOIN specialties s ON p.specialty_id = s.id \
    LEFT JOIN provider_departments pd ON pd.provider_id = p.id";

const APPOINTMENT_SELECT: &str = "\
    SELECT id, patient_id, provider_id, department_id, appointment_type, \
           date::text AS date, appointment_time::text AS appointment_time, \
           arrival_time::text AS arrival_time, status, COALESCE(notes, '') AS notes \
    FROM appointments";

/// A [`LookupService`] backed by the records REST API.
#[derive(Debug, Clone)]
pub struct HttpLookupService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookupService {
    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::RequestFailed {
                operation: "connect",
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, LookupError> {
        let response = request.send().await.map_err(|e| {
            warn!(operation, error = %e, "records API request failed");
            if e.is_timeout() {
                LookupError::Timeout { operation }
            } else {
                LookupError::RequestFailed {
                    operation,
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!(operation, status = %status, reason = %reason, "records API returned error");
            return Err(match status {
                StatusCode::NOT_FOUND => LookupError::NotFound {
                    entity: operation,
                    key: reason,
                },
                s if s.is_client_error() => LookupError::Rejected { operation, reason },
                _ => LookupError::RequestFailed { operation, reason },
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout { operation }
            } else {
                LookupError::InvalidResponse {
                    operation,
                    reason: e.to_string(),
                }
            }
        })
    }

    /// Runs a SELECT through the query endpoint and decodes each row.
    async fn select<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        sql: &str,
        params: Vec<JsonValue>,
    ) -> Result<Vec<T>, LookupError> {
        let body: QueryBody = self
            .send(
                operation,
                self.client
                    .post(self.url("/api/query"))
                    .json(&json!({ "sql": sql, "params": params })),
            )
            .await?;
        debug!(operation, rows = body.results.len(), "records query returned");
        body.results
            .into_iter()
            .map(|row| {
                serde_json::from_value(JsonValue::Object(row)).map_err(|e| {
                    LookupError::InvalidResponse {
                        operation,
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }

    async fn appointments(
        &self,
        operation: &'static str,
        filter: &str,
        params: Vec<JsonValue>,
    ) -> Result<Vec<AppointmentRecord>, LookupError> {
        let sql = format!("{APPOINTMENT_SELECT} {filter}");
        let rows: Vec<AppointmentRow> = self.select(operation, &sql, params).await?;
        rows.into_iter()
            .map(|row| row.into_record(operation))
            .collect()
    }

    async fn find_insurance(&self, name: &str) -> Result<Option<Insurance>, LookupError> {
        let rows: Vec<Insurance> = self
            .select(
                "find_insurance",
                "SELECT id, name, accepted FROM insurances WHERE name ILIKE %s",
                vec![json!(name)],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl LookupService for HttpLookupService {
    #[instrument(skip(self), fields(patient_id = %id))]
    async fn patient(&self, id: PatientId) -> Result<Patient, LookupError> {
        let body: ApiPatient = self
            .send("patient", self.client.get(self.url(&format!("/patient/{id}"))))
            .await?;
        body.into_patient()
    }

    #[instrument(skip(self))]
    async fn providers_by_specialty(&self, specialty: &str) -> Result<Vec<Provider>, LookupError> {
        let sql = format!(
            "{PROVIDER_SELECT} WHERE s.name ILIKE %s GROUP BY p.id, s.name ORDER BY p.id"
        );
        let rows: Vec<ProviderRow> = self
            .select("providers_by_specialty", &sql, vec![json!(specialty.trim())])
            .await?;
        Ok(rows.into_iter().map(Provider::from).collect())
    }

    #[instrument(skip(self), fields(provider_id = %id))]
    async fn provider(&self, id: ProviderId) -> Result<Provider, LookupError> {
        let sql = format!("{PROVIDER_SELECT} WHERE p.id = %s GROUP BY p.id, s.name");
        let rows: Vec<ProviderRow> = self.select("provider", &sql, vec![json!(id)]).await?;
        rows.into_iter()
            .next()
            .map(Provider::from)
            .ok_or_else(|| LookupError::not_found("provider", id))
    }

    #[instrument(skip(self), fields(provider_id = %id))]
    async fn provider_departments(&self, id: ProviderId) -> Result<Vec<Department>, LookupError> {
        let rows: Vec<DepartmentRow> = self
            .select(
                "provider_departments",
                "SELECT d.id, d.name, d.phone, d.address, d.hours \
                 FROM provider_departments pd \
                 JOIN departments d ON pd.department_id = d.id \
                 WHERE pd.provider_id = %s ORDER BY d.id",
                vec![json!(id)],
            )
            .await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    #[instrument(skip(self), fields(department_id = %id))]
    async fn department(&self, id: DepartmentId) -> Result<Department, LookupError> {
        let rows: Vec<DepartmentRow> = self
            .select(
                "department",
                "SELECT id, name, phone, address, hours FROM departments WHERE id = %s",
                vec![json!(id)],
            )
            .await?;
        rows.into_iter()
            .next()
            .map(Department::from)
            .ok_or_else(|| LookupError::not_found("department", id))
    }

    #[instrument(skip(self))]
    async fn booked_appointments(
        &self,
        provider: ProviderId,
        department: DepartmentId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, LookupError> {
        self.appointments(
            "booked_appointments",
            "WHERE provider_id = %s AND department_id = %s AND date >= %s AND date <= %s \
             AND status = 'scheduled' ORDER BY date, appointment_time",
            vec![
                json!(provider),
                json!(department),
                json!(start.to_string()),
                json!(end.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn appointment_history(
        &self,
        patient: PatientId,
        provider: ProviderId,
    ) -> Result<Vec<AppointmentRecord>, LookupError> {
        self.appointments(
            "appointment_history",
            "WHERE patient_id = %s AND provider_id = %s ORDER BY date DESC",
            vec![json!(patient), json!(provider)],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn insurances(&self) -> Result<Vec<Insurance>, LookupError> {
        self.select(
            "insurances",
            "SELECT id, name, accepted FROM insurances ORDER BY name",
            Vec::new(),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn specialty(&self, name: &str) -> Result<Specialty, LookupError> {
        let rows: Vec<SpecialtyRow> = self
            .select(
                "specialty",
                "SELECT id, name, self_pay_rate::int AS self_pay_rate \
                 FROM specialties WHERE name ILIKE %s",
                vec![json!(name.trim())],
            )
            .await?;
        rows.into_iter()
            .next()
            .map(Specialty::from)
            .ok_or_else(|| LookupError::not_found("specialty", name.trim()))
    }

    #[instrument(skip(self), fields(patient_id = %patient))]
    async fn set_patient_insurance(
        &self,
        patient: PatientId,
        insurance_name: &str,
    ) -> Result<InsuranceAssignment, LookupError> {
        let body: SetInsuranceBody = self
            .send(
                "set_patient_insurance",
                self.client
                    .post(self.url("/api/set_patient_insurance"))
                    .json(&json!({ "patient_id": patient, "insurance_name": insurance_name })),
            )
            .await?;
        // The mutation endpoint does not return the record id.
        let record = self
            .find_insurance(&body.insurance_name)
            .await?
            .ok_or_else(|| LookupError::InvalidResponse {
                operation: "set_patient_insurance",
                reason: format!("insurance '{}' missing after update", body.insurance_name),
            })?;
        Ok(InsuranceAssignment {
            insurance_id: record.id,
            name: body.insurance_name,
            accepted: body.accepted,
        })
    }

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id, provider_id = %request.provider_id))]
    async fn commit_appointment(
        &self,
        request: &CommitRequest,
    ) -> Result<CommitReceipt, LookupError> {
        let payload = json!({
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "department_id": request.department_id,
            "appointment_type": request.classification,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "appointment_time": request.time.format("%H:%M").to_string(),
            "arrival_time": request.arrival_time.format("%H:%M").to_string(),
            "duration_minutes": request.duration_minutes,
            "notes": request.notes,
        });
        let body: BookBody = self
            .send(
                "commit_appointment",
                self.client.post(self.url("/api/book")).json(&payload),
            )
            .await?;
        match (body.success, body.appointment_id) {
            (true, Some(appointment_id)) => Ok(CommitReceipt { appointment_id }),
            _ => Err(LookupError::RequestFailed {
                operation: "commit_appointment",
                reason: body
                    .error
                    .unwrap_or_else(|| "booking was not confirmed".to_string()),
            }),
        }
    }

    #[instrument(skip(self, statement))]
    async fn query(&self, statement: &ReadOnlyStatement) -> Result<QueryRows, LookupError> {
        let rows: Vec<Map<String, JsonValue>> = self
            .select("query", statement.sql(), statement.params().to_vec())
            .await?;
        Ok(QueryRows {
            row_count: rows.len(),
            rows,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    results: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct SetInsuranceBody {
    insurance_name: String,
    accepted: bool,
}

#[derive(Debug, Deserialize)]
struct BookBody {
    #[serde(default)]
    success: bool,
    appointment_id: Option<AppointmentId>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderRow {
    id: ProviderId,
    first_name: String,
    last_name: String,
    certification: Option<String>,
    specialty: String,
    #[serde(default)]
    department_ids: Vec<DepartmentId>,
}

impl From<ProviderRow> for Provider {
    fn from(row: ProviderRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            certification: row.certification.unwrap_or_default(),
            specialty: row.specialty,
            department_ids: row.department_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DepartmentRow {
    id: DepartmentId,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    hours: String,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone.unwrap_or_default(),
            address: row.address.unwrap_or_default(),
            hours: row.hours,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpecialtyRow {
    id: SpecialtyId,
    name: String,
    self_pay_rate: u32,
}

impl From<SpecialtyRow> for Specialty {
    fn from(row: SpecialtyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            self_pay_rate: SelfPayRate::dollars(row.self_pay_rate),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: AppointmentId,
    patient_id: PatientId,
    provider_id: ProviderId,
    department_id: DepartmentId,
    appointment_type: Classification,
    date: String,
    appointment_time: String,
    arrival_time: Option<String>,
    status: AppointmentStatus,
    #[serde(default)]
    notes: String,
}

impl AppointmentRow {
    fn into_record(self, operation: &'static str) -> Result<AppointmentRecord, LookupError> {
        let arrival_time = match self.arrival_time.as_deref() {
            Some(raw) => Some(parse_api_time(operation, raw)?),
            None => None,
        };
        Ok(AppointmentRecord {
            id: self.id,
            patient_id: self.patient_id,
            provider_id: self.provider_id,
            department_id: self.department_id,
            classification: self.appointment_type,
            date: parse_api_date(operation, &self.date)?,
            start_time: parse_api_time(operation, &self.appointment_time)?,
            arrival_time,
            status: self.status,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiPatient {
    id: PatientId,
    name: String,
    dob: String,
    #[serde(default)]
    pcp: Option<String>,
    #[serde(rename = "ehrId", default)]
    ehr_id: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    insurance: Option<ApiInsurance>,
    #[serde(default)]
    referred_providers: Vec<Referral>,
    #[serde(default)]
    appointments: Vec<ApiVisit>,
}

#[derive(Debug, Deserialize)]
struct ApiInsurance {
    id: InsuranceId,
    name: String,
    accepted: bool,
}

#[derive(Debug, Deserialize)]
struct ApiVisit {
    date: String,
    #[serde(default)]
    time: Option<String>,
    provider: String,
    status: AppointmentStatus,
    #[serde(default)]
    notes: Option<String>,
}

impl ApiPatient {
    fn into_patient(self) -> Result<Patient, LookupError> {
        let appointments = self
            .appointments
            .into_iter()
            .map(|visit| {
                let time = match visit.time.as_deref() {
                    Some(raw) if !raw.trim().is_empty() => Some(parse_api_time("patient", raw)?),
                    _ => None,
                };
                Ok(VisitSummary {
                    date: parse_api_date("patient", &visit.date)?,
                    time,
                    provider: visit.provider,
                    status: visit.status,
                    notes: visit.notes.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, LookupError>>()?;

        Ok(Patient {
            id: self.id,
            name: self.name,
            dob: self.dob,
            pcp: self.pcp.unwrap_or_default(),
            ehr_id: self.ehr_id.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            insurance: self.insurance.map(|i| Insurance {
                id: i.id,
                name: i.name,
                accepted: i.accepted,
            }),
            referrals: self.referred_providers,
            appointments,
        })
    }
}

/// Parses `YYYY-MM-DD` or the chart's `M/DD/YY` style.
fn parse_api_date(operation: &'static str, raw: &str) -> Result<NaiveDate, LookupError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%y"))
        .map_err(|e| LookupError::InvalidResponse {
            operation,
            reason: format!("date '{raw}': {e}"),
        })
}

/// Parses `HH:MM[:SS]` or the chart's `h:MMam` style.
fn parse_api_time(operation: &'static str, raw: &str) -> Result<NaiveTime, LookupError> {
    let raw = raw.trim();
    let upper = raw.to_ascii_uppercase();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M%p"))
        .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M %p"))
        .map_err(|e| LookupError::InvalidResponse {
            operation,
            reason: format!("time '{raw}': {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_date_styles() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 17).expect("valid date");
        assert_eq!(parse_api_date("t", "2024-09-17"), Ok(expected));
        assert_eq!(parse_api_date("t", "9/17/24"), Ok(expected));
        assert!(parse_api_date("t", "17.09.2024").is_err());
    }

    #[test]
    fn parses_both_time_styles() {
        let expected = NaiveTime::from_hms_opt(14, 30, 0).expect("valid time");
        assert_eq!(parse_api_time("t", "14:30:00"), Ok(expected));
        assert_eq!(parse_api_time("t", "14:30"), Ok(expected));
        assert_eq!(parse_api_time("t", "2:30pm"), Ok(expected));
        assert!(parse_api_time("t", "half past two").is_err());
    }

    #[test]
    fn patient_payload_is_decoded() {
        let payload = json!({
            "id": 1,
            "name": "John Doe",
            "dob": "01/01/1975",
            "pcp": "Dr. Meredith Grey",
            "ehrId": "1234abcd",
            "notes": "Patient prefers afternoon appointments.",
            "insurance": {"id": 3, "name": "Blue Cross Blue Shield of North Carolina", "accepted": true},
            "referred_providers": [{"specialty": "Orthopedics", "provider": "House, Gregory MD"}],
            "appointments": [
                {"date": "9/17/24", "time": "10:00am", "provider": "Dr. Meredith Grey", "status": "noshow"}
            ]
        });
        let api: ApiPatient = serde_json::from_value(payload).expect("deserialize");
        let patient = api.into_patient().expect("convert");
        assert_eq!(patient.ehr_id, "1234abcd");
        assert_eq!(patient.referrals[0].provider.as_deref(), Some("House, Gregory MD"));
        assert_eq!(patient.appointments[0].status, AppointmentStatus::Noshow);
        assert_eq!(
            patient.appointments[0].time,
            NaiveTime::from_hms_opt(10, 0, 0)
        );
    }

    #[test]
    fn appointment_row_is_decoded() {
        let row: AppointmentRow = serde_json::from_value(json!({
            "id": 9,
            "patient_id": 1,
            "provider_id": 2,
            "department_id": 2,
            "appointment_type": "NEW",
            "date": "2025-06-16",
            "appointment_time": "10:00:00",
            "arrival_time": null,
            "status": "scheduled",
            "notes": ""
        }))
        .expect("deserialize");
        let record = row.into_record("t").expect("convert");
        assert_eq!(record.classification, Classification::New);
        assert_eq!(record.arrival_time, None);
    }

    #[test]
    fn base_url_is_normalised() {
        let service =
            HttpLookupService::new("http://localhost:5000/", Duration::from_secs(1)).expect("client");
        assert_eq!(service.url("/api/query"), "http://localhost:5000/api/query");
    }
}
