//! The booking tools.

use crate::tool::{
    ArgumentSchema, ArgumentType, EffectContext, EffectingHandler, LookupContext, LookupHandler,
    Tool, ToolArguments, ToolCatalog, ToolErrorKind, ToolFailure, ToolHandler,
};
use async_trait::async_trait;
use care_coordinator_core::{
    Classification, Department, DepartmentId, PatientId, Provider, ProviderId,
};
use care_coordinator_lookup::{LookupService, ReadOnlyStatement};
use care_coordinator_rules::{
    BookedSlot, OfficeHours, SlotRequest, arrival_offset_minutes, available_slots, classify,
    duration_minutes, last_completed_visit, self_pay_disposition,
};
use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use tracing::info;

/// Builds the catalog of the nine booking tools.
#[must_use]
pub fn booking_tools() -> ToolCatalog {
    ToolCatalog::new()
        .with_tool(
            Tool::new(
                "get_providers_by_specialty",
                "Find all providers with a specific specialty (e.g. 'Orthopedics', 'Primary Care', \
                 'Surgery'). Returns each provider's id, name, certification and departments.",
                ToolHandler::PureLookup(Box::new(ProvidersBySpecialty)),
            )
            .with_schema(ArgumentSchema::new().required(
                "specialty",
                ArgumentType::String,
                "The medical specialty to search for",
            )),
        )
        .with_tool(
            Tool::new(
                "get_provider_locations",
                "Get every location where a provider works, with address, phone number and \
                 office hours.",
                ToolHandler::PureLookup(Box::new(ProviderLocations)),
            )
            .with_schema(ArgumentSchema::new().required(
                "provider_id",
                ArgumentType::Integer,
                "The provider's id",
            )),
        )
        .with_tool(
            Tool::new(
                "get_available_times",
                "List open appointment start times for a provider at a location, for a single \
                 date or a date range of at most 31 days. Slots respect office hours and \
                 existing bookings.",
                ToolHandler::PureLookup(Box::new(AvailableTimes)),
            )
            .with_schema(
                ArgumentSchema::new()
                    .required("provider_id", ArgumentType::Integer, "The provider's id")
                    .required("department_id", ArgumentType::Integer, "The location's id")
                    .required(
                        "start_date",
                        ArgumentType::Date,
                        "The date to check, or the first date of the range (YYYY-MM-DD)",
                    )
                    .optional(
                        "end_date",
                        ArgumentType::Date,
                        "Last date of the range, inclusive (YYYY-MM-DD)",
                    ),
            ),
        )
        .with_tool(
            Tool::new(
                "check_appointment_history",
                "Determine whether the next appointment with a provider is NEW or ESTABLISHED \
                 from the patient's completed visits in the last 5 years, and select that \
                 provider for the booking.",
                ToolHandler::Effecting(Box::new(AppointmentHistory)),
            )
            .with_schema(
                ArgumentSchema::new()
                    .required("provider_id", ArgumentType::Integer, "The provider's id")
                    .optional(
                        "patient_id",
                        ArgumentType::Integer,
                        "The patient's id; defaults to the current patient",
                    ),
            ),
        )
        .with_tool(
            Tool::new(
                "check_insurance",
                "List the accepted insurances. When an insurance name is given, also report \
                 whether that insurance is known and accepted.",
                ToolHandler::PureLookup(Box::new(CheckInsurance)),
            )
            .with_schema(ArgumentSchema::new().optional(
                "insurance_name",
                ArgumentType::String,
                "Insurance name to check",
            )),
        )
        .with_tool(
            Tool::new(
                "get_self_pay_rate",
                "Get the flat self-pay rate for a specialty and whether it applies to the \
                 current patient.",
                ToolHandler::PureLookup(Box::new(SelfPayRateLookup)),
            )
            .with_schema(ArgumentSchema::new().required(
                "specialty",
                ArgumentType::String,
                "The medical specialty",
            )),
        )
        .with_tool(
            Tool::new(
                "set_patient_insurance",
                "Set or update the current patient's insurance. Unknown insurance names are \
                 recorded as not accepted.",
                ToolHandler::Effecting(Box::new(SetPatientInsurance)),
            )
            .with_schema(ArgumentSchema::new().required(
                "insurance_name",
                ArgumentType::String,
                "Insurance name as stated by the nurse",
            )),
        )
        .with_tool(
            Tool::new(
                "book_appointment",
                "Book the appointment. Call only after the nurse has confirmed provider, \
                 location, date and time. The appointment type is determined from visit \
                 history. A booking can be made only once per conversation.",
                ToolHandler::Effecting(Box::new(BookAppointment)),
            )
            .with_schema(
                ArgumentSchema::new()
                    .required("provider_id", ArgumentType::Integer, "The provider's id")
                    .required("department_id", ArgumentType::Integer, "The location's id")
                    .required("date", ArgumentType::Date, "Appointment date (YYYY-MM-DD)")
                    .required(
                        "appointment_time",
                        ArgumentType::Time,
                        "Start time, 24-hour HH:MM",
                    )
                    .optional(
                        "appointment_type",
                        ArgumentType::String,
                        "NEW or ESTABLISHED, if already determined",
                    )
                    .optional(
                        "patient_id",
                        ArgumentType::Integer,
                        "The patient's id; defaults to the current patient",
                    )
                    .optional("notes", ArgumentType::String, "Notes for the appointment"),
            ),
        )
        .with_tool(
            Tool::new(
                "query_database",
                "Run a read-only SQL SELECT against the records database when no other tool \
                 fits. Use %s placeholders with params. Statements that modify data are refused.",
                ToolHandler::PureLookup(Box::new(QueryDatabase)),
            )
            .with_schema(
                ArgumentSchema::new()
                    .required("sql", ArgumentType::String, "A single SELECT statement")
                    .optional("params", ArgumentType::Array, "Values for the placeholders"),
            )
            .with_guard(read_only_guard),
        )
}

fn provider_json(provider: &Provider) -> JsonValue {
    json!({
        "id": provider.id,
        "name": provider.display_name(),
        "certification": provider.certification,
        "specialty": provider.specialty,
        "department_ids": provider.department_ids,
    })
}

fn department_json(department: &Department) -> JsonValue {
    json!({
        "department_id": department.id,
        "name": department.name,
        "phone": department.phone,
        "address": department.address,
        "hours": department.hours,
    })
}

fn this_patient(args: &ToolArguments, current: PatientId) -> Result<(), ToolFailure> {
    match args.opt_integer("patient_id") {
        Some(id) if PatientId::new(id) != current => Err(ToolFailure::new(
            ToolErrorKind::Validation,
            format!("this conversation is for patient {current}, not patient {id}"),
        )),
        _ => Ok(()),
    }
}

async fn classify_for(
    lookup: &dyn LookupService,
    patient: PatientId,
    provider: ProviderId,
    today: NaiveDate,
) -> Result<(Classification, Option<NaiveDate>), ToolFailure> {
    let history = lookup.appointment_history(patient, provider).await?;
    let last_visit = last_completed_visit(&history, provider);
    Ok((classify(last_visit, today)?, last_visit))
}

/// Records `provider` and its specialty on the booking, and refreshes the
/// insurance disposition for that specialty.
async fn select_provider(
    ctx: &mut EffectContext<'_>,
    provider: Provider,
) -> Result<(), ToolFailure> {
    let specialty = ctx.lookup.specialty(&provider.specialty).await?;
    let disposition = self_pay_disposition(ctx.patient.insurance.as_ref(), &specialty);
    ctx.booking.set_specialty(specialty)?;
    ctx.booking.set_provider(provider)?;
    ctx.booking.set_insurance_disposition(disposition)?;
    Ok(())
}

struct ProvidersBySpecialty;

#[async_trait]
impl LookupHandler for ProvidersBySpecialty {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let specialty = args.string("specialty")?;
        let providers = ctx.lookup.providers_by_specialty(specialty).await?;
        Ok(json!({
            "specialty": specialty,
            "found": !providers.is_empty(),
            "count": providers.len(),
            "providers": providers.iter().map(provider_json).collect::<Vec<_>>(),
        }))
    }
}

struct ProviderLocations;

#[async_trait]
impl LookupHandler for ProviderLocations {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let id = ProviderId::new(args.integer("provider_id")?);
        let provider = ctx.lookup.provider(id).await?;
        let locations = ctx.lookup.provider_departments(id).await?;
        Ok(json!({
            "provider": { "id": provider.id, "name": provider.display_name() },
            "count": locations.len(),
            "locations": locations.iter().map(department_json).collect::<Vec<_>>(),
        }))
    }
}

struct AvailableTimes;

#[async_trait]
impl LookupHandler for AvailableTimes {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let provider_id = ProviderId::new(args.integer("provider_id")?);
        let department_id = DepartmentId::new(args.integer("department_id")?);
        let start_date = args.date("start_date")?;
        let end_date = args.opt_date("end_date").unwrap_or(start_date);
        let today = ctx.clock.today();
        if end_date < today {
            return Err(ToolFailure::new(
                ToolErrorKind::Validation,
                format!("the requested dates are in the past; today is {today}"),
            ));
        }
        let start_date = start_date.max(today);

        let provider = ctx.lookup.provider(provider_id).await?;
        if !provider.department_ids.contains(&department_id) {
            return Err(ToolFailure::new(
                ToolErrorKind::Validation,
                format!(
                    "{} does not practice at department {department_id}",
                    provider.display_name()
                ),
            ));
        }
        let department = ctx.lookup.department(department_id).await?;
        let hours = OfficeHours::parse(&department.hours)?;
        let booked: Vec<BookedSlot> = ctx
            .lookup
            .booked_appointments(provider_id, department_id, start_date, end_date)
            .await?
            .iter()
            .filter_map(BookedSlot::from_record)
            .collect();

        let (classification, assumed) = match ctx.booking.classification_for(provider_id) {
            Some(c) => (c, false),
            None => (Classification::New, true),
        };
        let slots = available_slots(&SlotRequest {
            hours: &hours,
            start_date,
            end_date,
            classification,
            booked: &booked,
        })?;

        let mut by_date: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for slot in &slots {
            by_date
                .entry(slot.date.to_string())
                .or_default()
                .push(slot.start.format("%H:%M").to_string());
        }
        let booked_json: Vec<JsonValue> = booked
            .iter()
            .map(|b| json!({ "date": b.date, "time": b.start.format("%H:%M").to_string() }))
            .collect();

        Ok(json!({
            "provider_id": provider_id,
            "department_id": department_id,
            "office_hours": department.hours,
            "date_range": format!("{start_date} to {end_date}"),
            "appointment_type": classification,
            "appointment_type_assumed": assumed,
            "duration_minutes": duration_minutes(classification),
            "arrival_offset_minutes": arrival_offset_minutes(classification),
            "slot_count": slots.len(),
            "available_times": by_date,
            "booked_times": booked_json,
        }))
    }
}

struct AppointmentHistory;

#[async_trait]
impl EffectingHandler for AppointmentHistory {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &mut EffectContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        this_patient(args, ctx.patient.id)?;
        let provider_id = ProviderId::new(args.integer("provider_id")?);
        let provider = ctx.lookup.provider(provider_id).await?;
        let (classification, last_visit) =
            classify_for(ctx.lookup, ctx.patient.id, provider_id, ctx.clock.today()).await?;

        let name = provider.display_name();
        if !ctx.booking.is_committed() {
            select_provider(ctx, provider).await?;
            ctx.booking.set_classification(classification)?;
        }

        let reason = match (classification, last_visit) {
            (Classification::Established, Some(date)) => {
                format!("Patient has seen {name} within the last 5 years (last visit: {date})")
            }
            (_, Some(date)) => format!(
                "Patient's last completed visit with {name} was {date}, more than 5 years ago"
            ),
            (_, None) => format!("Patient has no completed visit with {name}"),
        };
        Ok(json!({
            "provider_id": provider_id,
            "appointment_type": classification,
            "duration_minutes": duration_minutes(classification),
            "arrival_offset_minutes": arrival_offset_minutes(classification),
            "last_visit": last_visit,
            "reason": reason,
        }))
    }
}

struct CheckInsurance;

#[async_trait]
impl LookupHandler for CheckInsurance {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let insurances = ctx.lookup.insurances().await?;
        let accepted: Vec<&str> = insurances
            .iter()
            .filter(|i| i.accepted)
            .map(|i| i.name.as_str())
            .collect();
        let mut out = Map::new();
        out.insert("accepted_insurances".to_string(), json!(accepted));
        out.insert(
            "patient_insurance".to_string(),
            json!(ctx.patient.insurance.as_ref().map(|i| json!({
                "name": i.name,
                "accepted": i.accepted,
            }))),
        );

        if let Some(name) = args.opt_string("insurance_name") {
            let wanted = name.trim();
            let found = insurances
                .iter()
                .find(|i| i.name.eq_ignore_ascii_case(wanted));
            let (known, is_accepted, message) = match found {
                Some(i) if i.accepted => (true, true, format!("Yes, {} is accepted", i.name)),
                Some(i) => (
                    true,
                    false,
                    format!("{} is in our system but is not currently accepted", i.name),
                ),
                None => (
                    false,
                    false,
                    format!("{wanted} is not in our system and is not accepted"),
                ),
            };
            out.insert("insurance_name".to_string(), json!(wanted));
            out.insert(
                "matched_name".to_string(),
                json!(found.map(|i| i.name.as_str())),
            );
            out.insert("known".to_string(), json!(known));
            out.insert("accepted".to_string(), json!(is_accepted));
            out.insert("message".to_string(), json!(message));
        }
        Ok(JsonValue::Object(out))
    }
}

struct SelfPayRateLookup;

#[async_trait]
impl LookupHandler for SelfPayRateLookup {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let specialty = ctx.lookup.specialty(args.string("specialty")?).await?;
        let disposition = self_pay_disposition(ctx.patient.insurance.as_ref(), &specialty);
        Ok(json!({
            "specialty": specialty.name,
            "rate": specialty.self_pay_rate.as_dollars(),
            "message": format!("Self-pay rate for {}: {}", specialty.name, specialty.self_pay_rate),
            "patient_disposition": disposition,
        }))
    }
}

struct SetPatientInsurance;

#[async_trait]
impl EffectingHandler for SetPatientInsurance {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &mut EffectContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let name = args.string("insurance_name")?.trim();
        if name.is_empty() {
            return Err(ToolFailure::bad_arguments("insurance_name must not be empty"));
        }
        let assignment = ctx.lookup.set_patient_insurance(ctx.patient.id, name).await?;
        *ctx.patient = ctx.lookup.patient(ctx.patient.id).await?;

        if !ctx.booking.is_committed()
            && let Some(specialty) = ctx.booking.specialty()
        {
            let disposition = self_pay_disposition(ctx.patient.insurance.as_ref(), specialty);
            ctx.booking.set_insurance_disposition(disposition)?;
        }

        let message = if assignment.accepted {
            format!("{} set as the patient's insurance; it is accepted", assignment.name)
        } else {
            format!(
                "{} set as the patient's insurance; it is not accepted, so the patient will self-pay",
                assignment.name
            )
        };
        Ok(json!({
            "success": true,
            "insurance_id": assignment.insurance_id,
            "insurance_name": assignment.name,
            "accepted": assignment.accepted,
            "message": message,
        }))
    }
}

struct BookAppointment;

#[async_trait]
impl EffectingHandler for BookAppointment {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &mut EffectContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        ctx.booking.ensure_uncommitted("committed")?;
        this_patient(args, ctx.patient.id)?;

        let provider_id = ProviderId::new(args.integer("provider_id")?);
        let department_id = DepartmentId::new(args.integer("department_id")?);
        let date = args.date("date")?;
        let time = args.time("appointment_time")?;
        let today = ctx.clock.today();
        if date < today {
            return Err(ToolFailure::new(
                ToolErrorKind::Validation,
                format!("{date} is in the past; today is {today}"),
            ));
        }

        let provider = ctx.lookup.provider(provider_id).await?;
        select_provider(ctx, provider).await?;
        let classification = match ctx.booking.classification_for(provider_id) {
            Some(c) => c,
            None => {
                let (c, _) = classify_for(ctx.lookup, ctx.patient.id, provider_id, today).await?;
                ctx.booking.set_classification(c)?;
                c
            }
        };
        if let Some(requested) = args.opt_string("appointment_type")
            && !requested.trim().eq_ignore_ascii_case(classification.as_str())
        {
            return Err(ToolFailure::new(
                ToolErrorKind::Validation,
                format!(
                    "appointment type is {classification} based on visit history, not {}",
                    requested.trim()
                ),
            ));
        }

        let department = ctx.lookup.department(department_id).await?;
        ctx.booking.set_department(department)?;
        ctx.booking.set_candidate_time(date, time)?;
        if let Some(notes) = args.opt_string("notes") {
            ctx.booking.set_notes(notes.trim())?;
        }
        if let Some(check) = ctx.booking.time_check()
            && !check.is_valid()
        {
            if let Some(err) = &check.arrival_error {
                return Err(err.clone().into());
            }
            return Err(ToolFailure::new(
                ToolErrorKind::Validation,
                format!(
                    "{} at {} does not fit: a {} visit lasts {} minutes and must fall within \
                     office hours",
                    date,
                    time.format("%H:%M"),
                    classification,
                    check.duration_minutes
                ),
            ));
        }

        let booked = ctx
            .lookup
            .booked_appointments(provider_id, department_id, date, date)
            .await?;
        let duration = duration_minutes(classification);
        if booked
            .iter()
            .filter_map(BookedSlot::from_record)
            .any(|b| b.overlaps(date, time, duration))
        {
            return Err(ToolFailure::new(
                ToolErrorKind::Validation,
                format!(
                    "{date} at {} overlaps an existing appointment",
                    time.format("%H:%M")
                ),
            ));
        }

        let request = ctx.booking.commit_request()?;
        let receipt = ctx.lookup.commit_appointment(&request).await?;
        ctx.booking.mark_committed(receipt.appointment_id)?;
        info!(
            appointment_id = %receipt.appointment_id,
            patient_id = %request.patient_id,
            provider_id = %request.provider_id,
            "appointment booked"
        );

        Ok(json!({
            "success": true,
            "appointment_id": receipt.appointment_id,
            "confirmation": ctx.booking.summary(),
            "details": {
                "patient_id": request.patient_id,
                "provider_id": request.provider_id,
                "department_id": request.department_id,
                "date": request.date,
                "appointment_time": request.time.format("%H:%M").to_string(),
                "arrival_time": request.arrival_time.format("%H:%M").to_string(),
                "appointment_type": request.classification,
                "duration_minutes": request.duration_minutes,
                "payment": ctx.booking.insurance(),
                "notes": request.notes,
            },
        }))
    }
}

fn read_only_guard(args: &ToolArguments) -> Result<(), ToolFailure> {
    ReadOnlyStatement::new(args.string("sql")?, args.array("params"))?;
    Ok(())
}

struct QueryDatabase;

#[async_trait]
impl LookupHandler for QueryDatabase {
    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &LookupContext<'_>,
    ) -> Result<JsonValue, ToolFailure> {
        let statement = ReadOnlyStatement::new(args.string("sql")?, args.array("params"))?;
        let rows = ctx.lookup.query(&statement).await?;
        Ok(json!({
            "success": true,
            "results": rows.rows,
            "row_count": rows.row_count,
        }))
    }
}
