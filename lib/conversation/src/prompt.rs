//! System prompt for the booking assistant.

use care_coordinator_core::Patient;
use chrono::NaiveDate;

/// Most recent visits included in the patient context.
pub const RECENT_VISITS: usize = 5;

/// Coordinator instructions sent ahead of every transcript.
pub const COORDINATOR_INSTRUCTIONS: &str = "\
You are a care coordinator assistant helping hospital nurses book patient appointments.

The nurse has already loaded the patient's chart: demographics, referrals, visit history and notes.

Your goal is to book one appointment by collecting:
1. Provider
2. Location
3. Date and time
The appointment type (NEW or ESTABLISHED) is determined with check_appointment_history, never guessed.

Workflow:
1. Understand what the nurse needs, using the referrals for context.
2. Use tools to look up providers, locations and availability.
3. Present options to the nurse instead of deciding for them.
4. Ask for anything that is missing.
5. Confirm every detail, then call book_appointment.
6. Reply with a confirmation that includes date, time, arrival time, location and appointment type.

Business rules:
- NEW: no completed visit with that provider in the last 5 years. 30 minutes, arrive 30 minutes early.
- ESTABLISHED: a completed visit with that provider within 5 years. 15 minutes, arrive 10 minutes early.
- Appointments must fit inside the location's office hours.
- If the patient's insurance is missing or not accepted, the patient pays the specialty's self-pay rate; say so.

Tool rules:
- Do not retry a failed tool call automatically; explain the problem and ask the nurse how to proceed.
- Most bookings need 4 to 8 tool calls. If you have made 6 without progress, reassess.
- Use query_database only when no other tool fits. It is read-only.

Be professional and concise. Nurses are busy.";

/// Summarises the patient chart for the assistant.
#[must_use]
pub fn patient_context(patient: &Patient) -> String {
    let notes = if patient.notes.is_empty() {
        String::new()
    } else {
        format!("Notes: {}\n", patient.notes)
    };

    let insurance = match &patient.insurance {
        Some(insurance) if insurance.accepted => format!("{} (accepted)", insurance.name),
        Some(insurance) => format!("{} (NOT accepted; patient will self-pay)", insurance.name),
        None => "none on file (patient will self-pay)".to_string(),
    };

    let referrals = if patient.referrals.is_empty() {
        " none".to_string()
    } else {
        patient
            .referrals
            .iter()
            .map(|referral| match &referral.provider {
                Some(provider) => format!("\n- {} with {}", referral.specialty, provider),
                None => format!("\n- {}", referral.specialty),
            })
            .collect()
    };

    let visits = if patient.appointments.is_empty() {
        " none".to_string()
    } else {
        patient
            .appointments
            .iter()
            .take(RECENT_VISITS)
            .map(|visit| {
                let time = visit
                    .time
                    .map(|t| format!(" {}", t.format("%H:%M")))
                    .unwrap_or_default();
                format!(
                    "\n- {}{time} with {} ({})",
                    visit.date, visit.provider, visit.status
                )
            })
            .collect()
    };

    format!(
        "CURRENT PATIENT:\n\
         Name: {}\n\
         Patient ID: {}\n\
         DOB: {}\n\
         PCP: {}\n\
         EHR ID: {}\n\
         {notes}\
         Insurance: {insurance}\n\
         Referrals:{referrals}\n\
         Recent appointments:{visits}",
        patient.name, patient.id, patient.dob, patient.pcp, patient.ehr_id,
    )
}

/// Builds the full system prompt for one round-trip.
#[must_use]
pub fn system_prompt(patient: &Patient, today: NaiveDate) -> String {
    format!(
        "{COORDINATOR_INSTRUCTIONS}\n\nToday is {} ({}).\n\n{}",
        today,
        today.format("%A"),
        patient_context(patient)
    )
}
