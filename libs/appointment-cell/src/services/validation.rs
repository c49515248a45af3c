use chrono::NaiveDateTime;
use tracing::debug;

use doctor_cell::models::{format_slot_date, format_slot_time, parse_slot_date, parse_slot_time};

use crate::models::{
    AppointmentDraft, AppointmentError, BookAppointmentRequest, CommunicationMethod, EmergencyContact,
    ReasonForVisit, SessionType,
};

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Checks a booking form and turns it into the draft sent to the clinic
/// backend. Nothing here touches the network.
///
/// Slot labels are re-rendered in their canonical wire form so the backend's
/// literal string matching sees `10:00 AM` even if the form sent `10:00 am`.
pub fn validate_draft(request: BookAppointmentRequest, now: NaiveDateTime) -> Result<AppointmentDraft, AppointmentError> {
    if !request.consent_given {
        return Err(AppointmentError::ConsentRequired);
    }

    let doc_id = request.doc_id.trim();
    if doc_id.is_empty() {
        return Err(AppointmentError::MissingDoctorId);
    }

    let reason = ReasonForVisit::resolve(&request.reason_for_visit, request.other_reason.as_deref())?;

    let session_type = SessionType::parse(&request.session_type)
        .ok_or_else(|| AppointmentError::UnknownSessionType(request.session_type.clone()))?;

    let communication_method = match session_type {
        SessionType::Online => {
            let raw = request
                .communication_method
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .ok_or(AppointmentError::CommunicationMethodRequired)?;
            Some(
                CommunicationMethod::parse(raw)
                    .ok_or_else(|| AppointmentError::UnknownCommunicationMethod(raw.to_string()))?,
            )
        }
        // In-person sessions have no remote channel
        SessionType::InPerson => None,
    };

    let date = parse_slot_date(&request.slot_date)
        .ok_or_else(|| AppointmentError::InvalidSlotDate(request.slot_date.clone()))?;
    let time = parse_slot_time(&request.slot_time)
        .ok_or_else(|| AppointmentError::InvalidSlotTime(request.slot_time.clone()))?;

    if date.and_time(time) < now {
        return Err(AppointmentError::SlotInPast);
    }

    let emergency_contact = normalize_contact(request.emergency_contact)?;

    debug!("Booking form for doctor {} at {} {} passed validation", doc_id, request.slot_date, request.slot_time);

    Ok(AppointmentDraft {
        doc_id: doc_id.to_string(),
        slot_date: format_slot_date(date),
        slot_time: format_slot_time(time),
        reason_for_visit: reason.label().to_string(),
        session_type,
        communication_method,
        brief_notes: request.brief_notes.trim().to_string(),
        emergency_contact,
        consent_given: true,
    })
}

fn normalize_contact(contact: EmergencyContact) -> Result<EmergencyContact, AppointmentError> {
    let phone = contact.phone.trim();
    if !phone.is_empty() && !is_valid_phone(phone) {
        return Err(AppointmentError::InvalidEmergencyPhone);
    }

    Ok(EmergencyContact {
        name: contact.name.trim().to_string(),
        phone: phone.to_string(),
        relationship: contact.relationship.trim().to_string(),
    })
}

fn is_valid_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let mut digits = 0;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' => {}
            _ => return false,
        }
    }
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::clinic_time;

    fn form() -> BookAppointmentRequest {
        BookAppointmentRequest {
            doc_id: "doc1".to_string(),
            slot_date: "16/01/2025".to_string(),
            slot_time: "10:00 AM".to_string(),
            reason_for_visit: "Anxiety".to_string(),
            other_reason: None,
            session_type: "Online".to_string(),
            communication_method: Some("Video Call".to_string()),
            brief_notes: "First session".to_string(),
            emergency_contact: EmergencyContact::default(),
            consent_given: true,
        }
    }

    fn now() -> NaiveDateTime {
        clinic_time(2025, 1, 15, 9, 0)
    }

    #[test]
    fn test_valid_form_becomes_draft() {
        let draft = validate_draft(form(), now()).unwrap();

        assert_eq!(draft.doc_id, "doc1");
        assert_eq!(draft.slot_date, "16/01/2025");
        assert_eq!(draft.slot_time, "10:00 AM");
        assert_eq!(draft.communication_method, Some(CommunicationMethod::VideoCall));
        assert!(draft.consent_given);
    }

    #[test]
    fn test_consent_required() {
        let request = BookAppointmentRequest { consent_given: false, ..form() };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::ConsentRequired));
    }

    #[test]
    fn test_online_requires_method() {
        let request = BookAppointmentRequest { communication_method: None, ..form() };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::CommunicationMethodRequired));

        let request = BookAppointmentRequest { communication_method: Some("  ".into()), ..form() };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::CommunicationMethodRequired));

        let request = BookAppointmentRequest { communication_method: Some("Fax".into()), ..form() };
        assert_matches!(
            validate_draft(request, now()),
            Err(AppointmentError::UnknownCommunicationMethod(m)) if m == "Fax"
        );
    }

    #[test]
    fn test_in_person_drops_method() {
        let request = BookAppointmentRequest {
            session_type: "In-Person".to_string(),
            communication_method: Some("Chat".to_string()),
            ..form()
        };
        let draft = validate_draft(request, now()).unwrap();

        assert_eq!(draft.session_type, SessionType::InPerson);
        assert_eq!(draft.communication_method, None);

        let wire = serde_json::to_value(&draft).unwrap();
        assert!(wire.get("communicationMethod").is_none());
        assert_eq!(wire["sessionType"], "In-Person");
    }

    #[test]
    fn test_other_reason_uses_free_text() {
        let request = BookAppointmentRequest {
            reason_for_visit: "Other".to_string(),
            other_reason: Some("Burnout at work".to_string()),
            ..form()
        };
        assert_eq!(validate_draft(request, now()).unwrap().reason_for_visit, "Burnout at work");
    }

    #[test]
    fn test_slot_labels_are_canonicalized() {
        let request = BookAppointmentRequest {
            slot_date: " 06/01/2025 ".to_string(),
            slot_time: "01:30 pm".to_string(),
            ..form()
        };
        let now = clinic_time(2025, 1, 5, 9, 0);
        let draft = validate_draft(request, now).unwrap();

        assert_eq!(draft.slot_date, "06/01/2025");
        assert_eq!(draft.slot_time, "1:30 PM");
    }

    #[test]
    fn test_past_slot_rejected() {
        let request = BookAppointmentRequest {
            slot_date: "15/01/2025".to_string(),
            slot_time: "8:30 AM".to_string(),
            ..form()
        };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::SlotInPast));
    }

    #[test]
    fn test_malformed_slot_rejected() {
        let request = BookAppointmentRequest { slot_date: "2025-01-16".to_string(), ..form() };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::InvalidSlotDate(_)));

        let request = BookAppointmentRequest { slot_time: "10h00".to_string(), ..form() };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::InvalidSlotTime(_)));
    }

    #[test]
    fn test_emergency_phone() {
        assert!(is_valid_phone("+91 98765-43210"));
        assert!(is_valid_phone("(022) 2345 678"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone("98765x4321"));

        let request = BookAppointmentRequest {
            emergency_contact: EmergencyContact {
                name: "Asha".to_string(),
                phone: "123".to_string(),
                relationship: "Sister".to_string(),
            },
            ..form()
        };
        assert_matches!(validate_draft(request, now()), Err(AppointmentError::InvalidEmergencyPhone));
    }
}
