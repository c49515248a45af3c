use serde::{Deserialize, Serialize};
use thiserror::Error;

use payment_cell::{CheckoutOptions, PaymentError};
use shared_backend::BackendError;
use shared_models::error::AppError;
use shared_models::reservation::TempReservationId;

// ==============================================================================
// FORM OPTIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "Online")]
    Online,
    #[serde(rename = "In-Person")]
    InPerson,
}

impl SessionType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Online" => Some(SessionType::Online),
            "In-Person" => Some(SessionType::InPerson),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationMethod {
    #[serde(rename = "Video Call")]
    VideoCall,
    #[serde(rename = "Voice Call")]
    VoiceCall,
    #[serde(rename = "Chat")]
    Chat,
}

impl CommunicationMethod {
    pub const ALL: [CommunicationMethod; 3] = [
        CommunicationMethod::VideoCall,
        CommunicationMethod::VoiceCall,
        CommunicationMethod::Chat,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CommunicationMethod::VideoCall => "Video Call",
            CommunicationMethod::VoiceCall => "Voice Call",
            CommunicationMethod::Chat => "Chat",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|m| m.label() == raw)
    }
}

/// Reason picked in the booking form. `Other` carries the patient's own text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonForVisit {
    Anxiety,
    Depression,
    StressManagement,
    RelationshipIssues,
    Trauma,
    Grief,
    Other(String),
}

impl ReasonForVisit {
    pub const OPTIONS: [&'static str; 7] = [
        "Anxiety",
        "Depression",
        "Stress Management",
        "Relationship Issues",
        "Trauma",
        "Grief",
        "Other",
    ];

    /// Resolves the selected option, substituting the free-text answer for `Other`.
    pub fn resolve(selected: &str, other_text: Option<&str>) -> Result<Self, AppointmentError> {
        let reason = match selected.trim() {
            "" => return Err(AppointmentError::ReasonRequired),
            "Anxiety" => ReasonForVisit::Anxiety,
            "Depression" => ReasonForVisit::Depression,
            "Stress Management" => ReasonForVisit::StressManagement,
            "Relationship Issues" => ReasonForVisit::RelationshipIssues,
            "Trauma" => ReasonForVisit::Trauma,
            "Grief" => ReasonForVisit::Grief,
            "Other" => {
                let text = other_text.map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return Err(AppointmentError::ReasonRequired);
                }
                ReasonForVisit::Other(text.to_string())
            }
            unknown => return Err(AppointmentError::UnknownReason(unknown.to_string())),
        };
        Ok(reason)
    }

    pub fn label(&self) -> &str {
        match self {
            ReasonForVisit::Anxiety => "Anxiety",
            ReasonForVisit::Depression => "Depression",
            ReasonForVisit::StressManagement => "Stress Management",
            ReasonForVisit::RelationshipIssues => "Relationship Issues",
            ReasonForVisit::Trauma => "Trauma",
            ReasonForVisit::Grief => "Grief",
            ReasonForVisit::Other(text) => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub relationship: String,
}

// ==============================================================================
// REQUEST / WIRE MODELS
// ==============================================================================

/// Booking form as posted by the patient UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doc_id: String,
    pub slot_date: String,
    pub slot_time: String,
    #[serde(default)]
    pub reason_for_visit: String,
    /// Free text used when `reason_for_visit` is "Other".
    #[serde(default)]
    pub other_reason: Option<String>,
    pub session_type: String,
    #[serde(default)]
    pub communication_method: Option<String>,
    #[serde(default)]
    pub brief_notes: String,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub consent_given: bool,
}

/// Validated draft, serialized exactly as the clinic backend expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    pub doc_id: String,
    pub slot_date: String,
    pub slot_time: String,
    pub reason_for_visit: String,
    pub session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_method: Option<CommunicationMethod>,
    pub brief_notes: String,
    pub emergency_contact: EmergencyContact,
    pub consent_given: bool,
}

/// What the patient UI receives after a successful booking request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub temp_reservation_id: TempReservationId,
    pub message: String,
    pub checkout: CheckoutOptions,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Please accept the consent terms to continue")]
    ConsentRequired,

    #[error("Please select a reason for your visit")]
    ReasonRequired,

    #[error("Unknown reason for visit: {0}")]
    UnknownReason(String),

    #[error("Unknown session type: {0}")]
    UnknownSessionType(String),

    #[error("Please select a communication method for online sessions")]
    CommunicationMethodRequired,

    #[error("Unknown communication method: {0}")]
    UnknownCommunicationMethod(String),

    #[error("Doctor id is required")]
    MissingDoctorId,

    #[error("Invalid slot date: {0}")]
    InvalidSlotDate(String),

    #[error("Invalid slot time: {0}")]
    InvalidSlotTime(String),

    #[error("Selected slot is in the past")]
    SlotInPast,

    #[error("Emergency contact phone must contain 7 to 15 digits")]
    InvalidEmergencyPhone,

    #[error("A booking is already in progress")]
    BookingInProgress,

    #[error("{0}")]
    Submission(#[from] BackendError),

    #[error("{0}")]
    Payment(#[from] PaymentError),

    #[error("Booking task failed: {0}")]
    Interrupted(String),
}

impl AppointmentError {
    /// Caught before any call to the clinic backend.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            AppointmentError::BookingInProgress
                | AppointmentError::Submission(_)
                | AppointmentError::Payment(_)
                | AppointmentError::Interrupted(_)
        )
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::BookingInProgress => AppError::Conflict(err.to_string()),
            AppointmentError::Submission(inner) => inner.into(),
            AppointmentError::Payment(inner) => inner.into(),
            AppointmentError::Interrupted(_) => AppError::Internal(err.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}
