//! Draft-holding form controllers: the multi-step pet wizard and the
//! single-page report and sighting forms.

pub mod attachments;
pub mod pet;
pub mod report;
pub mod sighting;

use thiserror::Error;

use crate::error::ClientError;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid value '{value}' for field {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error("field {field} does not accept this kind of value")]
    TypeMismatch { field: &'static str },
    #[error("at most {max} photos can be attached")]
    AttachmentLimit { max: usize },
    #[error("no photo at index {index} (have {len})")]
    AttachmentIndex { index: usize, len: usize },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("form was already submitted")]
    AlreadySubmitted,
    #[error("no submission is in flight")]
    NotSubmitting,
    #[error(transparent)]
    Submit(#[from] ClientError),
}

impl FormError {
    /// The same failure expressed in the client error taxonomy.
    pub fn to_client_error(&self) -> Option<ClientError> {
        match self {
            FormError::MissingFields(fields) => Some(ClientError::Validation(
                fields.iter().map(|f| f.to_string()).collect(),
            )),
            _ => None,
        }
    }
}

/// Lifecycle shared by every form: editing until a submission starts, back
/// to editing if it fails, done once it succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormPhase {
    #[default]
    Editing,
    Submitting,
    Done,
}

impl FormPhase {
    pub(crate) fn begin(&mut self) -> Result<(), FormError> {
        match self {
            FormPhase::Editing => {
                *self = FormPhase::Submitting;
                Ok(())
            }
            FormPhase::Submitting => Err(FormError::SubmissionInFlight),
            FormPhase::Done => Err(FormError::AlreadySubmitted),
        }
    }

    pub(crate) fn settle(&mut self, succeeded: bool) -> Result<(), FormError> {
        if *self != FormPhase::Submitting {
            return Err(FormError::NotSubmitting);
        }
        *self = if succeeded {
            FormPhase::Done
        } else {
            FormPhase::Editing
        };
        Ok(())
    }

    pub(crate) fn ensure_editable(&self) -> Result<(), FormError> {
        match self {
            FormPhase::Editing => Ok(()),
            FormPhase::Submitting => Err(FormError::SubmissionInFlight),
            FormPhase::Done => Err(FormError::AlreadySubmitted),
        }
    }
}
