//! Client-side core for Lomito: HTTP access to the lost-pet API, the form
//! controllers that build its payloads, and push-notification routing.

use async_trait::async_trait;
use shared::{
    domain::{PetId, ReportId, UserId},
    protocol::{CreateReportRequest, PetRecord},
};

pub mod client;
pub mod config;
pub mod error;
pub mod forms;
pub mod location;
pub mod multipart;
pub mod notifications;
pub mod session;
pub mod share;

pub use client::LomitoClient;
pub use error::{ClientError, UserNotice};
pub use forms::{
    pet::{FormMode, PetField, PetFormController, PetSubmission, StepOutcome},
    report::LostReportForm,
    sighting::{PublicSightingForm, ReportSightingForm},
    FormError, FormPhase,
};
pub use multipart::MultipartUpload;
pub use notifications::{Destination, NotificationHub, Subscription};
pub use session::Session;

/// Pet persistence used by the registration wizard.
#[async_trait]
pub trait PetRegistry: Send + Sync {
    async fn fetch_pet(&self, pet_id: &PetId) -> Result<PetRecord, ClientError>;
    async fn submit_pet(&self, submission: PetSubmission) -> Result<PetId, ClientError>;
}

/// Report and sighting submissions used by the single-page forms.
#[async_trait]
pub trait ReportDesk: Send + Sync {
    async fn create_report(&self, request: CreateReportRequest) -> Result<ReportId, ClientError>;
    async fn add_report_sighting(
        &self,
        report_id: &ReportId,
        upload: MultipartUpload,
    ) -> Result<(), ClientError>;
    async fn create_public_sighting(&self, upload: MultipartUpload) -> Result<(), ClientError>;
}

#[async_trait]
pub trait PushTokenSink: Send + Sync {
    async fn store_push_token(&self, user_id: &UserId, token: &str) -> Result<(), ClientError>;
}
