//! HTTP client for the Lomito API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{NotificationId, PetId, ReportId, SightingId, UserId},
    error::ApiError,
    protocol::{
        ActiveReportsQuery, CreateReportRequest, LostReport, MutationResponse, PetEnvelope,
        PetListEnvelope, PetRecord, PublicSighting, PublicSightingsQuery, PushTokenRequest,
        ReportEnvelope, ReportListEnvelope, SightingEnvelope, SightingListEnvelope,
    },
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Settings,
    error::ClientError,
    forms::pet::{FormMode, PetSubmission},
    multipart::MultipartUpload,
    PetRegistry, PushTokenSink, ReportDesk,
};

/// Sent on every request so tunnelled dev servers skip their HTML interstitial.
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

#[derive(Debug, Clone)]
pub struct LomitoClient {
    http: Client,
    base_url: Url,
}

impl LomitoClient {
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        Self::with_base_url(settings.base_url()?, settings.request_timeout())
    }

    /// `base_url` must end with `/` for relative endpoints to keep its path.
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(TUNNEL_BYPASS_HEADER),
            HeaderValue::from_static("true"),
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    pub async fn register_pet(
        &self,
        pet_id: &PetId,
        upload: MultipartUpload,
    ) -> Result<PetId, ClientError> {
        let form = upload.into_form().await?;
        let response = self
            .http
            .post(self.endpoint("pets/register")?)
            .multipart(form)
            .send()
            .await?;
        let body = mutation(response, "la mascota").await?;
        let pet_id = body.pet_id.unwrap_or_else(|| pet_id.clone());
        info!(pet_id = %pet_id, "pet registered");
        Ok(pet_id)
    }

    pub async fn update_pet(
        &self,
        pet_id: &PetId,
        upload: MultipartUpload,
    ) -> Result<PetId, ClientError> {
        let form = upload.into_form().await?;
        let response = self
            .http
            .put(self.endpoint(&format!("pets/{pet_id}"))?)
            .multipart(form)
            .send()
            .await?;
        mutation(response, "la mascota").await?;
        info!(pet_id = %pet_id, "pet updated");
        Ok(pet_id.clone())
    }

    pub async fn get_pet(&self, pet_id: &PetId) -> Result<PetRecord, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("pets/{pet_id}"))?)
            .send()
            .await?;
        let envelope: PetEnvelope = decode(response, "la mascota").await?;
        debug!(pet_id = %pet_id, "pet fetched");
        Ok(envelope.pet)
    }

    pub async fn list_my_pets(&self, owner_id: &UserId) -> Result<Vec<PetRecord>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("pets/my-pets/{owner_id}"))?)
            .send()
            .await?;
        let envelope: PetListEnvelope = decode(response, "las mascotas").await?;
        debug!(owner_id = %owner_id, count = envelope.pets.len(), "owner pets fetched");
        Ok(envelope.pets)
    }

    pub async fn delete_pet(&self, pet_id: &PetId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("pets/{pet_id}"))?)
            .send()
            .await?;
        mutation(response, "la mascota").await?;
        info!(pet_id = %pet_id, "pet deleted");
        Ok(())
    }

    pub async fn create_report(
        &self,
        request: CreateReportRequest,
    ) -> Result<ReportId, ClientError> {
        let response = self
            .http
            .post(self.endpoint("reports/create")?)
            .json(&request)
            .send()
            .await?;
        let body = mutation(response, "el reporte").await?;
        let report_id = body.report_id.ok_or_else(|| {
            ClientError::InvalidResponse("report creation returned no reportId".into())
        })?;
        info!(report_id = %report_id, pet_id = %request.pet_id, "lost report created");
        Ok(report_id)
    }

    pub async fn get_report(&self, report_id: &ReportId) -> Result<LostReport, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("reports/{report_id}"))?)
            .send()
            .await?;
        let envelope: ReportEnvelope = decode(response, "el reporte").await?;
        Ok(envelope.report)
    }

    pub async fn add_report_sighting(
        &self,
        report_id: &ReportId,
        upload: MultipartUpload,
    ) -> Result<(), ClientError> {
        let form = upload.into_form().await?;
        let response = self
            .http
            .post(self.endpoint(&format!("reports/{report_id}/sighting"))?)
            .multipart(form)
            .send()
            .await?;
        mutation(response, "el reporte").await?;
        info!(report_id = %report_id, "sighting added to report");
        Ok(())
    }

    /// Active reports near the user, sorted by distance on the server.
    pub async fn active_reports(
        &self,
        query: &ActiveReportsQuery,
    ) -> Result<Vec<LostReport>, ClientError> {
        let response = self
            .http
            .get(self.endpoint("sightings/active-reports")?)
            .query(query)
            .send()
            .await?;
        let envelope: ReportListEnvelope = decode(response, "los reportes").await?;
        debug!(count = envelope.reports.len(), "active reports fetched");
        Ok(envelope.reports)
    }

    pub async fn public_sightings(
        &self,
        query: &PublicSightingsQuery,
    ) -> Result<Vec<PublicSighting>, ClientError> {
        let response = self
            .http
            .get(self.endpoint("sightings/public-sightings")?)
            .query(query)
            .send()
            .await?;
        let envelope: SightingListEnvelope = decode(response, "los avistamientos").await?;
        Ok(envelope.sightings)
    }

    pub async fn get_public_sighting(
        &self,
        sighting_id: &SightingId,
    ) -> Result<PublicSighting, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("sightings/public-sightings/{sighting_id}"))?)
            .send()
            .await?;
        let envelope: SightingEnvelope = decode(response, "el avistamiento").await?;
        Ok(envelope.sighting)
    }

    pub async fn create_public_sighting(&self, upload: MultipartUpload) -> Result<(), ClientError> {
        let form = upload.into_form().await?;
        let response = self
            .http
            .post(self.endpoint("sightings/public-sightings/create")?)
            .multipart(form)
            .send()
            .await?;
        mutation(response, "el avistamiento").await?;
        info!("public sighting created");
        Ok(())
    }

    pub async fn comment_on_sighting(
        &self,
        sighting_id: &SightingId,
        user_id: &UserId,
        comment: &str,
    ) -> Result<(), ClientError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ClientError::Validation(vec!["comment".into()]));
        }
        let response = self
            .http
            .post(self.endpoint(&format!(
                "sightings/public-sightings/{sighting_id}/comment"
            ))?)
            .query(&[("user_id", user_id.as_str()), ("comment", comment)])
            .send()
            .await?;
        mutation(response, "el avistamiento").await?;
        info!(sighting_id = %sighting_id, "comment posted");
        Ok(())
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint(&format!("notifications/{notification_id}/mark-read"))?)
            .send()
            .await?;
        mutation(response, "la notificación").await?;
        debug!(notification_id = %notification_id, "notification marked read");
        Ok(())
    }

    pub async fn update_push_token(&self, user_id: &UserId, token: &str) -> Result<(), ClientError> {
        let request = PushTokenRequest {
            user_id: user_id.clone(),
            fcm_token: token.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint("auth/update-fcm-token")?)
            .json(&request)
            .send()
            .await?;
        mutation(response, "el usuario").await?;
        info!(user_id = %user_id, "push token updated");
        Ok(())
    }
}

/// Maps 404 to `NotFound` and any other non-2xx status to `Server`, using
/// the body's `detail` as the message when it has one.
async fn check_status(response: Response, what: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        debug!(url = %response.url(), "resource not found");
        return Err(ClientError::NotFound(what.to_string()));
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .ok()
        .and_then(|err| err.message())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });
    warn!(%url, status = status.as_u16(), %message, "request failed");
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ClientError> {
    let response = check_status(response, what).await?;
    Ok(response.json::<T>().await?)
}

/// Decodes a `{success, message}` envelope. Empty bodies count as success;
/// an explicit `success: false` becomes `Rejected`.
async fn mutation(response: Response, what: &str) -> Result<MutationResponse, ClientError> {
    let response = check_status(response, what).await?;
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MutationResponse::default());
    }
    let body: MutationResponse = serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::InvalidResponse(format!("malformed response body: {e}")))?;
    if body.is_rejected() {
        let message = body
            .message
            .clone()
            .unwrap_or_else(|| "La solicitud fue rechazada.".to_string());
        return Err(ClientError::Rejected(message));
    }
    Ok(body)
}

#[async_trait]
impl PetRegistry for LomitoClient {
    async fn fetch_pet(&self, pet_id: &PetId) -> Result<PetRecord, ClientError> {
        self.get_pet(pet_id).await
    }

    async fn submit_pet(&self, submission: PetSubmission) -> Result<PetId, ClientError> {
        match &submission.mode {
            FormMode::Register => self.register_pet(&submission.pet_id, submission.upload).await,
            FormMode::Edit(pet_id) => self.update_pet(pet_id, submission.upload).await,
        }
    }
}

#[async_trait]
impl ReportDesk for LomitoClient {
    async fn create_report(&self, request: CreateReportRequest) -> Result<ReportId, ClientError> {
        LomitoClient::create_report(self, request).await
    }

    async fn add_report_sighting(
        &self,
        report_id: &ReportId,
        upload: MultipartUpload,
    ) -> Result<(), ClientError> {
        LomitoClient::add_report_sighting(self, report_id, upload).await
    }

    async fn create_public_sighting(&self, upload: MultipartUpload) -> Result<(), ClientError> {
        LomitoClient::create_public_sighting(self, upload).await
    }
}

#[async_trait]
impl PushTokenSink for LomitoClient {
    async fn store_push_token(&self, user_id: &UserId, token: &str) -> Result<(), ClientError> {
        self.update_push_token(user_id, token).await
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
