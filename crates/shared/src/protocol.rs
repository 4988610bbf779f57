use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    GeoPoint, NotificationId, PetId, PetStatus, ReportId, ReportStatus, SightingId, UserId,
};

/// Default alert radius, in kilometres, attached to a new lost report.
pub const DEFAULT_NOTIFICATION_RADIUS_KM: u32 = 24;

/// Timestamps arrive either as ISO-8601 strings or as serialized Firestore
/// `{_seconds, _nanoseconds}` objects depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Iso(DateTime<Utc>),
    Firestore {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
}

impl Timestamp {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Iso(at) => Some(*at),
            Timestamp::Firestore {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(*seconds, *nanoseconds).single(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificInfo {
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub has_spots: bool,
    #[serde(default)]
    pub is_vaccinated: bool,
    #[serde(default)]
    pub has_illness: bool,
    #[serde(default)]
    pub illness_details: Option<String>,
    #[serde(default)]
    pub temperament: Option<String>,
    #[serde(default)]
    pub special_features: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub owner_phone: String,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default)]
    pub alt_owner_name: Option<String>,
    #[serde(default)]
    pub alt_owner_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetRecord {
    #[serde(default)]
    pub pet_id: Option<PetId>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub status: PetStatus,
    #[serde(default)]
    pub basic_info: BasicInfo,
    #[serde(default)]
    pub specific_info: SpecificInfo,
    #[serde(default)]
    pub owner_info: OwnerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<ReportId>,
}

impl PetRecord {
    pub fn temperament_labels(&self) -> Vec<String> {
        self.specific_info
            .temperament
            .as_deref()
            .map(split_temperament)
            .unwrap_or_default()
    }
}

pub fn split_temperament(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSighting {
    #[serde(default)]
    pub reported_by: Option<String>,
    pub location: GeoPoint,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostReport {
    pub report_id: ReportId,
    pub pet_id: PetId,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub last_seen_location: Option<GeoPoint>,
    #[serde(default)]
    pub notification_radius: Option<u32>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub helpers_count: u32,
    #[serde(default)]
    pub views_count: u32,
    #[serde(default)]
    pub search_route: Vec<ReportSighting>,
    #[serde(default)]
    pub reported_at: Option<Timestamp>,
    #[serde(default)]
    pub pet_info: Option<PetRecord>,
    #[serde(default)]
    pub distance_in_km: Option<f64>,
}

impl LostReport {
    pub fn pet_name(&self) -> Option<&str> {
        self.pet_info
            .as_ref()
            .map(|pet| pet.basic_info.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn owner_phone(&self) -> Option<&str> {
        self.pet_info
            .as_ref()
            .map(|pet| pet.owner_info.owner_phone.as_str())
            .filter(|phone| !phone.is_empty())
    }
}

/// `reportedBy` is a bare user id on write and a resolved profile on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reporter {
    Profile {
        name: String,
        #[serde(default)]
        photo: Option<String>,
    },
    Id(String),
}

impl Reporter {
    pub fn display_name(&self) -> &str {
        match self {
            Reporter::Profile { name, .. } => name,
            Reporter::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetDescription {
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub approximate_size: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SightingComment {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub comment: String,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSighting {
    pub sighting_id: SightingId,
    #[serde(default)]
    pub reported_by: Option<Reporter>,
    pub location: GeoPoint,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pet_description: PetDescription,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub comments: Vec<SightingComment>,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LostPetAlert,
    SightingUpdate,
    PetFound,
    DirectMessage,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub related_entity: Option<RelatedEntity>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub report_id: Option<ReportId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub data: PushData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub pet_id: PetId,
    pub owner_id: UserId,
    pub last_seen_location: GeoPoint,
    pub notification_radius: u32,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTokenRequest {
    pub user_id: UserId,
    pub fcm_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveReportsQuery {
    pub user_lat: f64,
    pub user_lon: f64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicSightingsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    #[serde(default, alias = "sucess")]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pet_id: Option<PetId>,
    #[serde(default)]
    pub report_id: Option<ReportId>,
}

impl MutationResponse {
    /// Only an explicit `success: false` counts; several endpoints answer
    /// with a bare `{message}`.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetEnvelope {
    pub pet: PetRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetListEnvelope {
    #[serde(default)]
    pub pets: Vec<PetRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub report: LostReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListEnvelope {
    #[serde(default)]
    pub reports: Vec<LostReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingEnvelope {
    pub sighting: PublicSighting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingListEnvelope {
    #[serde(default)]
    pub sightings: Vec<PublicSighting>,
}
