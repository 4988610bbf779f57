use shared::{
    domain::{Coordinates, GeoPoint, PetId, ReportId, UserId},
    protocol::{CreateReportRequest, PetRecord, DEFAULT_NOTIFICATION_RADIUS_KM},
};
use tracing::{info, warn};

use super::{FormError, FormPhase};
use crate::{
    error::ClientError,
    location::{resolve_address, Geocoder, LocationProvider},
    session::Session,
    ReportDesk,
};

/// Single-page lost-pet report: last-seen pin, notes, alert radius.
#[derive(Debug)]
pub struct LostReportForm {
    pet_id: PetId,
    owner_id: UserId,
    location: Option<GeoPoint>,
    notes: String,
    radius_km: u32,
    phase: FormPhase,
}

impl LostReportForm {
    pub fn new(pet_id: PetId, owner_id: UserId) -> Self {
        Self {
            pet_id,
            owner_id,
            location: None,
            notes: String::new(),
            radius_km: DEFAULT_NOTIFICATION_RADIUS_KM,
            phase: FormPhase::Editing,
        }
    }

    /// The report is filed on behalf of the pet's owner, falling back to the
    /// session user when the record carries none.
    pub fn for_pet(record: &PetRecord, session: &Session) -> Result<Self, FormError> {
        let pet_id = record.pet_id.clone().ok_or(FormError::MissingFields(vec!["petId"]))?;
        let owner_id = record
            .owner_id
            .clone()
            .unwrap_or_else(|| session.user_id().clone());
        Ok(Self::new(pet_id, owner_id))
    }

    pub fn pet_id(&self) -> &PetId {
        &self.pet_id
    }

    pub fn location(&self) -> Option<&GeoPoint> {
        self.location.as_ref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn radius_km(&self) -> u32 {
        self.radius_km
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.notes = notes.into();
        Ok(())
    }

    pub fn set_radius_km(&mut self, radius_km: u32) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.radius_km = radius_km;
        Ok(())
    }

    pub fn set_location(&mut self, point: GeoPoint) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.location = Some(point);
        Ok(())
    }

    /// Moves the pin and resolves its address.
    pub async fn set_pin(
        &mut self,
        coords: Coordinates,
        geocoder: &dyn Geocoder,
    ) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        let address = resolve_address(geocoder, coords).await;
        self.location = Some(GeoPoint::new(coords, address));
        Ok(())
    }

    /// Seeds the pin with the device position.
    pub async fn locate(
        &mut self,
        provider: &dyn LocationProvider,
        geocoder: &dyn Geocoder,
    ) -> Result<(), FormError> {
        let coords = provider.current_position().await?;
        self.set_pin(coords, geocoder).await
    }

    pub fn build_request(&self) -> Result<CreateReportRequest, FormError> {
        let location = self
            .location
            .clone()
            .ok_or(FormError::MissingFields(vec!["lastSeenLocation"]))?;
        Ok(CreateReportRequest {
            pet_id: self.pet_id.clone(),
            owner_id: self.owner_id.clone(),
            last_seen_location: location,
            notification_radius: self.radius_km,
            notes: self.notes.trim().to_string(),
        })
    }

    pub async fn submit<D>(&mut self, desk: &D) -> Result<ReportId, FormError>
    where
        D: ReportDesk + ?Sized,
    {
        self.phase.ensure_editable()?;
        let request = self.build_request()?;
        self.phase.begin()?;
        let result = desk.create_report(request).await;
        settle(&mut self.phase, result, "lost report")
    }
}

pub(crate) fn settle<T>(
    phase: &mut FormPhase,
    result: Result<T, ClientError>,
    what: &'static str,
) -> Result<T, FormError> {
    match result {
        Ok(value) => {
            phase.settle(true)?;
            info!(form = what, "form submitted");
            Ok(value)
        }
        Err(err) => {
            phase.settle(false)?;
            warn!(form = what, error = %err, "form submission failed; draft kept for retry");
            Err(FormError::Submit(err))
        }
    }
}
