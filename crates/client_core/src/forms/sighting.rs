use shared::domain::{Coordinates, GeoPoint, ReportId, UserId};

use super::{
    attachments::{Attachment, Attachments},
    report::settle,
    FormError, FormPhase,
};
use crate::{
    location::{resolve_address, Geocoder},
    multipart::MultipartUpload,
    ReportDesk,
};

const SIGHTING_PHOTO_PREFIX: &str = "sighting";

/// Sighting appended to the search route of an existing lost report.
#[derive(Debug)]
pub struct ReportSightingForm {
    report_id: ReportId,
    reporter: UserId,
    location: Option<GeoPoint>,
    notes: String,
    photos: Attachments,
    phase: FormPhase,
}

impl ReportSightingForm {
    pub fn new(report_id: ReportId, reporter: UserId) -> Self {
        Self {
            report_id,
            reporter,
            location: None,
            notes: String::new(),
            photos: Attachments::default(),
            phase: FormPhase::Editing,
        }
    }

    pub fn report_id(&self) -> &ReportId {
        &self.report_id
    }

    pub fn location(&self) -> Option<&GeoPoint> {
        self.location.as_ref()
    }

    pub fn photos(&self) -> &Attachments {
        &self.photos
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.notes = notes.into();
        Ok(())
    }

    pub fn set_location(&mut self, point: GeoPoint) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.location = Some(point);
        Ok(())
    }

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

    pub fn add_photo(&mut self, attachment: Attachment) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.photos.add(attachment)
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.photos.remove(index).map(|_| ())
    }

    pub fn build_upload(&self) -> Result<MultipartUpload, FormError> {
        let location = self
            .location
            .as_ref()
            .ok_or(FormError::MissingFields(vec!["location"]))?;
        let mut upload = MultipartUpload::new();
        upload
            .text("reportedBy", self.reporter.as_str())
            .text("latitude", location.latitude.to_string())
            .text("longitude", location.longitude.to_string())
            .text("address", location.address.as_str())
            .text("notes", self.notes.trim());
        for attachment in self.photos.local() {
            upload.file("photos", attachment, SIGHTING_PHOTO_PREFIX);
        }
        Ok(upload)
    }

    pub async fn submit<D>(&mut self, desk: &D) -> Result<(), FormError>
    where
        D: ReportDesk + ?Sized,
    {
        self.phase.ensure_editable()?;
        let upload = self.build_upload()?;
        self.phase.begin()?;
        let result = desk.add_report_sighting(&self.report_id, upload).await;
        settle(&mut self.phase, result, "report sighting")
    }
}

/// Report-independent sighting posted to the public board.
#[derive(Debug)]
pub struct PublicSightingForm {
    reporter: UserId,
    location: Option<GeoPoint>,
    description: String,
    species: String,
    approximate_size: String,
    /// Free text, comma separated.
    colors: String,
    photos: Attachments,
    phase: FormPhase,
}

impl PublicSightingForm {
    pub fn new(reporter: UserId) -> Self {
        Self {
            reporter,
            location: None,
            description: String::new(),
            species: "Perro".into(),
            approximate_size: "Mediano".into(),
            colors: String::new(),
            photos: Attachments::default(),
            phase: FormPhase::Editing,
        }
    }

    pub fn location(&self) -> Option<&GeoPoint> {
        self.location.as_ref()
    }

    pub fn photos(&self) -> &Attachments {
        &self.photos
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.description = description.into();
        Ok(())
    }

    pub fn set_species(&mut self, species: impl Into<String>) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.species = species.into();
        Ok(())
    }

    pub fn set_approximate_size(&mut self, size: impl Into<String>) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.approximate_size = size.into();
        Ok(())
    }

    pub fn set_colors(&mut self, colors: impl Into<String>) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.colors = colors.into();
        Ok(())
    }

    pub fn set_location(&mut self, point: GeoPoint) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.location = Some(point);
        Ok(())
    }

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

    pub fn add_photo(&mut self, attachment: Attachment) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.photos.add(attachment)
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.photos.remove(index).map(|_| ())
    }

    fn color_list(&self) -> Vec<&str> {
        self.colors
            .split(',')
            .map(str::trim)
            .filter(|color| !color.is_empty())
            .collect()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.location.is_none() {
            missing.push("location");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.species.trim().is_empty() {
            missing.push("species");
        }
        if self.approximate_size.trim().is_empty() {
            missing.push("approximate_size");
        }
        if self.color_list().is_empty() {
            missing.push("colors");
        }
        missing
    }

    pub fn build_upload(&self) -> Result<MultipartUpload, FormError> {
        let missing = self.missing_fields();
        let Some(location) = self.location.as_ref().filter(|_| missing.is_empty()) else {
            return Err(FormError::MissingFields(missing));
        };
        let mut upload = MultipartUpload::new();
        upload
            .text("reported_by", self.reporter.as_str())
            .text("description", self.description.trim())
            .text("address", location.address.as_str())
            .text("latitude", location.latitude.to_string())
            .text("longitude", location.longitude.to_string())
            .text("species", self.species.trim())
            .text("approximate_size", self.approximate_size.trim())
            .repeated("colors", self.color_list());
        for attachment in self.photos.local() {
            upload.file("photos", attachment, SIGHTING_PHOTO_PREFIX);
        }
        Ok(upload)
    }

    pub async fn submit<D>(&mut self, desk: &D) -> Result<(), FormError>
    where
        D: ReportDesk + ?Sized,
    {
        self.phase.ensure_editable()?;
        let upload = self.build_upload()?;
        self.phase.begin()?;
        let result = desk.create_public_sighting(upload).await;
        settle(&mut self.phase, result, "public sighting")
    }
}

#[cfg(test)]
#[path = "../tests/single_page_form_tests.rs"]
mod tests;
