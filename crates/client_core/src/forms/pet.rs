//! Multi-step pet registration / editing wizard.

use shared::{
    domain::{is_known_temperament, PetId, PetSize, Sex, Species},
    protocol::PetRecord,
};
use tracing::{debug, info, warn};

use super::{
    attachments::{Attachment, Attachments},
    FormError, FormPhase,
};
use crate::{error::ClientError, multipart::MultipartUpload, PetRegistry};

pub const PET_FORM_STEPS: u8 = 3;

const PHOTO_PREFIX: &str = "photo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PetField {
    Name,
    Photos,
    Species,
    Breed,
    Size,
    Age,
    PredominantColor,
    SecondaryColor,
    HasSpots,
    Sex,
    IsVaccinated,
    HasIllness,
    IllnessDetails,
    Temperament,
    SpecialFeatures,
    OwnerName,
    OwnerPhone,
    OwnerEmail,
    AltOwnerName,
    AltOwnerPhone,
    Address,
}

impl PetField {
    pub const ALL: &'static [PetField] = &[
        PetField::Name,
        PetField::Photos,
        PetField::Species,
        PetField::Sex,
        PetField::Size,
        PetField::Breed,
        PetField::Age,
        PetField::PredominantColor,
        PetField::SecondaryColor,
        PetField::HasSpots,
        PetField::IsVaccinated,
        PetField::HasIllness,
        PetField::IllnessDetails,
        PetField::Temperament,
        PetField::SpecialFeatures,
        PetField::OwnerName,
        PetField::OwnerPhone,
        PetField::OwnerEmail,
        PetField::AltOwnerName,
        PetField::AltOwnerPhone,
        PetField::Address,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            PetField::Name => "name",
            PetField::Photos => "photos",
            PetField::Species => "species",
            PetField::Breed => "breed",
            PetField::Size => "size",
            PetField::Age => "age",
            PetField::PredominantColor => "predominantColor",
            PetField::SecondaryColor => "secondaryColor",
            PetField::HasSpots => "hasSpots",
            PetField::Sex => "sex",
            PetField::IsVaccinated => "isVaccinated",
            PetField::HasIllness => "hasIllness",
            PetField::IllnessDetails => "illnessDetails",
            PetField::Temperament => "temperament",
            PetField::SpecialFeatures => "specialFeatures",
            PetField::OwnerName => "ownerName",
            PetField::OwnerPhone => "ownerPhone",
            PetField::OwnerEmail => "ownerEmail",
            PetField::AltOwnerName => "altOwnerName",
            PetField::AltOwnerPhone => "altOwnerPhone",
            PetField::Address => "address",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.wire_name() == name)
    }

    pub fn step(self) -> u8 {
        match self {
            PetField::Name | PetField::Photos => 1,
            PetField::OwnerName
            | PetField::OwnerPhone
            | PetField::OwnerEmail
            | PetField::AltOwnerName
            | PetField::AltOwnerPhone
            | PetField::Address => 3,
            _ => 2,
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            PetField::Name
                | PetField::Photos
                | PetField::Species
                | PetField::Sex
                | PetField::Size
                | PetField::Breed
                | PetField::Age
                | PetField::PredominantColor
                | PetField::OwnerName
                | PetField::OwnerPhone
                | PetField::OwnerEmail
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Photo(Attachment),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetDraft {
    pub name: String,
    pub photos: Attachments,
    pub species: Option<Species>,
    pub breed: String,
    pub size: Option<PetSize>,
    pub age: String,
    pub predominant_color: String,
    pub secondary_color: String,
    pub has_spots: bool,
    pub sex: Option<Sex>,
    pub is_vaccinated: bool,
    pub has_illness: bool,
    pub illness_details: String,
    /// Selected labels in selection order, no duplicates.
    pub temperament: Vec<String>,
    pub special_features: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: String,
    pub alt_owner_name: String,
    pub alt_owner_phone: String,
    pub address: String,
}

impl PetDraft {
    pub fn from_record(record: &PetRecord) -> Self {
        let specific = &record.specific_info;
        let owner = &record.owner_info;
        let mut colors = specific.colors.iter();
        Self {
            name: record.basic_info.name.clone(),
            photos: Attachments::from_remote(record.basic_info.photos.iter().cloned()),
            species: specific.species.as_deref().and_then(Species::parse),
            breed: specific.breed.clone().unwrap_or_default(),
            size: specific.size.as_deref().and_then(PetSize::parse),
            age: specific.age.map(|age| age.to_string()).unwrap_or_default(),
            predominant_color: colors.next().cloned().unwrap_or_default(),
            secondary_color: colors.next().cloned().unwrap_or_default(),
            has_spots: specific.has_spots,
            sex: specific.sex.as_deref().and_then(Sex::parse),
            is_vaccinated: specific.is_vaccinated,
            has_illness: specific.has_illness,
            illness_details: specific.illness_details.clone().unwrap_or_default(),
            temperament: record.temperament_labels(),
            special_features: specific.special_features.clone().unwrap_or_default(),
            owner_name: owner.owner_name.clone(),
            owner_phone: owner.owner_phone.clone(),
            owner_email: owner.owner_email.clone(),
            alt_owner_name: owner.alt_owner_name.clone().unwrap_or_default(),
            alt_owner_phone: owner.alt_owner_phone.clone().unwrap_or_default(),
            address: owner.address.clone().unwrap_or_default(),
        }
    }

    fn is_filled(&self, field: PetField) -> bool {
        let text = |value: &str| !value.trim().is_empty();
        match field {
            PetField::Name => text(&self.name),
            PetField::Photos => !self.photos.is_empty(),
            PetField::Species => self.species.is_some(),
            PetField::Sex => self.sex.is_some(),
            PetField::Size => self.size.is_some(),
            PetField::Breed => text(&self.breed),
            PetField::Age => text(&self.age),
            PetField::PredominantColor => text(&self.predominant_color),
            PetField::OwnerName => text(&self.owner_name),
            PetField::OwnerPhone => text(&self.owner_phone),
            PetField::OwnerEmail => text(&self.owner_email),
            _ => true,
        }
    }

    /// Required fields of `step` that are still empty.
    pub fn missing_fields(&self, step: u8) -> Vec<PetField> {
        PetField::ALL
            .iter()
            .copied()
            .filter(|field| field.step() == step && field.is_required())
            .filter(|field| !self.is_filled(*field))
            .collect()
    }

    /// Predominant then secondary color, trimmed, blanks dropped.
    pub fn colors(&self) -> Vec<String> {
        [&self.predominant_color, &self.secondary_color]
            .into_iter()
            .map(|color| color.trim())
            .filter(|color| !color.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn toggle_temperament(&mut self, label: &str) -> bool {
        if let Some(pos) = self.temperament.iter().position(|t| t == label) {
            self.temperament.remove(pos);
            false
        } else {
            self.temperament.push(label.to_string());
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Register,
    Edit(PetId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetSubmission {
    pub mode: FormMode,
    pub pet_id: PetId,
    pub upload: MultipartUpload,
}

pub fn serialize_draft(draft: &PetDraft, mode: &FormMode) -> PetSubmission {
    let mut upload = MultipartUpload::new();
    let pet_id = match mode {
        FormMode::Register => {
            let id = PetId::generate();
            upload.text("petId", id.as_str());
            id
        }
        FormMode::Edit(id) => id.clone(),
    };

    upload
        .text("name", draft.name.trim())
        .text("species", draft.species.map(|s| s.as_str()).unwrap_or_default())
        .text("breed", draft.breed.trim())
        .text("size", draft.size.map(|s| s.as_str()).unwrap_or_default())
        .text("age", draft.age.as_str())
        .text("sex", draft.sex.map(|s| s.as_str()).unwrap_or_default())
        .repeated("colors", draft.colors())
        .flag("hasSpots", draft.has_spots)
        .flag("isVaccinated", draft.is_vaccinated)
        .flag("hasIllness", draft.has_illness)
        .text(
            "illnessDetails",
            if draft.has_illness {
                draft.illness_details.trim()
            } else {
                ""
            },
        )
        .text("temperament", draft.temperament.join(","))
        .text("specialFeatures", draft.special_features.trim())
        .text("ownerName", draft.owner_name.trim())
        .text("ownerPhone", draft.owner_phone.trim())
        .text("ownerEmail", draft.owner_email.trim())
        .text("altOwnerName", draft.alt_owner_name.trim())
        .text("altOwnerPhone", draft.alt_owner_phone.trim())
        .text("address", draft.address.trim());

    if matches!(mode, FormMode::Edit(_)) {
        upload.repeated("photoUrls", draft.photos.remote());
    }
    for attachment in draft.photos.local() {
        upload.file("photos", attachment, PHOTO_PREFIX);
    }

    PetSubmission {
        mode: mode.clone(),
        pet_id,
        upload,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Moved { step: u8 },
    Submitted { pet_id: PetId },
}

#[derive(Debug)]
pub struct PetFormController {
    mode: FormMode,
    draft: PetDraft,
    step: u8,
    scroll_offset: f32,
    phase: FormPhase,
}

impl PetFormController {
    pub fn register() -> Self {
        Self::with_draft(FormMode::Register, PetDraft::default())
    }

    pub fn edit(pet_id: PetId, record: &PetRecord) -> Self {
        Self::with_draft(FormMode::Edit(pet_id), PetDraft::from_record(record))
    }

    pub fn with_draft(mode: FormMode, draft: PetDraft) -> Self {
        Self {
            mode,
            draft,
            step: 1,
            scroll_offset: 0.0,
            phase: FormPhase::Editing,
        }
    }

    pub async fn load_for_edit<R>(registry: &R, pet_id: PetId) -> Result<Self, ClientError>
    where
        R: PetRegistry + ?Sized,
    {
        let record = registry.fetch_pet(&pet_id).await?;
        debug!(pet_id = %pet_id, "hydrated pet draft for editing");
        Ok(Self::edit(pet_id, &record))
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &PetDraft {
        &self.draft
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn total_steps(&self) -> u8 {
        PET_FORM_STEPS
    }

    pub fn is_last_step(&self) -> bool {
        self.step == PET_FORM_STEPS
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.scroll_offset = offset.max(0.0);
    }

    /// Fields the current step renders. `illnessDetails` only shows while
    /// `hasIllness` is on.
    pub fn visible_fields(&self) -> Vec<PetField> {
        PetField::ALL
            .iter()
            .copied()
            .filter(|field| field.step() == self.step)
            .filter(|field| *field != PetField::IllnessDetails || self.draft.has_illness)
            .collect()
    }

    pub fn validate_step(&self) -> Result<(), FormError> {
        missing_to_error(self.draft.missing_fields(self.step))
    }

    fn validate_all(&self) -> Result<(), FormError> {
        let missing = (1..=PET_FORM_STEPS)
            .flat_map(|step| self.draft.missing_fields(step))
            .collect();
        missing_to_error(missing)
    }

    pub async fn advance<R>(&mut self, registry: &R) -> Result<StepOutcome, FormError>
    where
        R: PetRegistry + ?Sized,
    {
        self.phase.ensure_editable()?;
        if let Err(err) = self.validate_step() {
            debug!(step = self.step, error = %err, "step validation failed");
            return Err(err);
        }
        if self.step < PET_FORM_STEPS {
            self.step += 1;
            self.scroll_offset = 0.0;
            return Ok(StepOutcome::Moved { step: self.step });
        }
        self.submit(registry).await
    }

    pub fn retreat(&mut self) -> bool {
        if self.step > 1 && self.phase == FormPhase::Editing {
            self.step -= 1;
            self.scroll_offset = 0.0;
            true
        } else {
            false
        }
    }

    pub fn update_field(&mut self, field: PetField, value: FieldValue) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        let draft = &mut self.draft;
        let name = field.wire_name();
        match (field, value) {
            (PetField::Photos, FieldValue::Photo(attachment)) => draft.photos.add(attachment)?,
            (PetField::Temperament, FieldValue::Text(label)) => {
                if !is_known_temperament(&label) {
                    return Err(FormError::InvalidValue { field: name, value: label });
                }
                draft.toggle_temperament(&label);
            }
            (PetField::Species, FieldValue::Text(raw)) => {
                draft.species = Some(
                    Species::parse(&raw).ok_or(FormError::InvalidValue { field: name, value: raw })?,
                );
            }
            (PetField::Sex, FieldValue::Text(raw)) => {
                draft.sex =
                    Some(Sex::parse(&raw).ok_or(FormError::InvalidValue { field: name, value: raw })?);
            }
            (PetField::Size, FieldValue::Text(raw)) => {
                draft.size = Some(
                    PetSize::parse(&raw).ok_or(FormError::InvalidValue { field: name, value: raw })?,
                );
            }
            (PetField::Age, FieldValue::Text(raw)) => {
                draft.age = raw.chars().filter(char::is_ascii_digit).collect();
            }
            (PetField::HasSpots, FieldValue::Flag(v)) => draft.has_spots = v,
            (PetField::IsVaccinated, FieldValue::Flag(v)) => draft.is_vaccinated = v,
            (PetField::HasIllness, FieldValue::Flag(v)) => draft.has_illness = v,
            (field, FieldValue::Text(text)) => match text_slot(draft, field) {
                Some(slot) => *slot = text,
                None => return Err(FormError::TypeMismatch { field: name }),
            },
            _ => return Err(FormError::TypeMismatch { field: name }),
        }
        Ok(())
    }

    pub fn toggle_temperament(&mut self, label: &str) -> Result<bool, FormError> {
        self.phase.ensure_editable()?;
        if !is_known_temperament(label) {
            return Err(FormError::InvalidValue {
                field: PetField::Temperament.wire_name(),
                value: label.to_string(),
            });
        }
        Ok(self.draft.toggle_temperament(label))
    }

    pub fn add_photo(&mut self, attachment: Attachment) -> Result<(), FormError> {
        self.update_field(PetField::Photos, FieldValue::Photo(attachment))
    }

    pub fn remove_photo(&mut self, index: usize) -> Result<(), FormError> {
        self.phase.ensure_editable()?;
        self.draft.photos.remove(index).map(|_| ())
    }

    pub fn begin_submission(&mut self) -> Result<PetSubmission, FormError> {
        self.phase.ensure_editable()?;
        self.validate_all()?;
        self.phase.begin()?;
        Ok(serialize_draft(&self.draft, &self.mode))
    }

    /// Settles an in-flight submission. Success clears the draft; failure
    /// leaves it untouched on the last step. Errors when nothing is in flight.
    pub fn complete_submission(
        &mut self,
        result: Result<PetId, ClientError>,
    ) -> Result<StepOutcome, FormError> {
        match result {
            Ok(pet_id) => {
                self.phase.settle(true)?;
                self.draft = PetDraft::default();
                info!(pet_id = %pet_id, "pet form submitted");
                Ok(StepOutcome::Submitted { pet_id })
            }
            Err(err) => {
                self.phase.settle(false)?;
                self.step = PET_FORM_STEPS;
                warn!(error = %err, "pet form submission failed; draft kept for retry");
                Err(FormError::Submit(err))
            }
        }
    }

    pub async fn submit<R>(&mut self, registry: &R) -> Result<StepOutcome, FormError>
    where
        R: PetRegistry + ?Sized,
    {
        let submission = self.begin_submission()?;
        let result = registry.submit_pet(submission).await;
        self.complete_submission(result)
    }
}

fn text_slot(draft: &mut PetDraft, field: PetField) -> Option<&mut String> {
    Some(match field {
        PetField::Name => &mut draft.name,
        PetField::Breed => &mut draft.breed,
        PetField::PredominantColor => &mut draft.predominant_color,
        PetField::SecondaryColor => &mut draft.secondary_color,
        PetField::IllnessDetails => &mut draft.illness_details,
        PetField::SpecialFeatures => &mut draft.special_features,
        PetField::OwnerName => &mut draft.owner_name,
        PetField::OwnerPhone => &mut draft.owner_phone,
        PetField::OwnerEmail => &mut draft.owner_email,
        PetField::AltOwnerName => &mut draft.alt_owner_name,
        PetField::AltOwnerPhone => &mut draft.alt_owner_phone,
        PetField::Address => &mut draft.address,
        _ => return None,
    })
}

fn missing_to_error(missing: Vec<PetField>) -> Result<(), FormError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FormError::MissingFields(
            missing.into_iter().map(PetField::wire_name).collect(),
        ))
    }
}

#[cfg(test)]
#[path = "../tests/pet_form_tests.rs"]
mod tests;
