use anyhow::Result;
use serde::Serialize;
use shared::protocol::{LostReport, PetRecord, PublicSighting};

pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn pet_line(pet: &PetRecord) -> String {
    let id = pet.pet_id.as_ref().map(|id| id.as_str()).unwrap_or("-");
    let species = pet.specific_info.species.as_deref().unwrap_or("?");
    format!(
        "{id}\t{}\t{species}\t{:?}",
        pet.basic_info.name, pet.status
    )
}

pub fn report_line(report: &LostReport) -> String {
    let distance = report
        .distance_in_km
        .map(|km| format!("{km:.1} km"))
        .unwrap_or_else(|| "-".into());
    let address = report
        .last_seen_location
        .as_ref()
        .map(|location| location.address.as_str())
        .unwrap_or("");
    format!(
        "{}\t{}\t{distance}\t{address}",
        report.report_id,
        report.pet_name().unwrap_or("(sin nombre)")
    )
}

pub fn sighting_line(sighting: &PublicSighting) -> String {
    let reporter = sighting
        .reported_by
        .as_ref()
        .map(|reporter| reporter.display_name())
        .unwrap_or("anónimo");
    let when = sighting
        .timestamp
        .as_ref()
        .and_then(|ts| ts.to_utc())
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!(
        "{}\t{when}\t{reporter}\t{}\t{}",
        sighting.sighting_id, sighting.location.address, sighting.description
    )
}
