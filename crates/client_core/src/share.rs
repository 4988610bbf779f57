use shared::protocol::LostReport;

const UNKNOWN_NAME: &str = "esta mascota";
const UNKNOWN_ADDRESS: &str = "ubicación desconocida";

/// Text handed to the platform share sheet for a lost report.
pub fn share_message(report: &LostReport) -> String {
    let name = report
        .pet_name()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_NAME);
    let address = report
        .last_seen_location
        .as_ref()
        .map(|location| location.address.trim())
        .filter(|address| !address.is_empty())
        .unwrap_or(UNKNOWN_ADDRESS);
    format!(
        "¡Ayuda a encontrar a {name}! Última vez visto en: {address}. Más info en la app Lomito Buscador."
    )
}

/// `tel:` link for the owner's phone, digits and a leading `+` only.
pub fn contact_link(report: &LostReport) -> Option<String> {
    let phone = report.owner_phone()?;
    let mut digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    if phone.trim_start().starts_with('+') {
        digits.insert(0, '+');
    }
    Some(format!("tel:{digits}"))
}
