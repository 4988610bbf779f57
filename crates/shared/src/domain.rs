use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(PetId);
id_newtype!(ReportId);
id_newtype!(SightingId);
id_newtype!(NotificationId);

impl PetId {
    /// Client-generated id sent along with a new registration.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Perro,
    Gato,
    Otro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Macho,
    Hembra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PetSize {
    #[serde(rename = "pequeño")]
    Pequeno,
    #[serde(rename = "mediano")]
    Mediano,
    #[serde(rename = "grande")]
    Grande,
}

macro_rules! wire_labels {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn parse(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.as_str().eq_ignore_ascii_case(raw))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_labels!(Species { Perro => "perro", Gato => "gato", Otro => "otro" });
wire_labels!(Sex { Macho => "macho", Hembra => "hembra" });
wire_labels!(PetSize { Pequeno => "pequeño", Mediano => "mediano", Grande => "grande" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PetStatus {
    #[default]
    Safe,
    Lost,
    Found,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Active,
    Found,
    Closed,
    #[serde(other)]
    Unknown,
}

/// Selectable temperament labels, in display order.
pub const TEMPERAMENTS: &[&str] = &[
    "Juguetón",
    "Tímido",
    "Energético",
    "Tranquilo",
    "Social",
    "Protector",
    "Cariñoso",
    "Travieso",
    "Inteligente",
    "Bravo",
    "No muerde",
    "Muerde",
    "Curioso",
    "Independiente",
    "Obediente",
    "Perezoso",
    "Sensible",
];

pub fn is_known_temperament(label: &str) -> bool {
    TEMPERAMENTS.contains(&label)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A coordinate plus the human-readable address resolved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
}

impl GeoPoint {
    pub fn new(coords: Coordinates, address: impl Into<String>) -> Self {
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
            address: address.into(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
