//! Enumerated column types and input helpers shared by the entity modules
//!
//! Each enum is stored in SQLite and sent over the wire as the same text
//! label, so one table drives serde, parsing and the SQL conversions.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::types::HortaError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HortaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(HortaError::BadRequest(format!(
                        "Invalid {}: {}",
                        $label, other
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: HortaError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum! {
    /// Product category (`produto.tipo`)
    ProductKind, "product type" {
        LeafyGreen => "Verdura",
        Vegetable => "Legume",
        Fruit => "Fruta",
        GardenGreen => "Hortaliça",
    }
}

text_enum! {
    /// Plot occupancy (`parcela.status`)
    PlotStatus, "plot status" {
        Free => "Livre",
        Cultivating => "Cultivando",
        Resting => "Em Repouso",
    }
}

impl Default for PlotStatus {
    fn default() -> Self {
        PlotStatus::Free
    }
}

text_enum! {
    /// Role of a user in an event (`participacao_evento.papel`)
    ParticipationRole, "participation role" {
        Participant => "Participante",
        Organizer => "Organizador",
        Speaker => "Palestrante",
    }
}

text_enum! {
    /// Lifecycle of a planting (`cultivos.status_cultivo`)
    CultivationStatus, "cultivation status" {
        Planted => "Plantado",
        Growing => "Crescendo",
        ReadyToHarvest => "ProntoParaColheita",
        /// Set by harvest propagation; nothing moves a planting out of it
        Harvested => "Colhido",
    }
}

/// Deserialize a field that distinguishes "absent" from explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserialize an explicit `null` as the type's default
///
/// Use with `#[serde(default, deserialize_with = "default_on_null")]` so both
/// an absent field and `null` fall back to `T::default()`.
pub fn default_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
