// =============================================================================
// Raw upstream shapes — RentCast `/markets` response
// =============================================================================
//
// Every field is optional. These types never leave the normalizer; the rest of
// the crate only sees `NormalizedMarket`.
// =============================================================================

use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::market::{BedroomStats, PropertyTypeStats, RentalStats};

/// One market entry as returned by `GET /markets?zipCode=...`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarketResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub rental_data: Option<RawRentalData>,
}

/// Nested rental statistics block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRentalData {
    #[serde(default)]
    pub last_updated_date: Option<String>,

    #[serde(flatten)]
    pub stats: RentalStats,

    #[serde(default)]
    pub data_by_property_type: Option<Vec<PropertyTypeStats>>,

    #[serde(default)]
    pub data_by_bedrooms: Option<Vec<BedroomStats>>,

    /// Month key → statistics, in the order the keys appear in the payload.
    #[serde(default, deserialize_with = "deserialize_history")]
    pub history: Option<Vec<(String, RentalStats)>>,
}

/// Read the history object as an ordered list of entries. A `null` entry is
/// kept as an all-`None` month.
fn deserialize_history<'de, D>(deserializer: D) -> Result<Option<Vec<(String, RentalStats)>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct HistoryVisitor;

    impl<'de> Visitor<'de> for HistoryVisitor {
        type Value = Option<Vec<(String, RentalStats)>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of month to rental statistics")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(self)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((month, stats)) = map.next_entry::<String, Option<RentalStats>>()? {
                entries.push((month, stats.unwrap_or_default()));
            }
            Ok(Some(entries))
        }
    }

    deserializer.deserialize_option(HistoryVisitor)
}
