// =============================================================================
// Normalized market model — the canonical in-app shape
// =============================================================================
//
// Everything past the normalizer works with these types. They serialise to
// camelCase JSON for the dashboard and for cache entries.
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Rental statistics shared by breakdown rows and history entries
// =============================================================================

/// Optional rent statistics as reported upstream. Nothing is defaulted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalStats {
    #[serde(default)]
    pub average_rent: Option<f64>,
    #[serde(default)]
    pub median_rent: Option<f64>,
    #[serde(default)]
    pub min_rent: Option<f64>,
    #[serde(default)]
    pub max_rent: Option<f64>,
    #[serde(default)]
    pub average_square_footage: Option<f64>,
    #[serde(default)]
    pub median_square_footage: Option<f64>,
    #[serde(default)]
    pub average_days_on_market: Option<f64>,
    #[serde(default)]
    pub median_days_on_market: Option<f64>,
    #[serde(default)]
    pub total_listings: Option<u64>,
}

/// One row of the upstream per-property-type breakdown. A missing or
/// non-string type reads as `""`, which matches no requested type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTypeStats {
    #[serde(default, deserialize_with = "lenient_label")]
    pub property_type: String,
    #[serde(flatten)]
    pub stats: RentalStats,
}

/// One row of the upstream per-bedroom-count breakdown. `bedrooms` is `None`
/// when the count is missing or not a whole number; such rows never match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedroomStats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub bedrooms: Option<u32>,
    #[serde(flatten)]
    pub stats: RentalStats,
}

fn lenient_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Accepts `2`, `2.0` and `"2"`. Anything else reads as `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(n))
        .map(|n| n as u32))
}

// =============================================================================
// Metrics
// =============================================================================

/// Flat scalar summary of a market. Always present; rents and listing counts
/// default to zero, descriptive aggregates to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub average_rent: f64,
    pub median_rent: f64,
    pub min_rent: f64,
    pub max_rent: f64,
    pub average_sqft: Option<f64>,
    pub median_sqft: Option<f64>,
    pub average_days_on_market: Option<f64>,
    pub median_days_on_market: Option<f64>,
    pub total_listings: u64,
}

impl Metrics {
    /// Read a single metric by key. `None` when the field is unset.
    pub fn value(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::AverageRent => Some(self.average_rent),
            MetricKey::MedianRent => Some(self.median_rent),
            MetricKey::MinRent => Some(self.min_rent),
            MetricKey::MaxRent => Some(self.max_rent),
            MetricKey::AverageSqft => self.average_sqft,
            MetricKey::MedianSqft => self.median_sqft,
            MetricKey::AverageDaysOnMarket => self.average_days_on_market,
            MetricKey::MedianDaysOnMarket => self.median_days_on_market,
            MetricKey::TotalListings => Some(self.total_listings as f64),
        }
    }
}

/// Names a field of [`Metrics`] for series building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    #[default]
    AverageRent,
    MedianRent,
    MinRent,
    MaxRent,
    AverageSqft,
    MedianSqft,
    AverageDaysOnMarket,
    MedianDaysOnMarket,
    TotalListings,
}

impl MetricKey {
    pub const ALL: [MetricKey; 9] = [
        Self::AverageRent,
        Self::MedianRent,
        Self::MinRent,
        Self::MaxRent,
        Self::AverageSqft,
        Self::MedianSqft,
        Self::AverageDaysOnMarket,
        Self::MedianDaysOnMarket,
        Self::TotalListings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AverageRent => "averageRent",
            Self::MedianRent => "medianRent",
            Self::MinRent => "minRent",
            Self::MaxRent => "maxRent",
            Self::AverageSqft => "averageSqft",
            Self::MedianSqft => "medianSqft",
            Self::AverageDaysOnMarket => "averageDaysOnMarket",
            Self::MedianDaysOnMarket => "medianDaysOnMarket",
            Self::TotalListings => "totalListings",
        }
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

// =============================================================================
// History
// =============================================================================

/// Statistics for one month. `None` means "no data this month", which is
/// different from a recorded zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPoint {
    pub month: String,
    #[serde(default)]
    pub average_rent: Option<f64>,
    #[serde(default)]
    pub median_rent: Option<f64>,
    #[serde(default)]
    pub average_days_on_market: Option<f64>,
    #[serde(default)]
    pub median_days_on_market: Option<f64>,
    #[serde(default)]
    pub total_listings: Option<u64>,
}

impl HistoricalPoint {
    /// A point carrying only its month label.
    pub fn empty(month: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            average_rent: None,
            median_rent: None,
            average_days_on_market: None,
            median_days_on_market: None,
            total_listings: None,
        }
    }
}

// =============================================================================
// NormalizedMarket
// =============================================================================

/// A market record keyed by ZIP code, ready for aggregation and charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMarket {
    pub zip: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    pub metrics: Metrics,

    /// `None` when upstream sent no breakdown, as opposed to an empty one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_by_property_type: Option<Vec<PropertyTypeStats>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_by_bedrooms: Option<Vec<BedroomStats>>,

    #[serde(default)]
    pub historical: Vec<HistoricalPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_key_parses_camel_case_names() {
        for key in MetricKey::ALL {
            assert_eq!(key.as_str().parse::<MetricKey>().unwrap(), key);
        }
        assert!("average_rent".parse::<MetricKey>().is_err());
        assert_eq!(MetricKey::default(), MetricKey::AverageRent);
    }

    #[test]
    fn metrics_value_reads_optional_fields() {
        let metrics = Metrics {
            average_rent: 1500.0,
            total_listings: 7,
            median_sqft: Some(900.0),
            ..Metrics::default()
        };
        assert_eq!(metrics.value(MetricKey::AverageRent), Some(1500.0));
        assert_eq!(metrics.value(MetricKey::TotalListings), Some(7.0));
        assert_eq!(metrics.value(MetricKey::MedianSqft), Some(900.0));
        assert_eq!(metrics.value(MetricKey::AverageDaysOnMarket), None);
    }

    #[test]
    fn metrics_serialise_missing_descriptive_fields_as_null() {
        let json = serde_json::to_value(Metrics::default()).unwrap();
        assert_eq!(json["averageRent"], 0.0);
        assert!(json["averageSqft"].is_null());
        assert!(json.as_object().unwrap().contains_key("medianDaysOnMarket"));
    }

    #[test]
    fn breakdown_rows_flatten_stats() {
        let row: PropertyTypeStats = serde_json::from_str(
            r#"{ "propertyType": "Condo", "averageRent": 1800, "totalListings": 4 }"#,
        )
        .unwrap();
        assert_eq!(row.property_type, "Condo");
        assert_eq!(row.stats.average_rent, Some(1800.0));
        assert_eq!(row.stats.total_listings, Some(4));
        assert_eq!(row.stats.min_rent, None);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["propertyType"], "Condo");
        assert_eq!(json["totalListings"], 4);
    }

    #[test]
    fn absent_breakdowns_are_omitted_not_emptied() {
        let market = NormalizedMarket {
            zip: "32789".into(),
            market: None,
            last_updated: None,
            metrics: Metrics::default(),
            data_by_property_type: None,
            data_by_bedrooms: Some(Vec::new()),
            historical: Vec::new(),
        };
        let json = serde_json::to_value(&market).unwrap();
        assert!(json.get("dataByPropertyType").is_none());
        assert_eq!(json["dataByBedrooms"], serde_json::json!([]));

        let back: NormalizedMarket = serde_json::from_value(json).unwrap();
        assert_eq!(back, market);
    }
}
