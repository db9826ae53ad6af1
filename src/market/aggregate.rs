// =============================================================================
// Aggregator — chart-ready projections of normalized markets
// =============================================================================
//
// Pure, total functions. Missing inputs are zero-filled (breakdowns, series) or
// padded with empty points (history); none of them fail or mutate the market.
// =============================================================================

use std::collections::HashMap;

use serde::Serialize;

use crate::market::model::{HistoricalPoint, MetricKey, NormalizedMarket};

/// Housing types shown on the property-type chart when none are requested.
pub const DEFAULT_HOUSING_TYPES: [&str; 4] = ["Apartment", "Condo", "Single Family", "Townhouse"];

/// Bedroom counts shown on the bedroom chart when none are requested.
pub const DEFAULT_BEDROOM_COUNTS: [u32; 3] = [1, 2, 3];

/// Months shown on the history chart when none are requested.
pub const DEFAULT_HISTORY_MONTHS: [&str; 3] = ["2025-01", "2025-02", "2025-03"];

/// One slice of the housing-type breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HousingTypeSlice {
    #[serde(rename = "type")]
    pub housing_type: String,
    pub average_rent: f64,
    pub median_rent: f64,
    pub total_listings: u64,
}

/// One bar of the bedroom-count breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BedroomSlice {
    pub bedrooms: u32,
    pub average_rent: f64,
    pub median_rent: f64,
    pub total_listings: u64,
}

/// One bar of a cross-ZIP comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub zip: String,
    pub value: f64,
}

/// Breakdown by property type, one entry per requested type in request order.
/// Matching is case-insensitive; the first upstream row wins.
pub fn housing_type_breakdown<S: AsRef<str>>(
    market: &NormalizedMarket,
    types: &[S],
) -> Vec<HousingTypeSlice> {
    let rows = market.data_by_property_type.as_deref().unwrap_or_default();

    types
        .iter()
        .map(|t| {
            let wanted = t.as_ref().to_lowercase();
            let found = rows
                .iter()
                .find(|row| row.property_type.to_lowercase() == wanted)
                .map(|row| &row.stats);

            HousingTypeSlice {
                housing_type: t.as_ref().to_string(),
                average_rent: found.and_then(|s| s.average_rent).unwrap_or(0.0),
                median_rent: found.and_then(|s| s.median_rent).unwrap_or(0.0),
                total_listings: found.and_then(|s| s.total_listings).unwrap_or(0),
            }
        })
        .collect()
}

/// Breakdown by bedroom count, one entry per requested count in request order.
pub fn bedroom_breakdown(market: &NormalizedMarket, counts: &[u32]) -> Vec<BedroomSlice> {
    let rows = market.data_by_bedrooms.as_deref().unwrap_or_default();

    counts
        .iter()
        .map(|&bedrooms| {
            let found = rows
                .iter()
                .find(|row| row.bedrooms == Some(bedrooms))
                .map(|row| &row.stats);

            BedroomSlice {
                bedrooms,
                average_rent: found.and_then(|s| s.average_rent).unwrap_or(0.0),
                median_rent: found.and_then(|s| s.median_rent).unwrap_or(0.0),
                total_listings: found.and_then(|s| s.total_listings).unwrap_or(0),
            }
        })
        .collect()
}

/// Exactly one point per requested month, in request order. Months with no
/// upstream entry come back as [`HistoricalPoint::empty`].
///
/// The unfiltered series is `market.historical`.
pub fn historical_months<S: AsRef<str>>(
    market: &NormalizedMarket,
    months: &[S],
) -> Vec<HistoricalPoint> {
    let by_month: HashMap<&str, &HistoricalPoint> = market
        .historical
        .iter()
        .map(|p| (p.month.as_str(), p))
        .collect();

    months
        .iter()
        .map(|m| {
            by_month
                .get(m.as_ref())
                .map(|p| (*p).clone())
                .unwrap_or_else(|| HistoricalPoint::empty(m.as_ref()))
        })
        .collect()
}

/// One value per market for the given metric; unset metrics read as zero.
pub fn series_for_metric(markets: &[NormalizedMarket], key: MetricKey) -> Vec<SeriesPoint> {
    markets
        .iter()
        .map(|m| SeriesPoint {
            zip: m.zip.clone(),
            value: m.metrics.value(key).unwrap_or(0.0),
        })
        .collect()
}
