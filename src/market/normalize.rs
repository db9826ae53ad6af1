// =============================================================================
// Normalizer — RentCast raw response → NormalizedMarket
// =============================================================================
//
// The only place raw optional fields are read. Rents and listing counts default
// to zero, descriptive aggregates (square footage, days on market) to `None`.
// History is de-nested into one point per month key, in payload order.
// =============================================================================

use crate::market::model::{HistoricalPoint, Metrics, NormalizedMarket, RentalStats};
use crate::rentcast::raw::RawMarketResponse;

/// Convert one upstream entry into the canonical record.
///
/// `fallback_zip` is the ZIP the caller asked for; it is used when upstream
/// sends neither an `id` nor a `zipCode`.
pub fn normalize(raw: &RawMarketResponse, fallback_zip: &str) -> NormalizedMarket {
    let id = non_blank(raw.id.as_deref());
    let zip_code = non_blank(raw.zip_code.as_deref());

    let zip = id.or(zip_code).unwrap_or(fallback_zip).to_string();

    let rental = raw.rental_data.as_ref();

    NormalizedMarket {
        zip,
        market: zip_code.map(str::to_string),
        last_updated: rental.and_then(|r| r.last_updated_date.clone()),
        metrics: to_metrics(rental.map(|r| &r.stats)),
        data_by_property_type: rental.and_then(|r| r.data_by_property_type.clone()),
        data_by_bedrooms: rental.and_then(|r| r.data_by_bedrooms.clone()),
        historical: rental
            .and_then(|r| r.history.as_deref())
            .map(history_to_points)
            .unwrap_or_default(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn to_metrics(stats: Option<&RentalStats>) -> Metrics {
    let Some(s) = stats else {
        return Metrics::default();
    };

    Metrics {
        average_rent: s.average_rent.unwrap_or(0.0),
        median_rent: s.median_rent.unwrap_or(0.0),
        min_rent: s.min_rent.unwrap_or(0.0),
        max_rent: s.max_rent.unwrap_or(0.0),
        average_sqft: s.average_square_footage,
        median_sqft: s.median_square_footage,
        average_days_on_market: s.average_days_on_market,
        median_days_on_market: s.median_days_on_market,
        total_listings: s.total_listings.unwrap_or(0),
    }
}

/// A month repeated upstream keeps its first position and its last value.
fn history_to_points(history: &[(String, RentalStats)]) -> Vec<HistoricalPoint> {
    let mut points: Vec<HistoricalPoint> = Vec::with_capacity(history.len());

    for (month, entry) in history {
        let point = HistoricalPoint {
            month: month.clone(),
            average_rent: entry.average_rent,
            median_rent: entry.median_rent,
            average_days_on_market: entry.average_days_on_market,
            median_days_on_market: entry.median_days_on_market,
            total_listings: entry.total_listings,
        };

        match points.iter_mut().find(|p| p.month == *month) {
            Some(existing) => *existing = point,
            None => points.push(point),
        }
    }

    points
}
