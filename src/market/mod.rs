pub mod aggregate;
pub mod model;
pub mod normalize;
pub mod source;

pub use aggregate::{
    bedroom_breakdown, historical_months, housing_type_breakdown, series_for_metric,
    DEFAULT_BEDROOM_COUNTS, DEFAULT_HISTORY_MONTHS, DEFAULT_HOUSING_TYPES,
};
pub use model::{BedroomStats, MetricKey, NormalizedMarket, PropertyTypeStats, RentalStats};
pub use normalize::normalize;
pub use source::MarketSource;
