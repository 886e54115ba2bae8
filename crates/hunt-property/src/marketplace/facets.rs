//! Filter-screen options: distinct values and slider ranges drawn from the
//! listed properties, normalized so the UI always receives usable ranges.

use serde::Serialize;

/// Locality option, kept alongside its city for grouped dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LocalityOption {
    pub value: String,
    pub city: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const DEFAULT_PRICE: ValueRange = ValueRange {
        min: 0.0,
        max: 100.0,
    };
    pub const DEFAULT_AREA: ValueRange = ValueRange {
        min: 0.0,
        max: 5000.0,
    };

    fn or_default(range: Option<ValueRange>, default: ValueRange) -> ValueRange {
        match range {
            Some(range) if range.max >= range.min && !(range.min == 0.0 && range.max == 0.0) => {
                range
            }
            _ => default,
        }
    }

    /// Widen to cover `value`.
    pub fn include(range: Option<ValueRange>, value: f64) -> Option<ValueRange> {
        Some(match range {
            Some(range) => ValueRange {
                min: range.min.min(value),
                max: range.max.max(value),
            },
            None => ValueRange {
                min: value,
                max: value,
            },
        })
    }
}

/// Raw aggregation produced by a store. Values may be unsorted, repeated or blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFacets {
    pub transaction_types: Vec<String>,
    pub property_categories: Vec<String>,
    pub property_subtypes: Vec<String>,
    pub furnishing_options: Vec<String>,
    pub facing_options: Vec<String>,
    pub cities: Vec<String>,
    pub localities: Vec<LocalityOption>,
    pub bedrooms: Vec<u32>,
    pub bathrooms: Vec<u32>,
    pub price: Option<ValueRange>,
    /// Only areas greater than zero contribute.
    pub area: Option<ValueRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterScreenOptions {
    pub transaction_types: Vec<String>,
    pub property_categories: Vec<String>,
    pub property_subtypes: Vec<String>,
    pub furnishing_options: Vec<String>,
    pub facing_options: Vec<String>,
    pub cities: Vec<String>,
    pub localities: Vec<LocalityOption>,
    pub price_range: ValueRange,
    pub area_range: ValueRange,
    pub bedrooms: Vec<u32>,
    pub bathrooms: Vec<u32>,
    pub store_room_options: [bool; 2],
    pub servant_room_options: [bool; 2],
}

fn distinct(values: Vec<String>) -> Vec<String> {
    let mut values: Vec<String> = values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

fn distinct_counts(mut values: Vec<u32>) -> Vec<u32> {
    values.sort_unstable();
    values.dedup();
    values
}

impl From<PropertyFacets> for FilterScreenOptions {
    fn from(facets: PropertyFacets) -> Self {
        let mut localities: Vec<LocalityOption> = facets
            .localities
            .into_iter()
            .filter(|option| !option.value.trim().is_empty())
            .collect();
        localities.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| a.value.cmp(&b.value)));
        localities.dedup();

        Self {
            transaction_types: distinct(facets.transaction_types),
            property_categories: distinct(facets.property_categories),
            property_subtypes: distinct(facets.property_subtypes),
            furnishing_options: distinct(facets.furnishing_options),
            facing_options: distinct(facets.facing_options),
            cities: distinct(facets.cities),
            localities,
            price_range: ValueRange::or_default(facets.price, ValueRange::DEFAULT_PRICE),
            area_range: ValueRange::or_default(facets.area, ValueRange::DEFAULT_AREA),
            bedrooms: distinct_counts(facets.bedrooms),
            bathrooms: distinct_counts(facets.bathrooms),
            store_room_options: [true, false],
            servant_room_options: [true, false],
        }
    }
}
