//! Pagination, per-resource filters, and the raw query-string parameters the
//! router deserializes before the service resolves identifiers.

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer};

use super::domain::{
    DocumentId, Furnishing, GeoPoint, InquiryStatus, TransactionStatus, TransactionType, UserType,
    ValidationError,
};

/// Result window applied after filtering and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(skip: Option<u64>, limit: Option<u64>) -> Result<Self, ValidationError> {
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::new(
                "limit",
                format!("must be between 1 and {}", Self::MAX_LIMIT),
            ));
        }
        Ok(Self {
            skip: skip.unwrap_or(0),
            limit,
        })
    }

    /// Window used by the "all for a parent" listings (owner, property, user).
    pub fn first_hundred() -> Self {
        Self {
            skip: 0,
            limit: Self::MAX_LIMIT,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub owner_id: Option<DocumentId>,
    pub transaction_type: Option<TransactionType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub furnishing: Option<Furnishing>,
}

/// Radius clause of a search, distance in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    pub center: GeoPoint,
    pub max_distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySearch {
    pub text: Option<String>,
    pub geo: Option<GeoRadius>,
    pub filter: PropertyFilter,
}

impl PropertySearch {
    /// Results come back nearest first only for a pure radius query.
    pub fn orders_by_distance(&self) -> bool {
        self.geo.is_some() && self.text.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub user_type: Option<UserType>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub property_id: Option<DocumentId>,
    pub user_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryFilter {
    pub property_id: Option<DocumentId>,
    pub user_id: Option<DocumentId>,
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteFilter {
    pub user_id: Option<DocumentId>,
    pub property_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub property_id: Option<DocumentId>,
    pub buyer_id: Option<DocumentId>,
    pub seller_id: Option<DocumentId>,
    pub status: Option<TransactionStatus>,
}

/// Treat `?city=` the same as an absent parameter.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Enum filters accept any letter case and ignore blank values.
fn lenient_choice<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    non_blank(Option::<String>::deserialize(deserializer)?)
        .map(|value| {
            let lowered = value.to_lowercase();
            T::deserialize(lowered.as_str().into_deserializer())
        })
        .transpose()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient_choice")]
    pub transaction_type: Option<TransactionType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub city: Option<String>,
    pub locality: Option<String>,
    #[serde(default, deserialize_with = "lenient_choice")]
    pub furnishing: Option<Furnishing>,
}

impl PropertyListParams {
    pub fn resolve(self) -> Result<(PropertyFilter, Page), ValidationError> {
        let page = Page::new(self.skip, self.limit)?;
        let filter = PropertyFilter {
            owner_id: None,
            transaction_type: self.transaction_type,
            min_price: self.min_price,
            max_price: self.max_price,
            min_bedrooms: self.min_bedrooms,
            min_bathrooms: self.min_bathrooms,
            city: non_blank(self.city),
            locality: non_blank(self.locality),
            furnishing: self.furnishing,
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertySearchParams {
    pub text: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub max_distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_choice")]
    pub transaction_type: Option<TransactionType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl PropertySearchParams {
    pub const DEFAULT_MAX_DISTANCE: f64 = 5000.0;

    pub fn resolve(self) -> Result<(PropertySearch, Page), ValidationError> {
        let page = Page::new(self.skip, self.limit)?;

        let geo = match (self.longitude, self.latitude) {
            (Some(longitude), Some(latitude)) => {
                let center = GeoPoint::new(longitude, latitude);
                center.validate("longitude/latitude")?;
                let max_distance = self.max_distance.unwrap_or(Self::DEFAULT_MAX_DISTANCE);
                if !max_distance.is_finite() || max_distance < 1.0 {
                    return Err(ValidationError::new("max_distance", "must be >= 1 metre"));
                }
                Some(GeoRadius {
                    center,
                    max_distance,
                })
            }
            (None, None) => None,
            _ => {
                return Err(ValidationError::new(
                    "longitude/latitude",
                    "longitude and latitude must be supplied together",
                ))
            }
        };

        let search = PropertySearch {
            text: non_blank(self.text),
            geo,
            filter: PropertyFilter {
                transaction_type: self.transaction_type,
                min_price: self.min_price,
                max_price: self.max_price,
                min_bedrooms: self.min_bedrooms,
                min_bathrooms: self.min_bathrooms,
                ..PropertyFilter::default()
            },
        };
        Ok((search, page))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient_choice")]
    pub user_type: Option<UserType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub property_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub property_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_choice")]
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub property_id: Option<String>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_choice")]
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacetParams {
    #[serde(default, deserialize_with = "lenient_choice")]
    pub transaction_type: Option<TransactionType>,
}
