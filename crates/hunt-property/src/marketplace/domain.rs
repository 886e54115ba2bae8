use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Mean earth radius used for spherical distance, matching the document store's
/// `$centerSphere` convention.
pub const EARTH_RADIUS_METRES: f64 = 6_378_100.0;

/// Identifier wrapper for stored records. Always 24 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(ObjectId::new().to_hex())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ObjectId::parse_str(raw)
            .ok()
            .map(|oid| Self(oid.to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current time truncated to the millisecond precision records are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 timestamps with fixed millisecond precision so the stored text sorts
/// chronologically in both JSON and BSON.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|value| value.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_some(&super::format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let opt = Option::<String>::deserialize(deserializer)?;
            opt.map(|raw| {
                DateTime::parse_from_rfc3339(raw.trim())
                    .map(|value| value.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

/// Input that parsed but breaks a field constraint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(field, "must be a finite number >= 0"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Rent,
    Sale,
}

impl TransactionType {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Rent => "rent",
            TransactionType::Sale => "sale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Furnishing {
    Furnished,
    SemiFurnished,
    Unfurnished,
}

impl Furnishing {
    pub fn label(&self) -> &'static str {
        match self {
            Furnishing::Furnished => "furnished",
            Furnishing::SemiFurnished => "semi-furnished",
            Furnishing::Unfurnished => "unfurnished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Owner,
    Buyer,
    Agent,
}

impl UserType {
    pub fn label(&self) -> &'static str {
        match self {
            UserType::Owner => "owner",
            UserType::Buyer => "buyer",
            UserType::Agent => "agent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPreference {
    Phone,
    Email,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    #[default]
    Pending,
    Responded,
    Closed,
}

impl InquiryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::Responded => "responded",
            InquiryStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoKind {
    Point,
}

/// GeoJSON point, `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: GeoKind,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: GeoKind::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        let (lng, lat) = (self.longitude(), self.latitude());
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::new(field, "longitude must be within [-180, 180]"));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::new(field, "latitude must be within [-90, 90]"));
        }
        Ok(())
    }

    /// Great-circle (haversine) distance in metres.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude().to_radians(), other.latitude().to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude() - self.longitude()).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METRES * a.sqrt().min(1.0).asin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub locality: String,
    pub city: String,
    pub geo: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Listed property as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub owner_id: DocumentId,
    pub title: String,
    pub description: String,
    pub transaction_type: TransactionType,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_subtype: Option<String>,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balconies: Option<u32>,
    pub area_sqft: f64,
    pub furnishing: Furnishing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_floors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floors_allowed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_sides: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_room: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servant_room: Option<bool>,
    pub location: Location,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(with = "timestamp")]
    pub posted_at: DateTime<Utc>,
}

impl Property {
    pub fn validate(&self) -> Result<(), ValidationError> {
        not_blank("title", &self.title)?;
        non_negative("price", self.price)?;
        non_negative("area_sqft", self.area_sqft)?;
        if let Some(sides) = self.open_sides {
            if !(1..=4).contains(&sides) {
                return Err(ValidationError::new("open_sides", "must be between 1 and 4"));
            }
        }
        self.location.geo.validate("location.geo")
    }
}

/// Payload accepted when listing a new property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub transaction_type: TransactionType,
    pub price: f64,
    #[serde(default)]
    pub property_category: Option<String>,
    #[serde(default)]
    pub property_subtype: Option<String>,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(default)]
    pub balconies: Option<u32>,
    pub area_sqft: f64,
    pub furnishing: Furnishing,
    #[serde(default)]
    pub floor_number: Option<i32>,
    #[serde(default)]
    pub total_floors: Option<u32>,
    #[serde(default)]
    pub floors_allowed: Option<u32>,
    #[serde(default)]
    pub open_sides: Option<u8>,
    #[serde(default)]
    pub facing: Option<String>,
    #[serde(default)]
    pub store_room: Option<bool>,
    #[serde(default)]
    pub servant_room: Option<bool>,
    pub location: Location,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl NewProperty {
    pub fn into_property(self, owner_id: DocumentId, posted_at: DateTime<Utc>) -> Property {
        Property {
            id: DocumentId::generate(),
            owner_id,
            title: self.title,
            description: self.description,
            transaction_type: self.transaction_type,
            price: self.price,
            property_category: self.property_category,
            property_subtype: self.property_subtype,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            balconies: self.balconies,
            area_sqft: self.area_sqft,
            furnishing: self.furnishing,
            floor_number: self.floor_number,
            total_floors: self.total_floors,
            floors_allowed: self.floors_allowed,
            open_sides: self.open_sides,
            facing: self.facing,
            store_room: self.store_room,
            servant_room: self.servant_room,
            location: self.location,
            images: self.images,
            amenities: self.amenities,
            posted_at,
        }
    }
}

/// Partial update; unset fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub price: Option<f64>,
    pub property_category: Option<String>,
    pub property_subtype: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub balconies: Option<u32>,
    pub area_sqft: Option<f64>,
    pub furnishing: Option<Furnishing>,
    pub floor_number: Option<i32>,
    pub total_floors: Option<u32>,
    pub floors_allowed: Option<u32>,
    pub open_sides: Option<u8>,
    pub facing: Option<String>,
    pub store_room: Option<bool>,
    pub servant_room: Option<bool>,
    pub location: Option<Location>,
    pub images: Option<Vec<Image>>,
    pub amenities: Option<Vec<String>>,
}

impl PropertyPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, property: &mut Property) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut property.title, self.title);
        set(&mut property.description, self.description);
        set(&mut property.transaction_type, self.transaction_type);
        set(&mut property.price, self.price);
        set_opt(&mut property.property_category, self.property_category);
        set_opt(&mut property.property_subtype, self.property_subtype);
        set(&mut property.bedrooms, self.bedrooms);
        set(&mut property.bathrooms, self.bathrooms);
        set_opt(&mut property.balconies, self.balconies);
        set(&mut property.area_sqft, self.area_sqft);
        set(&mut property.furnishing, self.furnishing);
        set_opt(&mut property.floor_number, self.floor_number);
        set_opt(&mut property.total_floors, self.total_floors);
        set_opt(&mut property.floors_allowed, self.floors_allowed);
        set_opt(&mut property.open_sides, self.open_sides);
        set_opt(&mut property.facing, self.facing);
        set_opt(&mut property.store_room, self.store_room);
        set_opt(&mut property.servant_room, self.servant_room);
        set(&mut property.location, self.location);
        set(&mut property.images, self.images);
        set(&mut property.amenities, self.amenities);
    }
}

/// Stored account. `password_hash` never leaves the service; responses use [`UserView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub user_type: UserType,
    pub password_hash: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            user_type: self.user_type,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub user_type: UserType,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub user_type: UserType,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub user_type: Option<UserType>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Callers normalize `email` before applying.
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(user_type) = self.user_type {
            user.user_type = user_type;
        }
    }
}

/// Lowercase and check the basic `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_ascii_lowercase();
    let invalid = || ValidationError::new("email", "value is not a valid email address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub property_id: DocumentId,
    pub user_id: DocumentId,
    pub rating: u8,
    pub comment: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

pub fn validate_rating(rating: u8) -> Result<(), ValidationError> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::new("rating", "must be between 1 and 5"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub property_id: String,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

impl ReviewPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(comment) = self.comment {
            review.comment = comment;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub property_id: DocumentId,
    pub user_id: DocumentId,
    pub message: String,
    pub contact_preference: ContactPreference,
    pub status: InquiryStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInquiry {
    pub property_id: String,
    pub user_id: String,
    pub message: String,
    pub contact_preference: ContactPreference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InquiryPatch {
    pub message: Option<String>,
    pub contact_preference: Option<ContactPreference>,
    pub status: Option<InquiryStatus>,
}

impl InquiryPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, inquiry: &mut Inquiry) {
        if let Some(message) = self.message {
            inquiry.message = message;
        }
        if let Some(preference) = self.contact_preference {
            inquiry.contact_preference = preference;
        }
        if let Some(status) = self.status {
            inquiry.status = status;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub user_id: DocumentId,
    pub property_id: DocumentId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFavorite {
    pub user_id: String,
    pub property_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub property_id: DocumentId,
    pub buyer_id: DocumentId,
    pub seller_id: DocumentId,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub status: TransactionStatus,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Move to `status`, stamping `completed_at` whenever it becomes completed.
    pub fn set_status(&mut self, status: TransactionStatus, at: DateTime<Utc>) {
        self.status = status;
        if status == TransactionStatus::Completed {
            self.completed_at = Some(at);
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("amount", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub property_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub transaction_type: TransactionType,
    pub amount: f64,
    #[serde(default)]
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPatch {
    pub status: Option<TransactionStatus>,
    pub amount: Option<f64>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, transaction: &mut Transaction, at: DateTime<Utc>) {
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(status) = self.status {
            transaction.set_status(status, at);
        }
    }
}
