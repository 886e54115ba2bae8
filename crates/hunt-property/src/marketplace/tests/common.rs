use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::marketplace::domain::{
    DocumentId, Furnishing, GeoPoint, Location, NewProperty, NewUser, Property, TransactionType,
    UserType, UserView,
};
use crate::marketplace::facets::PropertyFacets;
use crate::marketplace::memory::InMemoryStore;
use crate::marketplace::query::{Page, PropertySearch};
use crate::marketplace::store::{Collection, PropertyIndex, Record, StoreError};
use crate::marketplace::{marketplace_router, MarketplaceService};

pub(super) const CHENNAI_CENTRAL: (f64, f64) = (80.2707, 13.0827);

pub(super) fn build_service() -> Arc<MarketplaceService<InMemoryStore>> {
    Arc::new(MarketplaceService::new(Arc::new(InMemoryStore::new())))
}

pub(super) fn router_with_service(service: Arc<MarketplaceService<InMemoryStore>>) -> Router {
    marketplace_router(service)
}

pub(super) fn new_user(email: &str, user_type: UserType) -> NewUser {
    NewUser {
        name: "Priya Raman".to_string(),
        email: email.to_string(),
        phone: "+919876543210".to_string(),
        user_type,
        password: "hunter2".to_string(),
    }
}

pub(super) fn location(city: &str, locality: &str, longitude: f64, latitude: f64) -> Location {
    Location {
        address: format!("12 Main Road, {locality}"),
        locality: locality.to_string(),
        city: city.to_string(),
        geo: GeoPoint::new(longitude, latitude),
    }
}

pub(super) fn new_property(owner_id: &DocumentId, title: &str, price: f64) -> NewProperty {
    NewProperty {
        owner_id: owner_id.to_string(),
        title: title.to_string(),
        description: "Well lit home close to the metro".to_string(),
        transaction_type: TransactionType::Rent,
        price,
        property_category: Some("Residential".to_string()),
        property_subtype: Some("Apartment".to_string()),
        bedrooms: 2,
        bathrooms: 2,
        balconies: Some(1),
        area_sqft: 1_050.0,
        furnishing: Furnishing::SemiFurnished,
        floor_number: Some(3),
        total_floors: Some(8),
        floors_allowed: None,
        open_sides: Some(2),
        facing: Some("East".to_string()),
        store_room: Some(false),
        servant_room: None,
        location: location(
            "Chennai",
            "Egmore",
            CHENNAI_CENTRAL.0 + 0.003,
            CHENNAI_CENTRAL.1 + 0.002,
        ),
        images: Vec::new(),
        amenities: vec!["Lift".to_string(), "Power backup".to_string()],
    }
}

pub(super) async fn seed_owner(service: &MarketplaceService<InMemoryStore>) -> UserView {
    service
        .register_user(new_user("owner@hunt.example", UserType::Owner))
        .await
        .expect("owner registers")
}

pub(super) async fn seed_property(
    service: &MarketplaceService<InMemoryStore>,
    payload: NewProperty,
) -> Property {
    service
        .create_property(payload)
        .await
        .expect("property listed")
}

pub(super) fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose backend is permanently down.
pub(super) struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl<R: Record> Collection<R> for UnavailableStore {
    async fn insert(&self, _record: R) -> Result<R, StoreError> {
        Err(unavailable())
    }

    async fn fetch(&self, _id: &DocumentId) -> Result<Option<R>, StoreError> {
        Err(unavailable())
    }

    async fn find_one(&self, _filter: &R::Filter) -> Result<Option<R>, StoreError> {
        Err(unavailable())
    }

    async fn find(&self, _filter: &R::Filter, _page: Page) -> Result<Vec<R>, StoreError> {
        Err(unavailable())
    }

    async fn replace(&self, _record: R) -> Result<R, StoreError> {
        Err(unavailable())
    }

    async fn remove(&self, _id: &DocumentId) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn remove_matching(&self, _filter: &R::Filter) -> Result<bool, StoreError> {
        Err(unavailable())
    }
}

#[async_trait]
impl PropertyIndex for UnavailableStore {
    async fn search(
        &self,
        _search: &PropertySearch,
        _page: Page,
    ) -> Result<Vec<Property>, StoreError> {
        Err(unavailable())
    }

    async fn facets(
        &self,
        _transaction_type: Option<TransactionType>,
    ) -> Result<PropertyFacets, StoreError> {
        Err(unavailable())
    }
}
