use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use crate::envelope::Envelope;

use super::domain::{
    Favorite, Inquiry, InquiryPatch, NewFavorite, NewInquiry, NewProperty, NewReview,
    NewTransaction, NewUser, Property, PropertyPatch, Review, ReviewPatch, Transaction,
    TransactionPatch, UserPatch, UserView,
};
use super::facets::FilterScreenOptions;
use super::query::{
    FacetParams, InquiryListParams, PropertyListParams, PropertySearchParams, ReviewListParams,
    TransactionListParams, UserListParams,
};
use super::service::{MarketplaceService, ServiceError};
use super::store::{MarketplaceStore, StoreError};

type Shared<S> = State<Arc<MarketplaceService<S>>>;
type Created<T> = Result<(StatusCode, Json<T>), ServiceError>;
type Found<T> = Result<Json<T>, ServiceError>;
type Deleted = Result<StatusCode, ServiceError>;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InvalidId(_) | ServiceError::NoFieldsToUpdate => StatusCode::BAD_REQUEST,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound(_) | ServiceError::Store(StoreError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Conflict(_) | ServiceError::Store(StoreError::Conflict) => {
                StatusCode::CONFLICT
            }
            ServiceError::Store(StoreError::Unavailable(reason)) => {
                error!(%reason, "marketplace store unavailable");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Router exposing the listings, accounts and engagement endpoints under `/api`.
pub fn marketplace_router<S>(service: Arc<MarketplaceService<S>>) -> Router
where
    S: MarketplaceStore,
{
    Router::new()
        .route(
            "/api/properties",
            post(create_property::<S>).get(list_properties::<S>),
        )
        .route("/api/properties/search", get(search_properties::<S>))
        .route(
            "/api/properties/owner/:owner_id",
            get(properties_by_owner::<S>),
        )
        .route(
            "/api/properties/:property_id",
            get(get_property::<S>)
                .put(update_property::<S>)
                .delete(delete_property::<S>),
        )
        .route("/api/users", post(register_user::<S>).get(list_users::<S>))
        .route(
            "/api/users/profile/:user_id",
            get(get_user::<S>).put(update_user::<S>),
        )
        .route(
            "/api/users/:user_id",
            get(get_user::<S>)
                .put(update_user::<S>)
                .delete(delete_user::<S>),
        )
        .route(
            "/api/reviews",
            post(create_review::<S>).get(list_reviews::<S>),
        )
        .route(
            "/api/reviews/property/:property_id",
            get(reviews_for_property::<S>),
        )
        .route(
            "/api/reviews/:review_id",
            get(get_review::<S>)
                .put(update_review::<S>)
                .delete(delete_review::<S>),
        )
        .route(
            "/api/inquiries",
            post(create_inquiry::<S>).get(list_inquiries::<S>),
        )
        .route(
            "/api/inquiries/:inquiry_id",
            get(get_inquiry::<S>)
                .put(update_inquiry::<S>)
                .delete(delete_inquiry::<S>),
        )
        .route("/api/favorites", post(add_favorite::<S>))
        .route("/api/favorites/user/:user_id", get(favorites_for_user::<S>))
        .route(
            "/api/favorites/user/:user_id/property/:property_id",
            delete(remove_favorite::<S>),
        )
        .route(
            "/api/favorites/:favorite_id",
            get(get_favorite::<S>).delete(delete_favorite::<S>),
        )
        .route(
            "/api/transactions",
            post(create_transaction::<S>).get(list_transactions::<S>),
        )
        .route(
            "/api/transactions/:transaction_id",
            get(get_transaction::<S>)
                .put(update_transaction::<S>)
                .delete(delete_transaction::<S>),
        )
        .route("/api/filter-screen", get(filter_screen::<S>))
        .with_state(service)
}

pub(crate) async fn create_property<S: MarketplaceStore>(
    State(service): Shared<S>,
    Json(payload): Json<NewProperty>,
) -> Created<Property> {
    let property = service.create_property(payload).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub(crate) async fn list_properties<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<PropertyListParams>,
) -> Found<Vec<Property>> {
    Ok(Json(service.list_properties(params).await?))
}

pub(crate) async fn search_properties<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<PropertySearchParams>,
) -> Found<Vec<Property>> {
    Ok(Json(service.search_properties(params).await?))
}

pub(crate) async fn get_property<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(property_id): Path<String>,
) -> Found<Property> {
    Ok(Json(service.get_property(&property_id).await?))
}

pub(crate) async fn update_property<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(property_id): Path<String>,
    Json(patch): Json<PropertyPatch>,
) -> Found<Property> {
    Ok(Json(service.update_property(&property_id, patch).await?))
}

pub(crate) async fn delete_property<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(property_id): Path<String>,
) -> Deleted {
    service.delete_property(&property_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn properties_by_owner<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(owner_id): Path<String>,
) -> Found<Vec<Property>> {
    Ok(Json(service.properties_by_owner(&owner_id).await?))
}

pub(crate) async fn register_user<S: MarketplaceStore>(
    State(service): Shared<S>,
    Json(payload): Json<NewUser>,
) -> Created<UserView> {
    let user = service.register_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn list_users<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<UserListParams>,
) -> Found<Vec<UserView>> {
    Ok(Json(service.list_users(params).await?))
}

pub(crate) async fn get_user<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(user_id): Path<String>,
) -> Found<UserView> {
    Ok(Json(service.get_user(&user_id).await?))
}

pub(crate) async fn update_user<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(user_id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Found<UserView> {
    Ok(Json(service.update_user(&user_id, patch).await?))
}

pub(crate) async fn delete_user<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(user_id): Path<String>,
) -> Deleted {
    service.delete_user(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn create_review<S: MarketplaceStore>(
    State(service): Shared<S>,
    Json(payload): Json<NewReview>,
) -> Created<Review> {
    let review = service.create_review(payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub(crate) async fn list_reviews<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<ReviewListParams>,
) -> Found<Vec<Review>> {
    Ok(Json(service.list_reviews(params).await?))
}

pub(crate) async fn get_review<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(review_id): Path<String>,
) -> Found<Review> {
    Ok(Json(service.get_review(&review_id).await?))
}

pub(crate) async fn update_review<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(review_id): Path<String>,
    Json(patch): Json<ReviewPatch>,
) -> Found<Review> {
    Ok(Json(service.update_review(&review_id, patch).await?))
}

pub(crate) async fn delete_review<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(review_id): Path<String>,
) -> Deleted {
    service.delete_review(&review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn reviews_for_property<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(property_id): Path<String>,
) -> Found<Vec<Review>> {
    Ok(Json(service.reviews_for_property(&property_id).await?))
}

pub(crate) async fn create_inquiry<S: MarketplaceStore>(
    State(service): Shared<S>,
    Json(payload): Json<NewInquiry>,
) -> Created<Inquiry> {
    let inquiry = service.create_inquiry(payload).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

pub(crate) async fn list_inquiries<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<InquiryListParams>,
) -> Found<Vec<Inquiry>> {
    Ok(Json(service.list_inquiries(params).await?))
}

pub(crate) async fn get_inquiry<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(inquiry_id): Path<String>,
) -> Found<Inquiry> {
    Ok(Json(service.get_inquiry(&inquiry_id).await?))
}

pub(crate) async fn update_inquiry<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(inquiry_id): Path<String>,
    Json(patch): Json<InquiryPatch>,
) -> Found<Inquiry> {
    Ok(Json(service.update_inquiry(&inquiry_id, patch).await?))
}

pub(crate) async fn delete_inquiry<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(inquiry_id): Path<String>,
) -> Deleted {
    service.delete_inquiry(&inquiry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn add_favorite<S: MarketplaceStore>(
    State(service): Shared<S>,
    Json(payload): Json<NewFavorite>,
) -> Created<Favorite> {
    let favorite = service.add_favorite(payload).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

pub(crate) async fn favorites_for_user<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(user_id): Path<String>,
) -> Found<Vec<Favorite>> {
    Ok(Json(service.favorites_for_user(&user_id).await?))
}

pub(crate) async fn get_favorite<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(favorite_id): Path<String>,
) -> Found<Favorite> {
    Ok(Json(service.get_favorite(&favorite_id).await?))
}

pub(crate) async fn delete_favorite<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(favorite_id): Path<String>,
) -> Deleted {
    service.delete_favorite(&favorite_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn remove_favorite<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path((user_id, property_id)): Path<(String, String)>,
) -> Deleted {
    service.remove_favorite(&user_id, &property_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn create_transaction<S: MarketplaceStore>(
    State(service): Shared<S>,
    Json(payload): Json<NewTransaction>,
) -> Created<Transaction> {
    let transaction = service.create_transaction(payload).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub(crate) async fn list_transactions<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<TransactionListParams>,
) -> Found<Vec<Transaction>> {
    Ok(Json(service.list_transactions(params).await?))
}

pub(crate) async fn get_transaction<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(transaction_id): Path<String>,
) -> Found<Transaction> {
    Ok(Json(service.get_transaction(&transaction_id).await?))
}

pub(crate) async fn update_transaction<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(transaction_id): Path<String>,
    Json(patch): Json<TransactionPatch>,
) -> Found<Transaction> {
    Ok(Json(
        service.update_transaction(&transaction_id, patch).await?,
    ))
}

pub(crate) async fn delete_transaction<S: MarketplaceStore>(
    State(service): Shared<S>,
    Path(transaction_id): Path<String>,
) -> Deleted {
    service.delete_transaction(&transaction_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn filter_screen<S: MarketplaceStore>(
    State(service): Shared<S>,
    Query(params): Query<FacetParams>,
) -> Found<Envelope<FilterScreenOptions>> {
    Ok(Json(Envelope::ok(service.filter_screen(params).await?)))
}
