use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, FindOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MongoConfig;

use super::domain::{
    DocumentId, Favorite, Inquiry, Property, Review, Transaction, TransactionType, User,
    EARTH_RADIUS_METRES,
};
use super::facets::{LocalityOption, PropertyFacets, ValueRange};
use super::query::{
    FavoriteFilter, InquiryFilter, Page, PropertyFilter, PropertySearch, ReviewFilter,
    TransactionFilter, UserFilter,
};
use super::store::{Collection, PropertyIndex, Record, StoreError};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. The driver pools connections internally.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connect, verify the server answers a ping, and create the indexes the
    /// queries rely on.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.url)
            .await
            .map_err(store_error)?;
        options.app_name = Some("hunt-property-api".to_string());
        options.max_pool_size = Some(config.max_pool_size);

        let client = Client::with_options(options).map_err(store_error)?;
        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(store_error)?;

        let store = Self { database };
        store.ensure_indexes().await?;
        info!(
            database = %config.database,
            max_pool_size = config.max_pool_size,
            "connected to mongodb"
        );
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for (collection, models) in index_plan() {
            let names = self
                .database
                .collection::<Document>(collection)
                .create_indexes(models, None)
                .await
                .map_err(store_error)?
                .index_names;
            debug!(collection, indexes = ?names, "indexes ensured");
        }
        Ok(())
    }

    fn collection<R: MongoRecord>(&self) -> mongodb::Collection<R> {
        self.database.collection::<R>(R::COLLECTION)
    }
}

fn index(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_plan() -> Vec<(&'static str, Vec<IndexModel>)> {
    vec![
        (
            Property::COLLECTION,
            vec![
                index(doc! { "location.geo": "2dsphere" }),
                index(doc! { "title": "text", "description": "text" }),
                index(doc! { "transaction_type": 1, "price": 1 }),
                index(doc! { "bedrooms": 1, "bathrooms": 1 }),
                index(doc! { "owner_id": 1 }),
                index(doc! { "posted_at": -1 }),
            ],
        ),
        (User::COLLECTION, vec![unique_index(doc! { "email": 1 })]),
        (
            Review::COLLECTION,
            vec![
                index(doc! { "property_id": 1 }),
                index(doc! { "user_id": 1 }),
            ],
        ),
        (
            Inquiry::COLLECTION,
            vec![
                index(doc! { "property_id": 1 }),
                index(doc! { "user_id": 1 }),
                index(doc! { "created_at": -1 }),
            ],
        ),
        (
            Favorite::COLLECTION,
            vec![unique_index(doc! { "user_id": 1, "property_id": 1 })],
        ),
        (
            Transaction::COLLECTION,
            vec![
                index(doc! { "property_id": 1 }),
                index(doc! { "buyer_id": 1 }),
                index(doc! { "seller_id": 1 }),
                index(doc! { "created_at": -1 }),
            ],
        ),
    ]
}

fn store_error(err: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(failure)) = err.kind.as_ref() {
        if failure.code == DUPLICATE_KEY {
            return StoreError::Conflict;
        }
    }
    StoreError::Unavailable(err.to_string())
}

/// Record kinds that translate their filter into a query document.
pub trait MongoRecord: Record + Serialize + DeserializeOwned + Unpin {
    fn filter_document(filter: &Self::Filter) -> Document;
}

fn by_id(id: &DocumentId) -> Document {
    doc! { "_id": id.as_str() }
}

fn newest_first(field: &str) -> Document {
    let mut sort = Document::new();
    sort.insert(field, -1);
    sort.insert("_id", -1);
    sort
}

fn find_options(page: Page, sort: Option<Document>) -> FindOptions {
    let mut options = FindOptions::default();
    options.skip = Some(page.skip);
    options.limit = Some(i64::try_from(page.limit).unwrap_or(i64::MAX));
    options.sort = sort;
    options
}

#[async_trait]
impl<R: MongoRecord> Collection<R> for MongoStore {
    async fn insert(&self, record: R) -> Result<R, StoreError> {
        self.collection::<R>()
            .insert_one(&record, None)
            .await
            .map_err(store_error)?;
        Ok(record)
    }

    async fn fetch(&self, id: &DocumentId) -> Result<Option<R>, StoreError> {
        self.collection::<R>()
            .find_one(by_id(id), None)
            .await
            .map_err(store_error)
    }

    async fn find_one(&self, filter: &R::Filter) -> Result<Option<R>, StoreError> {
        let mut found =
            <Self as Collection<R>>::find(self, filter, Page { skip: 0, limit: 1 }).await?;
        Ok(found.pop())
    }

    async fn find(&self, filter: &R::Filter, page: Page) -> Result<Vec<R>, StoreError> {
        let options = find_options(page, Some(newest_first(R::CREATED_FIELD)));
        self.collection::<R>()
            .find(R::filter_document(filter), options)
            .await
            .map_err(store_error)?
            .try_collect()
            .await
            .map_err(store_error)
    }

    async fn replace(&self, record: R) -> Result<R, StoreError> {
        let result = self
            .collection::<R>()
            .replace_one(by_id(record.id()), &record, None)
            .await
            .map_err(store_error)?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(record)
    }

    async fn remove(&self, id: &DocumentId) -> Result<bool, StoreError> {
        let result = self
            .collection::<R>()
            .delete_one(by_id(id), None)
            .await
            .map_err(store_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn remove_matching(&self, filter: &R::Filter) -> Result<bool, StoreError> {
        let result = self
            .collection::<R>()
            .delete_one(R::filter_document(filter), None)
            .await
            .map_err(store_error)?;
        Ok(result.deleted_count > 0)
    }
}

fn insert_id(document: &mut Document, field: &str, id: &Option<DocumentId>) {
    if let Some(id) = id {
        document.insert(field, id.as_str());
    }
}

fn insert_label(document: &mut Document, field: &str, label: Option<&'static str>) {
    if let Some(label) = label {
        document.insert(field, label);
    }
}

/// Case-insensitive substring match on literal input.
fn contains_ignore_case(value: &str) -> Document {
    doc! { "$regex": regex::escape(value), "$options": "i" }
}

pub(crate) fn property_filter_document(filter: &PropertyFilter) -> Document {
    let mut document = Document::new();
    insert_id(&mut document, "owner_id", &filter.owner_id);
    insert_label(
        &mut document,
        "transaction_type",
        filter.transaction_type.map(|value| value.label()),
    );

    let mut price = Document::new();
    if let Some(min) = filter.min_price {
        price.insert("$gte", min);
    }
    if let Some(max) = filter.max_price {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        document.insert("price", price);
    }

    if let Some(min) = filter.min_bedrooms {
        document.insert("bedrooms", doc! { "$gte": min });
    }
    if let Some(min) = filter.min_bathrooms {
        document.insert("bathrooms", doc! { "$gte": min });
    }
    if let Some(city) = &filter.city {
        document.insert("location.city", contains_ignore_case(city));
    }
    if let Some(locality) = &filter.locality {
        document.insert("location.locality", contains_ignore_case(locality));
    }
    insert_label(
        &mut document,
        "furnishing",
        filter.furnishing.map(|value| value.label()),
    );
    document
}

/// `$near` cannot be combined with `$text`, so a text search constrains the
/// radius with `$geoWithin` instead and loses distance ordering.
pub(crate) fn search_document(search: &PropertySearch) -> Document {
    let mut document = property_filter_document(&search.filter);
    if let Some(text) = &search.text {
        document.insert("$text", doc! { "$search": text.as_str() });
    }
    if let Some(geo) = &search.geo {
        let (longitude, latitude) = (geo.center.longitude(), geo.center.latitude());
        let clause = if search.text.is_some() {
            let radians = geo.max_distance / EARTH_RADIUS_METRES;
            doc! { "$geoWithin": { "$centerSphere": [[longitude, latitude], radians] } }
        } else {
            doc! {
                "$near": {
                    "$geometry": { "type": "Point", "coordinates": [longitude, latitude] },
                    "$maxDistance": geo.max_distance,
                }
            }
        };
        document.insert("location.geo", clause);
    }
    document
}

impl MongoRecord for Property {
    fn filter_document(filter: &PropertyFilter) -> Document {
        property_filter_document(filter)
    }
}

impl MongoRecord for User {
    fn filter_document(filter: &UserFilter) -> Document {
        let mut document = Document::new();
        insert_label(
            &mut document,
            "user_type",
            filter.user_type.map(|value| value.label()),
        );
        if let Some(email) = &filter.email {
            document.insert("email", email.to_ascii_lowercase());
        }
        document
    }
}

impl MongoRecord for Review {
    fn filter_document(filter: &ReviewFilter) -> Document {
        let mut document = Document::new();
        insert_id(&mut document, "property_id", &filter.property_id);
        insert_id(&mut document, "user_id", &filter.user_id);
        document
    }
}

impl MongoRecord for Inquiry {
    fn filter_document(filter: &InquiryFilter) -> Document {
        let mut document = Document::new();
        insert_id(&mut document, "property_id", &filter.property_id);
        insert_id(&mut document, "user_id", &filter.user_id);
        insert_label(
            &mut document,
            "status",
            filter.status.map(|value| value.label()),
        );
        document
    }
}

impl MongoRecord for Favorite {
    fn filter_document(filter: &FavoriteFilter) -> Document {
        let mut document = Document::new();
        insert_id(&mut document, "user_id", &filter.user_id);
        insert_id(&mut document, "property_id", &filter.property_id);
        document
    }
}

impl MongoRecord for Transaction {
    fn filter_document(filter: &TransactionFilter) -> Document {
        let mut document = Document::new();
        insert_id(&mut document, "property_id", &filter.property_id);
        insert_id(&mut document, "buyer_id", &filter.buyer_id);
        insert_id(&mut document, "seller_id", &filter.seller_id);
        insert_label(
            &mut document,
            "status",
            filter.status.map(|value| value.label()),
        );
        document
    }
}

fn distinct_values(field: &str) -> Vec<Document> {
    let path = format!("${field}");
    vec![
        doc! { "$match": { field: { "$exists": true, "$nin": [Bson::Null, ""] } } },
        doc! { "$group": { "_id": path } },
        doc! { "$project": { "value": "$_id", "_id": 0 } },
    ]
}

fn range_of(field: &str, positive_only: bool) -> Vec<Document> {
    let path = format!("${field}");
    let condition = if positive_only {
        doc! { "$gt": 0 }
    } else {
        doc! { "$exists": true }
    };
    vec![
        doc! { "$match": { field: condition } },
        doc! { "$group": { "_id": Bson::Null, "min": { "$min": path.as_str() }, "max": { "$max": path.as_str() } } },
    ]
}

pub(crate) fn facet_pipeline(transaction_type: Option<TransactionType>) -> Vec<Document> {
    let mut scope = Document::new();
    insert_label(
        &mut scope,
        "transaction_type",
        transaction_type.map(|value| value.label()),
    );

    vec![
        doc! { "$match": scope },
        doc! {
            "$facet": {
                "transaction_types": distinct_values("transaction_type"),
                "property_categories": distinct_values("property_category"),
                "property_subtypes": distinct_values("property_subtype"),
                "furnishing_options": distinct_values("furnishing"),
                "facing_options": distinct_values("facing"),
                "cities": distinct_values("location.city"),
                "localities": [
                    { "$match": { "location.locality": { "$exists": true, "$nin": [Bson::Null, ""] } } },
                    { "$group": { "_id": { "value": "$location.locality", "city": "$location.city" } } },
                    { "$project": { "value": "$_id.value", "city": "$_id.city", "_id": 0 } },
                ],
                "bedrooms": distinct_values("bedrooms"),
                "bathrooms": distinct_values("bathrooms"),
                "price_range": range_of("price", false),
                "area_range": range_of("area_sqft", true),
            }
        },
    ]
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(value) => Some(*value),
        Bson::Int32(value) => Some(f64::from(*value)),
        Bson::Int64(value) => Some(*value as f64),
        _ => None,
    }
}

fn facet_entries<'a>(facet: &'a Document, key: &str) -> impl Iterator<Item = &'a Document> {
    facet
        .get_array(key)
        .map(|entries| entries.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(Bson::as_document)
}

fn facet_strings(facet: &Document, key: &str) -> Vec<String> {
    facet_entries(facet, key)
        .filter_map(|entry| entry.get_str("value").ok())
        .map(str::to_string)
        .collect()
}

fn facet_counts(facet: &Document, key: &str) -> Vec<u32> {
    facet_entries(facet, key)
        .filter_map(|entry| entry.get("value").and_then(as_number))
        .filter(|value| *value >= 0.0)
        .map(|value| value as u32)
        .collect()
}

fn facet_range(facet: &Document, key: &str) -> Option<ValueRange> {
    let entry = facet_entries(facet, key).next()?;
    Some(ValueRange {
        min: entry.get("min").and_then(as_number)?,
        max: entry.get("max").and_then(as_number)?,
    })
}

pub(crate) fn facets_from_document(facet: &Document) -> PropertyFacets {
    PropertyFacets {
        transaction_types: facet_strings(facet, "transaction_types"),
        property_categories: facet_strings(facet, "property_categories"),
        property_subtypes: facet_strings(facet, "property_subtypes"),
        furnishing_options: facet_strings(facet, "furnishing_options"),
        facing_options: facet_strings(facet, "facing_options"),
        cities: facet_strings(facet, "cities"),
        localities: facet_entries(facet, "localities")
            .filter_map(|entry| {
                Some(LocalityOption {
                    value: entry.get_str("value").ok()?.to_string(),
                    city: entry.get_str("city").unwrap_or_default().to_string(),
                })
            })
            .collect(),
        bedrooms: facet_counts(facet, "bedrooms"),
        bathrooms: facet_counts(facet, "bathrooms"),
        price: facet_range(facet, "price_range"),
        area: facet_range(facet, "area_range"),
    }
}

#[async_trait]
impl PropertyIndex for MongoStore {
    async fn search(
        &self,
        search: &PropertySearch,
        page: Page,
    ) -> Result<Vec<Property>, StoreError> {
        let sort = if search.orders_by_distance() {
            None
        } else {
            Some(newest_first(Property::CREATED_FIELD))
        };
        self.collection::<Property>()
            .find(search_document(search), find_options(page, sort))
            .await
            .map_err(store_error)?
            .try_collect()
            .await
            .map_err(store_error)
    }

    async fn facets(
        &self,
        transaction_type: Option<TransactionType>,
    ) -> Result<PropertyFacets, StoreError> {
        let mut cursor = self
            .collection::<Property>()
            .aggregate(facet_pipeline(transaction_type), None)
            .await
            .map_err(store_error)?;
        let facet = cursor.try_next().await.map_err(store_error)?;
        Ok(facet
            .map(|facet| facets_from_document(&facet))
            .unwrap_or_default())
    }
}
