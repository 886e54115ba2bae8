use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::domain::{
    DocumentId, Favorite, Inquiry, Property, Review, Transaction, TransactionType, User,
};
use super::facets::{LocalityOption, PropertyFacets, ValueRange};
use super::query::{
    FavoriteFilter, InquiryFilter, Page, PropertyFilter, PropertySearch, ReviewFilter,
    TransactionFilter, UserFilter,
};
use super::store::{Collection, PropertyIndex, Record, StoreError};

/// Process-local store used by tests, the demo command and `STORAGE_BACKEND=memory`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    properties: Mutex<Vec<Property>>,
    users: Mutex<Vec<User>>,
    reviews: Mutex<Vec<Review>>,
    inquiries: Mutex<Vec<Inquiry>>,
    favorites: Mutex<Vec<Favorite>>,
    transactions: Mutex<Vec<Transaction>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Binds a record kind to its table and evaluates its filter in process.
pub trait MemoryRecord: Record {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>>;
    fn matches(&self, filter: &Self::Filter) -> bool;
}

fn lock<R>(table: &Mutex<Vec<R>>) -> Result<MutexGuard<'_, Vec<R>>, StoreError> {
    table
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory collection lock poisoned".to_string()))
}

fn window<R>(records: Vec<R>, page: Page) -> Vec<R> {
    let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
    records.into_iter().skip(skip).take(limit).collect()
}

/// Newest first; equal timestamps keep the latest insertion first.
fn newest_first<R: Record>(table: &[R], keep: impl Fn(&R) -> bool) -> Vec<R> {
    let mut records: Vec<R> = table.iter().rev().filter(|r| keep(r)).cloned().collect();
    records.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    records
}

fn violates_unique<R: Record>(table: &[R], record: &R) -> bool {
    match record.unique_key() {
        Some(key) => table
            .iter()
            .filter(|existing| existing.id() != record.id())
            .any(|existing| existing.unique_key().as_deref() == Some(key.as_str())),
        None => false,
    }
}

#[async_trait]
impl<R: MemoryRecord> Collection<R> for InMemoryStore {
    async fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut table = lock(R::table(self))?;
        if table.iter().any(|existing| existing.id() == record.id())
            || violates_unique(&table, &record)
        {
            return Err(StoreError::Conflict);
        }
        table.push(record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &DocumentId) -> Result<Option<R>, StoreError> {
        let table = lock(R::table(self))?;
        Ok(table.iter().find(|record| record.id() == id).cloned())
    }

    async fn find_one(&self, filter: &R::Filter) -> Result<Option<R>, StoreError> {
        let table = lock(R::table(self))?;
        Ok(newest_first(&table, |record| record.matches(filter))
            .into_iter()
            .next())
    }

    async fn find(&self, filter: &R::Filter, page: Page) -> Result<Vec<R>, StoreError> {
        let table = lock(R::table(self))?;
        let records = newest_first(&table, |record| record.matches(filter));
        Ok(window(records, page))
    }

    async fn replace(&self, record: R) -> Result<R, StoreError> {
        let mut table = lock(R::table(self))?;
        if violates_unique(&table, &record) {
            return Err(StoreError::Conflict);
        }
        let slot = table
            .iter_mut()
            .find(|existing| existing.id() == record.id())
            .ok_or(StoreError::NotFound)?;
        *slot = record.clone();
        Ok(record)
    }

    async fn remove(&self, id: &DocumentId) -> Result<bool, StoreError> {
        let mut table = lock(R::table(self))?;
        let before = table.len();
        table.retain(|record| record.id() != id);
        Ok(table.len() != before)
    }

    async fn remove_matching(&self, filter: &R::Filter) -> Result<bool, StoreError> {
        let mut table = lock(R::table(self))?;
        match table.iter().position(|record| record.matches(filter)) {
            Some(index) => {
                table.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn eq_if<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
    wanted.as_ref().map_or(true, |wanted| wanted == actual)
}

fn contains_ignore_case(needle: &Option<String>, haystack: &str) -> bool {
    needle.as_ref().map_or(true, |needle| {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    })
}

impl MemoryRecord for Property {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>> {
        &store.properties
    }

    fn matches(&self, filter: &PropertyFilter) -> bool {
        eq_if(&filter.owner_id, &self.owner_id)
            && eq_if(&filter.transaction_type, &self.transaction_type)
            && filter.min_price.map_or(true, |min| self.price >= min)
            && filter.max_price.map_or(true, |max| self.price <= max)
            && filter.min_bedrooms.map_or(true, |min| self.bedrooms >= min)
            && filter.min_bathrooms.map_or(true, |min| self.bathrooms >= min)
            && contains_ignore_case(&filter.city, &self.location.city)
            && contains_ignore_case(&filter.locality, &self.location.locality)
            && eq_if(&filter.furnishing, &self.furnishing)
    }
}

impl MemoryRecord for User {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>> {
        &store.users
    }

    fn matches(&self, filter: &UserFilter) -> bool {
        eq_if(&filter.user_type, &self.user_type)
            && filter
                .email
                .as_ref()
                .map_or(true, |email| self.email.eq_ignore_ascii_case(email))
    }
}

impl MemoryRecord for Review {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>> {
        &store.reviews
    }

    fn matches(&self, filter: &ReviewFilter) -> bool {
        eq_if(&filter.property_id, &self.property_id) && eq_if(&filter.user_id, &self.user_id)
    }
}

impl MemoryRecord for Inquiry {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>> {
        &store.inquiries
    }

    fn matches(&self, filter: &InquiryFilter) -> bool {
        eq_if(&filter.property_id, &self.property_id)
            && eq_if(&filter.user_id, &self.user_id)
            && eq_if(&filter.status, &self.status)
    }
}

impl MemoryRecord for Favorite {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>> {
        &store.favorites
    }

    fn matches(&self, filter: &FavoriteFilter) -> bool {
        eq_if(&filter.user_id, &self.user_id) && eq_if(&filter.property_id, &self.property_id)
    }
}

impl MemoryRecord for Transaction {
    fn table(store: &InMemoryStore) -> &Mutex<Vec<Self>> {
        &store.transactions
    }

    fn matches(&self, filter: &TransactionFilter) -> bool {
        eq_if(&filter.property_id, &self.property_id)
            && eq_if(&filter.buyer_id, &self.buyer_id)
            && eq_if(&filter.seller_id, &self.seller_id)
            && eq_if(&filter.status, &self.status)
    }
}

/// Lowercase alphanumeric terms, the unit of text matching.
pub(crate) fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches_text(property: &Property, query: &BTreeSet<String>) -> bool {
    let mut indexed = terms(&property.title);
    indexed.extend(terms(&property.description));
    query.iter().any(|term| indexed.contains(term))
}

#[async_trait]
impl PropertyIndex for InMemoryStore {
    async fn search(
        &self,
        search: &PropertySearch,
        page: Page,
    ) -> Result<Vec<Property>, StoreError> {
        let table = lock(&self.properties)?;
        let query_terms = search.text.as_deref().map(terms);

        let mut hits: Vec<(f64, Property)> = Vec::new();
        for property in table.iter().rev() {
            if !property.matches(&search.filter) {
                continue;
            }
            if let Some(query_terms) = &query_terms {
                if !matches_text(property, query_terms) {
                    continue;
                }
            }
            let distance = match &search.geo {
                Some(geo) => {
                    let distance = geo.center.distance_to(&property.location.geo);
                    if distance > geo.max_distance {
                        continue;
                    }
                    distance
                }
                None => 0.0,
            };
            hits.push((distance, property.clone()));
        }

        if search.orders_by_distance() {
            hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        } else {
            hits.sort_by(|a, b| b.1.posted_at.cmp(&a.1.posted_at));
        }

        let properties = hits.into_iter().map(|(_, property)| property).collect();
        Ok(window(properties, page))
    }

    async fn facets(
        &self,
        transaction_type: Option<TransactionType>,
    ) -> Result<PropertyFacets, StoreError> {
        let table = lock(&self.properties)?;
        let mut facets = PropertyFacets::default();

        for property in table
            .iter()
            .filter(|property| eq_if(&transaction_type, &property.transaction_type))
        {
            facets
                .transaction_types
                .push(property.transaction_type.label().to_string());
            facets
                .furnishing_options
                .push(property.furnishing.label().to_string());
            facets
                .property_categories
                .extend(property.property_category.clone());
            facets
                .property_subtypes
                .extend(property.property_subtype.clone());
            facets.facing_options.extend(property.facing.clone());
            facets.cities.push(property.location.city.clone());
            facets.localities.push(LocalityOption {
                value: property.location.locality.clone(),
                city: property.location.city.clone(),
            });
            facets.bedrooms.push(property.bedrooms);
            facets.bathrooms.push(property.bathrooms);
            facets.price = ValueRange::include(facets.price, property.price);
            if property.area_sqft > 0.0 {
                facets.area = ValueRange::include(facets.area, property.area_sqft);
            }
        }

        Ok(facets)
    }
}
