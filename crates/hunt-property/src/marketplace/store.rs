use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    DocumentId, Favorite, Inquiry, Property, Review, Transaction, TransactionType, User,
};
use super::facets::PropertyFacets;
use super::query::{
    FavoriteFilter, InquiryFilter, Page, PropertyFilter, PropertySearch, ReviewFilter,
    TransactionFilter, UserFilter,
};

/// A stored document kind and the filter used to select it.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection name in the document store.
    const COLLECTION: &'static str;
    /// Human label used in "<label> not found" responses.
    const LABEL: &'static str;
    /// Timestamp field ordering listings newest first.
    const CREATED_FIELD: &'static str;

    type Filter: std::fmt::Debug + Send + Sync;

    fn id(&self) -> &DocumentId;
    fn created_at(&self) -> DateTime<Utc>;

    /// Value that must be unique across the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// CRUD access to one collection.
#[async_trait]
pub trait Collection<R: Record>: Send + Sync {
    async fn insert(&self, record: R) -> Result<R, StoreError>;
    async fn fetch(&self, id: &DocumentId) -> Result<Option<R>, StoreError>;
    async fn find_one(&self, filter: &R::Filter) -> Result<Option<R>, StoreError>;
    /// Matching records, newest first, windowed by `page`.
    async fn find(&self, filter: &R::Filter, page: Page) -> Result<Vec<R>, StoreError>;
    /// Overwrite an existing record. Missing ids yield [`StoreError::NotFound`].
    async fn replace(&self, record: R) -> Result<R, StoreError>;
    async fn remove(&self, id: &DocumentId) -> Result<bool, StoreError>;
    /// Remove the first record matching `filter`.
    async fn remove_matching(&self, filter: &R::Filter) -> Result<bool, StoreError>;
}

/// Text/geo search and facet aggregation over listed properties.
#[async_trait]
pub trait PropertyIndex: Send + Sync {
    async fn search(&self, search: &PropertySearch, page: Page)
        -> Result<Vec<Property>, StoreError>;
    async fn facets(
        &self,
        transaction_type: Option<TransactionType>,
    ) -> Result<PropertyFacets, StoreError>;
}

/// Everything the marketplace service needs from a backend.
pub trait MarketplaceStore:
    Collection<Property>
    + Collection<User>
    + Collection<Review>
    + Collection<Inquiry>
    + Collection<Favorite>
    + Collection<Transaction>
    + PropertyIndex
    + 'static
{
}

impl<T> MarketplaceStore for T where
    T: Collection<Property>
        + Collection<User>
        + Collection<Review>
        + Collection<Inquiry>
        + Collection<Favorite>
        + Collection<Transaction>
        + PropertyIndex
        + 'static
{
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record violates a unique index")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl Record for Property {
    const COLLECTION: &'static str = "properties";
    const LABEL: &'static str = "Property";
    const CREATED_FIELD: &'static str = "posted_at";
    type Filter = PropertyFilter;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.posted_at
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "User";
    const CREATED_FIELD: &'static str = "created_at";
    type Filter = UserFilter;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.to_ascii_lowercase())
    }
}

impl Record for Review {
    const COLLECTION: &'static str = "reviews";
    const LABEL: &'static str = "Review";
    const CREATED_FIELD: &'static str = "created_at";
    type Filter = ReviewFilter;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Inquiry {
    const COLLECTION: &'static str = "inquiries";
    const LABEL: &'static str = "Inquiry";
    const CREATED_FIELD: &'static str = "created_at";
    type Filter = InquiryFilter;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Record for Favorite {
    const COLLECTION: &'static str = "favorites";
    const LABEL: &'static str = "Favorite";
    const CREATED_FIELD: &'static str = "created_at";
    type Filter = FavoriteFilter;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}|{}", self.user_id, self.property_id))
    }
}

impl Record for Transaction {
    const COLLECTION: &'static str = "transactions";
    const LABEL: &'static str = "Transaction";
    const CREATED_FIELD: &'static str = "created_at";
    type Filter = TransactionFilter;

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
