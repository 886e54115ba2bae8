//! Real-estate marketplace: property listings with text and radius search,
//! user accounts, reviews, inquiries, favorites, and sale/rent transactions.
//!
//! Storage sits behind [`MarketplaceStore`] so the same service runs against
//! [`InMemoryStore`] in tests and the demo, and [`MongoStore`] in production.

pub mod domain;
pub mod facets;
pub mod memory;
pub mod mongo;
pub mod query;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    ContactPreference, DocumentId, Favorite, Furnishing, GeoPoint, Image, Inquiry, InquiryPatch,
    InquiryStatus, Location, NewFavorite, NewInquiry, NewProperty, NewReview, NewTransaction,
    NewUser, Property, PropertyPatch, Review, ReviewPatch, Transaction, TransactionPatch,
    TransactionStatus, TransactionType, User, UserPatch, UserType, UserView, ValidationError,
};
pub use facets::{FilterScreenOptions, LocalityOption, PropertyFacets, ValueRange};
pub use memory::InMemoryStore;
pub use mongo::MongoStore;
pub use query::{
    FacetParams, GeoRadius, InquiryListParams, Page, PropertyFilter, PropertyListParams,
    PropertySearch, PropertySearchParams, ReviewListParams, TransactionListParams,
    UserListParams,
};
pub use router::marketplace_router;
pub use service::{MarketplaceService, ServiceError};
pub use store::{Collection, MarketplaceStore, PropertyIndex, Record, StoreError};
