use std::sync::Arc;

use tracing::debug;

use super::domain::{
    self, hash_password, normalize_email, validate_rating, DocumentId, Favorite, Inquiry,
    InquiryPatch, InquiryStatus, NewFavorite, NewInquiry, NewProperty, NewReview,
    NewTransaction, NewUser, Property, PropertyPatch, Review, ReviewPatch, Transaction,
    TransactionPatch, TransactionStatus, User, UserPatch, UserView, ValidationError,
};
use super::facets::FilterScreenOptions;
use super::query::{
    FacetParams, FavoriteFilter, InquiryFilter, InquiryListParams, Page,
    PropertyFilter, PropertyListParams, PropertySearchParams, ReviewFilter, ReviewListParams,
    TransactionFilter, TransactionListParams, UserFilter, UserListParams,
};
use super::store::{Collection, MarketplaceStore, Record, StoreError};

const EMAIL_TAKEN: &str = "Email already registered";
const ALREADY_FAVORITE: &str = "Property already in favorites";

/// Marketplace operations over an injected store.
pub struct MarketplaceService<S> {
    store: Arc<S>,
}

/// Error raised by marketplace operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Carries the lowercase entity name, e.g. `property`.
    #[error("Invalid {0} ID")]
    InvalidId(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("No fields to update")]
    NoFieldsToUpdate,
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn parse_id(raw: &str, entity: &'static str) -> Result<DocumentId, ServiceError> {
    DocumentId::parse(raw).ok_or(ServiceError::InvalidId(entity))
}

fn parse_optional_id(
    raw: Option<String>,
    entity: &'static str,
) -> Result<Option<DocumentId>, ServiceError> {
    raw.filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_id(&raw, entity))
        .transpose()
}

fn conflict_as(message: &'static str) -> impl Fn(StoreError) -> ServiceError {
    move |err| match err {
        StoreError::Conflict => ServiceError::Conflict(message),
        other => ServiceError::Store(other),
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

impl<S> MarketplaceService<S>
where
    S: MarketplaceStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn collection<R: Record>(&self) -> &dyn Collection<R>
    where
        S: Collection<R>,
    {
        self.store.as_ref()
    }

    /// Fetch a record or fail with `<label> not found`.
    async fn require<R: Record>(
        &self,
        id: &DocumentId,
        label: &'static str,
    ) -> Result<R, ServiceError>
    where
        S: Collection<R>,
    {
        self.collection::<R>()
            .fetch(id)
            .await?
            .ok_or(ServiceError::NotFound(label))
    }

    async fn get_record<R: Record>(
        &self,
        raw_id: &str,
        entity: &'static str,
    ) -> Result<R, ServiceError>
    where
        S: Collection<R>,
    {
        let id = parse_id(raw_id, entity)?;
        self.require(&id, R::LABEL).await
    }

    async fn delete_record<R: Record>(
        &self,
        raw_id: &str,
        entity: &'static str,
    ) -> Result<(), ServiceError>
    where
        S: Collection<R>,
    {
        let id = parse_id(raw_id, entity)?;
        if !self.collection::<R>().remove(&id).await? {
            return Err(ServiceError::NotFound(R::LABEL));
        }
        debug!(collection = R::COLLECTION, %id, "record deleted");
        Ok(())
    }

    async fn replace_record<R: Record>(&self, record: R) -> Result<R, ServiceError>
    where
        S: Collection<R>,
    {
        self.collection::<R>()
            .replace(record)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => ServiceError::NotFound(R::LABEL),
                other => ServiceError::Store(other),
            })
    }

    pub async fn create_property(&self, payload: NewProperty) -> Result<Property, ServiceError> {
        let owner_id = parse_id(&payload.owner_id, "owner")?;
        let property = payload.into_property(owner_id, domain::now());
        property.validate()?;
        let stored = self.collection::<Property>().insert(property).await?;
        debug!(property_id = %stored.id, "property listed");
        Ok(stored)
    }

    pub async fn list_properties(
        &self,
        params: PropertyListParams,
    ) -> Result<Vec<Property>, ServiceError> {
        let (filter, page) = params.resolve()?;
        Ok(self.collection::<Property>().find(&filter, page).await?)
    }

    pub async fn search_properties(
        &self,
        params: PropertySearchParams,
    ) -> Result<Vec<Property>, ServiceError> {
        let (search, page) = params.resolve()?;
        Ok(self.store.search(&search, page).await?)
    }

    pub async fn get_property(&self, property_id: &str) -> Result<Property, ServiceError> {
        self.get_record(property_id, "property").await
    }

    pub async fn update_property(
        &self,
        property_id: &str,
        patch: PropertyPatch,
    ) -> Result<Property, ServiceError> {
        let id = parse_id(property_id, "property")?;
        if patch.is_empty() {
            return Err(ServiceError::NoFieldsToUpdate);
        }
        let mut property: Property = self.require(&id, Property::LABEL).await?;
        patch.apply(&mut property);
        property.validate()?;
        self.replace_record(property).await
    }

    pub async fn delete_property(&self, property_id: &str) -> Result<(), ServiceError> {
        self.delete_record::<Property>(property_id, "property").await
    }

    pub async fn properties_by_owner(&self, owner_id: &str) -> Result<Vec<Property>, ServiceError> {
        let filter = PropertyFilter {
            owner_id: Some(parse_id(owner_id, "owner")?),
            ..PropertyFilter::default()
        };
        Ok(self
            .collection::<Property>()
            .find(&filter, Page::first_hundred())
            .await?)
    }

    pub async fn register_user(&self, payload: NewUser) -> Result<UserView, ServiceError> {
        require_text("name", &payload.name)?;
        require_text("password", &payload.password)?;
        let email = normalize_email(&payload.email)?;

        let taken = UserFilter {
            email: Some(email.clone()),
            ..UserFilter::default()
        };
        if self.collection::<User>().find_one(&taken).await?.is_some() {
            return Err(ServiceError::Conflict(EMAIL_TAKEN));
        }

        let user = User {
            id: DocumentId::generate(),
            name: payload.name,
            email,
            phone: payload.phone,
            user_type: payload.user_type,
            password_hash: hash_password(&payload.password),
            created_at: domain::now(),
        };
        let stored = self
            .collection::<User>()
            .insert(user)
            .await
            .map_err(conflict_as(EMAIL_TAKEN))?;
        debug!(user_id = %stored.id, user_type = stored.user_type.label(), "user registered");
        Ok(stored.view())
    }

    pub async fn list_users(&self, params: UserListParams) -> Result<Vec<UserView>, ServiceError> {
        let page = Page::new(params.skip, params.limit)?;
        let filter = UserFilter {
            user_type: params.user_type,
            email: None,
        };
        let users = self.collection::<User>().find(&filter, page).await?;
        Ok(users.iter().map(User::view).collect())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserView, ServiceError> {
        let user: User = self.get_record(user_id, "user").await?;
        Ok(user.view())
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        mut patch: UserPatch,
    ) -> Result<UserView, ServiceError> {
        let id = parse_id(user_id, "user")?;
        if patch.is_empty() {
            return Err(ServiceError::NoFieldsToUpdate);
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(raw) = patch.email.take() {
            let email = normalize_email(&raw)?;
            let taken = UserFilter {
                email: Some(email.clone()),
                ..UserFilter::default()
            };
            if let Some(owner) = self.collection::<User>().find_one(&taken).await? {
                if owner.id != id {
                    return Err(ServiceError::Conflict(EMAIL_TAKEN));
                }
            }
            patch.email = Some(email);
        }

        let mut user: User = self.require(&id, User::LABEL).await?;
        patch.apply(&mut user);
        let stored = self
            .collection::<User>()
            .replace(user)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => ServiceError::NotFound(User::LABEL),
                other => conflict_as(EMAIL_TAKEN)(other),
            })?;
        Ok(stored.view())
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), ServiceError> {
        self.delete_record::<User>(user_id, "user").await
    }

    pub async fn create_review(&self, payload: NewReview) -> Result<Review, ServiceError> {
        validate_rating(payload.rating)?;
        let property_id = parse_id(&payload.property_id, "property")?;
        self.require::<Property>(&property_id, Property::LABEL)
            .await?;
        let user_id = parse_id(&payload.user_id, "user")?;
        self.require::<User>(&user_id, User::LABEL).await?;

        let review = Review {
            id: DocumentId::generate(),
            property_id,
            user_id,
            rating: payload.rating,
            comment: payload.comment,
            created_at: domain::now(),
        };
        Ok(self.collection::<Review>().insert(review).await?)
    }

    pub async fn list_reviews(&self, params: ReviewListParams) -> Result<Vec<Review>, ServiceError> {
        let page = Page::new(params.skip, params.limit)?;
        let filter = ReviewFilter {
            property_id: parse_optional_id(params.property_id, "property")?,
            user_id: parse_optional_id(params.user_id, "user")?,
        };
        Ok(self.collection::<Review>().find(&filter, page).await?)
    }

    pub async fn get_review(&self, review_id: &str) -> Result<Review, ServiceError> {
        self.get_record(review_id, "review").await
    }

    pub async fn update_review(
        &self,
        review_id: &str,
        patch: ReviewPatch,
    ) -> Result<Review, ServiceError> {
        let id = parse_id(review_id, "review")?;
        if patch.is_empty() {
            return Err(ServiceError::NoFieldsToUpdate);
        }
        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
        }
        let mut review: Review = self.require(&id, Review::LABEL).await?;
        patch.apply(&mut review);
        self.replace_record(review).await
    }

    pub async fn delete_review(&self, review_id: &str) -> Result<(), ServiceError> {
        self.delete_record::<Review>(review_id, "review").await
    }

    pub async fn reviews_for_property(&self, property_id: &str) -> Result<Vec<Review>, ServiceError> {
        let filter = ReviewFilter {
            property_id: Some(parse_id(property_id, "property")?),
            user_id: None,
        };
        Ok(self
            .collection::<Review>()
            .find(&filter, Page::first_hundred())
            .await?)
    }

    pub async fn create_inquiry(&self, payload: NewInquiry) -> Result<Inquiry, ServiceError> {
        require_text("message", &payload.message)?;
        let property_id = parse_id(&payload.property_id, "property")?;
        self.require::<Property>(&property_id, Property::LABEL)
            .await?;
        let user_id = parse_id(&payload.user_id, "user")?;
        self.require::<User>(&user_id, User::LABEL).await?;

        let inquiry = Inquiry {
            id: DocumentId::generate(),
            property_id,
            user_id,
            message: payload.message,
            contact_preference: payload.contact_preference,
            status: InquiryStatus::Pending,
            created_at: domain::now(),
        };
        Ok(self.collection::<Inquiry>().insert(inquiry).await?)
    }

    pub async fn list_inquiries(
        &self,
        params: InquiryListParams,
    ) -> Result<Vec<Inquiry>, ServiceError> {
        let page = Page::new(params.skip, params.limit)?;
        let filter = InquiryFilter {
            property_id: parse_optional_id(params.property_id, "property")?,
            user_id: parse_optional_id(params.user_id, "user")?,
            status: params.status,
        };
        Ok(self.collection::<Inquiry>().find(&filter, page).await?)
    }

    pub async fn get_inquiry(&self, inquiry_id: &str) -> Result<Inquiry, ServiceError> {
        self.get_record(inquiry_id, "inquiry").await
    }

    pub async fn update_inquiry(
        &self,
        inquiry_id: &str,
        patch: InquiryPatch,
    ) -> Result<Inquiry, ServiceError> {
        let id = parse_id(inquiry_id, "inquiry")?;
        if patch.is_empty() {
            return Err(ServiceError::NoFieldsToUpdate);
        }
        let mut inquiry: Inquiry = self.require(&id, Inquiry::LABEL).await?;
        patch.apply(&mut inquiry);
        self.replace_record(inquiry).await
    }

    pub async fn delete_inquiry(&self, inquiry_id: &str) -> Result<(), ServiceError> {
        self.delete_record::<Inquiry>(inquiry_id, "inquiry").await
    }

    pub async fn add_favorite(&self, payload: NewFavorite) -> Result<Favorite, ServiceError> {
        let property_id = parse_id(&payload.property_id, "property")?;
        self.require::<Property>(&property_id, Property::LABEL)
            .await?;
        let user_id = parse_id(&payload.user_id, "user")?;
        self.require::<User>(&user_id, User::LABEL).await?;

        let existing = FavoriteFilter {
            user_id: Some(user_id.clone()),
            property_id: Some(property_id.clone()),
        };
        if self
            .collection::<Favorite>()
            .find_one(&existing)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(ALREADY_FAVORITE));
        }

        let favorite = Favorite {
            id: DocumentId::generate(),
            user_id,
            property_id,
            created_at: domain::now(),
        };
        self.collection::<Favorite>()
            .insert(favorite)
            .await
            .map_err(conflict_as(ALREADY_FAVORITE))
    }

    pub async fn favorites_for_user(&self, user_id: &str) -> Result<Vec<Favorite>, ServiceError> {
        let filter = FavoriteFilter {
            user_id: Some(parse_id(user_id, "user")?),
            property_id: None,
        };
        Ok(self
            .collection::<Favorite>()
            .find(&filter, Page::first_hundred())
            .await?)
    }

    pub async fn get_favorite(&self, favorite_id: &str) -> Result<Favorite, ServiceError> {
        self.get_record(favorite_id, "favorite").await
    }

    pub async fn delete_favorite(&self, favorite_id: &str) -> Result<(), ServiceError> {
        self.delete_record::<Favorite>(favorite_id, "favorite").await
    }

    /// Remove by the `(user, property)` pair rather than the favorite's own id.
    pub async fn remove_favorite(
        &self,
        user_id: &str,
        property_id: &str,
    ) -> Result<(), ServiceError> {
        let filter = FavoriteFilter {
            user_id: Some(parse_id(user_id, "user")?),
            property_id: Some(parse_id(property_id, "property")?),
        };
        if !self
            .collection::<Favorite>()
            .remove_matching(&filter)
            .await?
        {
            return Err(ServiceError::NotFound(Favorite::LABEL));
        }
        Ok(())
    }

    pub async fn create_transaction(
        &self,
        payload: NewTransaction,
    ) -> Result<Transaction, ServiceError> {
        let property_id = parse_id(&payload.property_id, "property")?;
        self.require::<Property>(&property_id, Property::LABEL)
            .await?;
        let buyer_id = parse_id(&payload.buyer_id, "buyer")?;
        self.require::<User>(&buyer_id, "Buyer").await?;
        let seller_id = parse_id(&payload.seller_id, "seller")?;
        self.require::<User>(&seller_id, "Seller").await?;

        let created_at = domain::now();
        let mut transaction = Transaction {
            id: DocumentId::generate(),
            property_id,
            buyer_id,
            seller_id,
            transaction_type: payload.transaction_type,
            amount: payload.amount,
            status: TransactionStatus::default(),
            created_at,
            completed_at: None,
        };
        transaction.set_status(payload.status, created_at);
        transaction.validate()?;

        let stored = self.collection::<Transaction>().insert(transaction).await?;
        debug!(
            transaction_id = %stored.id,
            status = stored.status.label(),
            "transaction recorded"
        );
        Ok(stored)
    }

    pub async fn list_transactions(
        &self,
        params: TransactionListParams,
    ) -> Result<Vec<Transaction>, ServiceError> {
        let page = Page::new(params.skip, params.limit)?;
        let filter = TransactionFilter {
            property_id: parse_optional_id(params.property_id, "property")?,
            buyer_id: parse_optional_id(params.buyer_id, "buyer")?,
            seller_id: parse_optional_id(params.seller_id, "seller")?,
            status: params.status,
        };
        Ok(self.collection::<Transaction>().find(&filter, page).await?)
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Transaction, ServiceError> {
        self.get_record(transaction_id, "transaction").await
    }

    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        patch: TransactionPatch,
    ) -> Result<Transaction, ServiceError> {
        let id = parse_id(transaction_id, "transaction")?;
        if patch.is_empty() {
            return Err(ServiceError::NoFieldsToUpdate);
        }
        let mut transaction: Transaction = self.require(&id, Transaction::LABEL).await?;
        patch.apply(&mut transaction, domain::now());
        transaction.validate()?;
        self.replace_record(transaction).await
    }

    pub async fn delete_transaction(&self, transaction_id: &str) -> Result<(), ServiceError> {
        self.delete_record::<Transaction>(transaction_id, "transaction")
            .await
    }

    pub async fn filter_screen(
        &self,
        params: FacetParams,
    ) -> Result<FilterScreenOptions, ServiceError> {
        let facets = self.store.facets(params.transaction_type).await?;
        Ok(FilterScreenOptions::from(facets))
    }
}
