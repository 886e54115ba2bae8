use std::sync::Arc;

use super::common::*;
use crate::marketplace::domain::{
    ContactPreference, DocumentId, Furnishing, InquiryPatch, InquiryStatus, NewFavorite,
    NewInquiry, NewReview, NewTransaction, PropertyPatch, ReviewPatch, TransactionPatch,
    TransactionStatus, TransactionType, UserPatch, UserType,
};
use crate::marketplace::query::{
    FacetParams, InquiryListParams, PropertyListParams, PropertySearchParams, UserListParams,
};
use crate::marketplace::store::StoreError;
use crate::marketplace::{MarketplaceService, ServiceError, ValueRange};

#[tokio::test]
async fn register_lowercases_email_and_rejects_duplicates() {
    let service = build_service();
    let user = service
        .register_user(new_user("Priya@Hunt.Example", UserType::Buyer))
        .await
        .expect("user registers");
    assert_eq!(user.email, "priya@hunt.example");

    match service
        .register_user(new_user("PRIYA@hunt.example", UserType::Agent))
        .await
    {
        Err(ServiceError::Conflict(message)) => assert_eq!(message, "Email already registered"),
        other => panic!("expected email conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn register_validates_email_and_password() {
    let service = build_service();
    let mut payload = new_user("not-an-email", UserType::Buyer);
    assert!(matches!(
        service.register_user(payload.clone()).await,
        Err(ServiceError::Validation(err)) if err.field == "email"
    ));

    payload.email = "valid@hunt.example".to_string();
    payload.password = "  ".to_string();
    assert!(matches!(
        service.register_user(payload).await,
        Err(ServiceError::Validation(err)) if err.field == "password"
    ));
}

#[tokio::test]
async fn update_user_guards_email_ownership() {
    let service = build_service();
    let first = service
        .register_user(new_user("first@hunt.example", UserType::Buyer))
        .await
        .expect("first registers");
    service
        .register_user(new_user("second@hunt.example", UserType::Buyer))
        .await
        .expect("second registers");

    let steal = UserPatch {
        email: Some("Second@hunt.example".to_string()),
        ..UserPatch::default()
    };
    assert!(matches!(
        service.update_user(first.id.as_str(), steal).await,
        Err(ServiceError::Conflict(_))
    ));

    let keep = UserPatch {
        email: Some("FIRST@hunt.example".to_string()),
        name: Some("Priya R".to_string()),
        ..UserPatch::default()
    };
    let updated = service
        .update_user(first.id.as_str(), keep)
        .await
        .expect("own email may be resubmitted");
    assert_eq!(updated.email, "first@hunt.example");
    assert_eq!(updated.name, "Priya R");
}

#[tokio::test]
async fn updates_check_id_before_emptiness_and_existence() {
    let service = build_service();
    assert!(matches!(
        service
            .update_property("nope", PropertyPatch::default())
            .await,
        Err(ServiceError::InvalidId("property"))
    ));

    let missing = DocumentId::generate();
    assert!(matches!(
        service
            .update_property(missing.as_str(), PropertyPatch::default())
            .await,
        Err(ServiceError::NoFieldsToUpdate)
    ));

    let patch = PropertyPatch {
        price: Some(1.0),
        ..PropertyPatch::default()
    };
    assert!(matches!(
        service.update_property(missing.as_str(), patch).await,
        Err(ServiceError::NotFound("Property"))
    ));
}

#[tokio::test]
async fn create_property_validates_owner_and_fields() {
    let service = build_service();
    let owner = seed_owner(&service).await;

    let mut payload = new_property(&owner.id, "Bad owner", 10_000.0);
    payload.owner_id = "owner-1".to_string();
    assert!(matches!(
        service.create_property(payload).await,
        Err(ServiceError::InvalidId("owner"))
    ));

    let payload = new_property(&owner.id, "Negative", -5.0);
    assert!(matches!(
        service.create_property(payload).await,
        Err(ServiceError::Validation(err)) if err.field == "price"
    ));

    let mut payload = new_property(&owner.id, "Too many sides", 5.0);
    payload.open_sides = Some(5);
    assert!(service.create_property(payload).await.is_err());
}

#[tokio::test]
async fn update_property_applies_partial_patch() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let property = seed_property(&service, new_property(&owner.id, "Egmore 2BHK", 22_000.0)).await;

    let patch = PropertyPatch {
        price: Some(21_000.0),
        furnishing: Some(Furnishing::Furnished),
        ..PropertyPatch::default()
    };
    let updated = service
        .update_property(property.id.as_str(), patch)
        .await
        .expect("update succeeds");
    assert_eq!(updated.price, 21_000.0);
    assert_eq!(updated.furnishing, Furnishing::Furnished);
    assert_eq!(updated.title, "Egmore 2BHK");
    assert_eq!(updated.posted_at, property.posted_at);
}

#[tokio::test]
async fn list_properties_filters_and_orders_newest_first() {
    let service = build_service();
    let owner = seed_owner(&service).await;

    let mut cheap = new_property(&owner.id, "Cheap studio", 9_000.0);
    cheap.bedrooms = 1;
    seed_property(&service, cheap).await;
    seed_property(&service, new_property(&owner.id, "Mid flat", 15_000.0)).await;
    let mut pune = new_property(&owner.id, "Pune flat", 25_000.0);
    pune.bedrooms = 3;
    pune.location = location("Pune", "Kothrud", 73.8077, 18.5074);
    seed_property(&service, pune).await;

    let inclusive = service
        .list_properties(PropertyListParams {
            min_price: Some(9_000.0),
            max_price: Some(15_000.0),
            ..PropertyListParams::default()
        })
        .await
        .expect("list succeeds");
    let titles: Vec<&str> = inclusive.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Mid flat", "Cheap studio"]);

    let roomy = service
        .list_properties(PropertyListParams {
            min_bedrooms: Some(2),
            city: Some("CHEN".to_string()),
            ..PropertyListParams::default()
        })
        .await
        .expect("list succeeds");
    assert_eq!(roomy.len(), 1);
    assert_eq!(roomy[0].title, "Mid flat");

    let window = service
        .list_properties(PropertyListParams {
            skip: Some(1),
            limit: Some(1),
            ..PropertyListParams::default()
        })
        .await
        .expect("list succeeds");
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].title, "Mid flat");
}

#[tokio::test]
async fn search_matches_any_term_and_orders_by_distance() {
    let service = build_service();
    let owner = seed_owner(&service).await;

    let mut near = new_property(&owner.id, "Sea view apartment", 30_000.0);
    near.description = "Spacious flat near the beach".to_string();
    near.location = location("Chennai", "Park Town", 80.2750, 13.0850);
    let mut farther = new_property(&owner.id, "Garden villa", 45_000.0);
    farther.description = "Independent house with lawn".to_string();
    farther.location = location("Chennai", "Kilpauk", 80.2500, 13.0500);
    let mut remote = new_property(&owner.id, "Hill villa", 50_000.0);
    remote.location = location("Pune", "Kothrud", 73.8077, 18.5074);

    seed_property(&service, farther).await;
    seed_property(&service, remote).await;
    seed_property(&service, near).await;

    let by_text = service
        .search_properties(PropertySearchParams {
            text: Some("villa BEACH".to_string()),
            ..PropertySearchParams::default()
        })
        .await
        .expect("search succeeds");
    let titles: Vec<&str> = by_text.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Sea view apartment", "Hill villa", "Garden villa"]);

    let by_distance = service
        .search_properties(PropertySearchParams {
            longitude: Some(CHENNAI_CENTRAL.0),
            latitude: Some(CHENNAI_CENTRAL.1),
            max_distance: Some(5_000.0),
            ..PropertySearchParams::default()
        })
        .await
        .expect("search succeeds");
    let titles: Vec<&str> = by_distance.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Sea view apartment", "Garden villa"]);

    let tight = service
        .search_properties(PropertySearchParams {
            longitude: Some(CHENNAI_CENTRAL.0),
            latitude: Some(CHENNAI_CENTRAL.1),
            max_distance: Some(1_000.0),
            ..PropertySearchParams::default()
        })
        .await
        .expect("search succeeds");
    assert_eq!(tight.len(), 1);

    let combined = service
        .search_properties(PropertySearchParams {
            text: Some("villa".to_string()),
            longitude: Some(CHENNAI_CENTRAL.0),
            latitude: Some(CHENNAI_CENTRAL.1),
            max_distance: Some(5_000.0),
            ..PropertySearchParams::default()
        })
        .await
        .expect("search succeeds");
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].title, "Garden villa");
}

#[tokio::test]
async fn search_rejects_half_specified_coordinates() {
    let service = build_service();
    let result = service
        .search_properties(PropertySearchParams {
            latitude: Some(13.0),
            ..PropertySearchParams::default()
        })
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn owner_listing_is_scoped_to_owner() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let other = service
        .register_user(new_user("other@hunt.example", UserType::Agent))
        .await
        .expect("agent registers");
    seed_property(&service, new_property(&owner.id, "Owner listing", 10.0)).await;
    seed_property(&service, new_property(&other.id, "Agent listing", 10.0)).await;

    let listed = service
        .properties_by_owner(owner.id.as_str())
        .await
        .expect("owner listing");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].owner_id, owner.id);
    assert!(matches!(
        service.properties_by_owner("xyz").await,
        Err(ServiceError::InvalidId("owner"))
    ));
}

#[tokio::test]
async fn users_can_be_filtered_by_type() {
    let service = build_service();
    seed_owner(&service).await;
    service
        .register_user(new_user("buyer@hunt.example", UserType::Buyer))
        .await
        .expect("buyer registers");

    let owners = service
        .list_users(UserListParams {
            user_type: Some(UserType::Owner),
            ..UserListParams::default()
        })
        .await
        .expect("list users");
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].user_type, UserType::Owner);
}

#[tokio::test]
async fn reviews_require_existing_parents_and_valid_rating() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let property = seed_property(&service, new_property(&owner.id, "Reviewed", 10.0)).await;

    let review = NewReview {
        property_id: property.id.to_string(),
        user_id: owner.id.to_string(),
        rating: 6,
        comment: "Great light".to_string(),
    };
    assert!(matches!(
        service.create_review(review.clone()).await,
        Err(ServiceError::Validation(err)) if err.field == "rating"
    ));

    let orphan = NewReview {
        property_id: DocumentId::generate().to_string(),
        rating: 4,
        ..review.clone()
    };
    assert!(matches!(
        service.create_review(orphan).await,
        Err(ServiceError::NotFound("Property"))
    ));

    let stored = service
        .create_review(NewReview { rating: 4, ..review })
        .await
        .expect("review stored");
    let updated = service
        .update_review(
            stored.id.as_str(),
            ReviewPatch {
                rating: Some(5),
                comment: None,
            },
        )
        .await
        .expect("review updated");
    assert_eq!(updated.rating, 5);
    assert_eq!(updated.comment, "Great light");

    let for_property = service
        .reviews_for_property(property.id.as_str())
        .await
        .expect("reviews listed");
    assert_eq!(for_property.len(), 1);
}

#[tokio::test]
async fn inquiries_start_pending_and_filter_by_status() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let property = seed_property(&service, new_property(&owner.id, "Asked about", 10.0)).await;

    let inquiry = service
        .create_inquiry(NewInquiry {
            property_id: property.id.to_string(),
            user_id: owner.id.to_string(),
            message: "Is parking available?".to_string(),
            contact_preference: ContactPreference::Phone,
        })
        .await
        .expect("inquiry stored");
    assert_eq!(inquiry.status, InquiryStatus::Pending);

    service
        .update_inquiry(
            inquiry.id.as_str(),
            InquiryPatch {
                status: Some(InquiryStatus::Responded),
                ..InquiryPatch::default()
            },
        )
        .await
        .expect("inquiry updated");

    let pending = service
        .list_inquiries(InquiryListParams {
            status: Some(InquiryStatus::Pending),
            ..InquiryListParams::default()
        })
        .await
        .expect("list inquiries");
    assert!(pending.is_empty());

    let by_property = service
        .list_inquiries(InquiryListParams {
            property_id: Some(property.id.to_string()),
            ..InquiryListParams::default()
        })
        .await
        .expect("list inquiries");
    assert_eq!(by_property.len(), 1);

    assert!(matches!(
        service
            .list_inquiries(InquiryListParams {
                user_id: Some("bogus".to_string()),
                ..InquiryListParams::default()
            })
            .await,
        Err(ServiceError::InvalidId("user"))
    ));
}

#[tokio::test]
async fn favorites_are_unique_per_user_and_property() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let property = seed_property(&service, new_property(&owner.id, "Loved", 10.0)).await;
    let payload = NewFavorite {
        user_id: owner.id.to_string(),
        property_id: property.id.to_string(),
    };

    service
        .add_favorite(payload.clone())
        .await
        .expect("first favorite");
    match service.add_favorite(payload).await {
        Err(ServiceError::Conflict(message)) => {
            assert_eq!(message, "Property already in favorites")
        }
        other => panic!("expected duplicate favorite conflict, got {other:?}"),
    }

    service
        .remove_favorite(owner.id.as_str(), property.id.as_str())
        .await
        .expect("favorite removed");
    assert!(matches!(
        service
            .remove_favorite(owner.id.as_str(), property.id.as_str())
            .await,
        Err(ServiceError::NotFound("Favorite"))
    ));
    assert!(service
        .favorites_for_user(owner.id.as_str())
        .await
        .expect("favorites listed")
        .is_empty());
}

#[tokio::test]
async fn transactions_check_parties_and_stamp_completion() {
    let service = build_service();
    let seller = seed_owner(&service).await;
    let buyer = service
        .register_user(new_user("buyer@hunt.example", UserType::Buyer))
        .await
        .expect("buyer registers");
    let property = seed_property(&service, new_property(&seller.id, "For sale", 10.0)).await;

    let mut payload = NewTransaction {
        property_id: property.id.to_string(),
        buyer_id: DocumentId::generate().to_string(),
        seller_id: seller.id.to_string(),
        transaction_type: TransactionType::Sale,
        amount: 7_500_000.0,
        status: TransactionStatus::Pending,
    };
    assert!(matches!(
        service.create_transaction(payload.clone()).await,
        Err(ServiceError::NotFound("Buyer"))
    ));

    payload.buyer_id = buyer.id.to_string();
    let pending = service
        .create_transaction(payload.clone())
        .await
        .expect("transaction recorded");
    assert!(pending.completed_at.is_none());

    let completed = service
        .update_transaction(
            pending.id.as_str(),
            TransactionPatch {
                status: Some(TransactionStatus::Completed),
                amount: None,
            },
        )
        .await
        .expect("transaction completed");
    assert!(completed.completed_at.is_some());

    payload.status = TransactionStatus::Completed;
    let born_complete = service
        .create_transaction(payload)
        .await
        .expect("completed on creation");
    assert_eq!(born_complete.completed_at, Some(born_complete.created_at));
}

#[tokio::test]
async fn parents_are_checked_one_at_a_time() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let missing_property = DocumentId::generate().to_string();

    let transaction = NewTransaction {
        property_id: missing_property.clone(),
        buyer_id: "not-a-buyer".to_string(),
        seller_id: "not-a-seller".to_string(),
        transaction_type: TransactionType::Sale,
        amount: 1_000.0,
        status: TransactionStatus::Pending,
    };
    assert!(matches!(
        service.create_transaction(transaction).await,
        Err(ServiceError::NotFound("Property"))
    ));

    let favorite = NewFavorite {
        user_id: "not-a-user".to_string(),
        property_id: missing_property.clone(),
    };
    assert!(matches!(
        service.add_favorite(favorite).await,
        Err(ServiceError::NotFound("Property"))
    ));

    let inquiry = NewInquiry {
        property_id: missing_property.clone(),
        user_id: "not-a-user".to_string(),
        message: "Still available?".to_string(),
        contact_preference: ContactPreference::Email,
    };
    assert!(matches!(
        service.create_inquiry(inquiry).await,
        Err(ServiceError::NotFound("Property"))
    ));

    let property = seed_property(&service, new_property(&owner.id, "Listed", 10.0)).await;
    let review = NewReview {
        property_id: property.id.to_string(),
        user_id: "not-a-user".to_string(),
        rating: 5,
        comment: "Quiet street".to_string(),
    };
    assert!(matches!(
        service.create_review(review).await,
        Err(ServiceError::InvalidId("user"))
    ));
}

#[tokio::test]
async fn filter_screen_collects_catalogue_facets() {
    let service = build_service();
    let owner = seed_owner(&service).await;
    let mut sale = new_property(&owner.id, "Sale home", 8_500_000.0);
    sale.transaction_type = TransactionType::Sale;
    sale.area_sqft = 1_800.0;
    seed_property(&service, sale).await;
    seed_property(&service, new_property(&owner.id, "Rental", 18_000.0)).await;

    let all = service
        .filter_screen(FacetParams::default())
        .await
        .expect("facets");
    assert_eq!(all.transaction_types, vec!["rent", "sale"]);
    assert_eq!(
        all.price_range,
        ValueRange {
            min: 18_000.0,
            max: 8_500_000.0
        }
    );
    assert_eq!(all.furnishing_options, vec!["semi-furnished"]);

    let rentals = service
        .filter_screen(FacetParams {
            transaction_type: Some(TransactionType::Rent),
        })
        .await
        .expect("facets");
    assert_eq!(rentals.transaction_types, vec!["rent"]);
    assert_eq!(rentals.area_range.max, 1_050.0);
}

#[tokio::test]
async fn store_outages_surface_as_store_errors() {
    let service = MarketplaceService::new(Arc::new(UnavailableStore));
    assert!(matches!(
        service.get_user(DocumentId::generate().as_str()).await,
        Err(ServiceError::Store(StoreError::Unavailable(_)))
    ));
}
