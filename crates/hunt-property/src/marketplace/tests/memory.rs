use chrono::{Duration, TimeZone, Utc};

use crate::marketplace::domain::{hash_password, DocumentId, Favorite, User, UserType};
use crate::marketplace::memory::InMemoryStore;
use crate::marketplace::query::{FavoriteFilter, Page, UserFilter};
use crate::marketplace::store::{Collection, StoreError};

fn user(email: &str, minutes: i64) -> User {
    let epoch = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    User {
        id: DocumentId::generate(),
        name: "Arjun".to_string(),
        email: email.to_string(),
        phone: "+919000000000".to_string(),
        user_type: UserType::Buyer,
        password_hash: hash_password("pw"),
        created_at: epoch + Duration::minutes(minutes),
    }
}

#[tokio::test]
async fn insert_rejects_duplicate_unique_key_ignoring_case() {
    let store = InMemoryStore::new();
    Collection::<User>::insert(&store, user("a@hunt.example", 0))
        .await
        .expect("first insert");
    let err = Collection::<User>::insert(&store, user("A@HUNT.example", 1))
        .await
        .expect_err("duplicate email");
    assert_eq!(err, StoreError::Conflict);
}

#[tokio::test]
async fn replace_requires_existing_record_and_keeps_keys_unique() {
    let store = InMemoryStore::new();
    let missing = user("ghost@hunt.example", 0);
    assert_eq!(
        Collection::<User>::replace(&store, missing).await,
        Err(StoreError::NotFound)
    );

    let first = Collection::<User>::insert(&store, user("one@hunt.example", 0))
        .await
        .expect("insert one");
    Collection::<User>::insert(&store, user("two@hunt.example", 1))
        .await
        .expect("insert two");

    let mut clash = first.clone();
    clash.email = "two@hunt.example".to_string();
    assert_eq!(
        Collection::<User>::replace(&store, clash).await,
        Err(StoreError::Conflict)
    );

    let mut renamed = first.clone();
    renamed.name = "Arjun K".to_string();
    let stored = Collection::<User>::replace(&store, renamed)
        .await
        .expect("replace succeeds");
    let fetched = Collection::<User>::fetch(&store, &first.id)
        .await
        .expect("fetch")
        .expect("record present");
    assert_eq!(fetched, stored);
}

#[tokio::test]
async fn find_orders_newest_first_and_windows() {
    let store = InMemoryStore::new();
    for (minutes, email) in [(5, "mid@x.io"), (1, "old@x.io"), (9, "new@x.io")] {
        Collection::<User>::insert(&store, user(email, minutes))
            .await
            .expect("insert");
    }

    let all = Collection::<User>::find(&store, &UserFilter::default(), Page::default())
        .await
        .expect("find");
    let emails: Vec<&str> = all.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["new@x.io", "mid@x.io", "old@x.io"]);

    let page = Page::new(Some(1), Some(1)).expect("page");
    let second = Collection::<User>::find(&store, &UserFilter::default(), page)
        .await
        .expect("find");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].email, "mid@x.io");

    let beyond = Page::new(Some(10), None).expect("page");
    assert!(Collection::<User>::find(&store, &UserFilter::default(), beyond)
        .await
        .expect("find")
        .is_empty());
}

#[tokio::test]
async fn remove_matching_deletes_a_single_record() {
    let store = InMemoryStore::new();
    let user_id = DocumentId::generate();
    let property_id = DocumentId::generate();
    let favorite = Favorite {
        id: DocumentId::generate(),
        user_id: user_id.clone(),
        property_id: property_id.clone(),
        created_at: Utc::now(),
    };
    Collection::<Favorite>::insert(&store, favorite.clone())
        .await
        .expect("insert favorite");

    let duplicate = Favorite {
        id: DocumentId::generate(),
        ..favorite.clone()
    };
    assert_eq!(
        Collection::<Favorite>::insert(&store, duplicate).await,
        Err(StoreError::Conflict)
    );

    let filter = FavoriteFilter {
        user_id: Some(user_id),
        property_id: Some(property_id),
    };
    assert_eq!(
        Collection::<Favorite>::remove_matching(&store, &filter).await,
        Ok(true)
    );
    assert_eq!(
        Collection::<Favorite>::remove_matching(&store, &filter).await,
        Ok(false)
    );
    assert_eq!(
        Collection::<Favorite>::remove(&store, &favorite.id).await,
        Ok(false)
    );
}
