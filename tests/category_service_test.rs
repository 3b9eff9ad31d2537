mod common;

use catalog_cms_api::{
    entities::{category, product, Category, Product},
    errors::ServiceError,
    services::categories::{CreateCategoryInput, UpdateCategoryInput, UNCATEGORIZED_SLUG},
};
use chrono::Utc;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

fn create_input(name: &str, slug: &str, parent_id: Option<Uuid>) -> CreateCategoryInput {
    CreateCategoryInput {
        name: name.to_string(),
        description: None,
        slug: slug.to_string(),
        parent_id,
        active: true,
    }
}

fn deactivate() -> UpdateCategoryInput {
    UpdateCategoryInput {
        active: Some(false),
        ..Default::default()
    }
}

/// Insert a product row directly; category service tests only care about its
/// category reference.
async fn seed_product(app: &TestApp, category_id: Uuid, sku: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let model = product::ActiveModel {
        id: Set(id),
        name: Set(format!("Product {sku}")),
        detailed_description: Set("Test product".to_string()),
        category_id: Set(category_id),
        price: Set(dec!(10.00)),
        promotional_price: Set(None),
        sku: Set(sku.to_string()),
        ean_upc: Set(None),
        sizes: Set(serde_json::json!(["M"])),
        colors: Set(serde_json::json!(["black"])),
        images: Set(serde_json::json!(["https://cdn.example.com/p.jpg"])),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model
        .insert(&*app.state.db)
        .await
        .expect("failed to seed product");
    id
}

async fn category_row(app: &TestApp, id: Uuid) -> Option<category::Model> {
    Category::find_by_id(id)
        .one(&*app.state.db)
        .await
        .expect("query failed")
}

async fn product_row(app: &TestApp, id: Uuid) -> product::Model {
    Product::find_by_id(id)
        .one(&*app.state.db)
        .await
        .expect("query failed")
        .expect("product missing")
}

async fn sentinel(app: &TestApp) -> category::Model {
    Category::find()
        .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
        .one(&*app.state.db)
        .await
        .expect("query failed")
        .expect("sentinel category missing")
}

#[tokio::test]
async fn create_rejects_duplicate_slug() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    svc.create(create_input("Shirts", "shirts", None))
        .await
        .unwrap();

    let err = svc
        .create(create_input("Other Shirts", "shirts", None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn create_rejects_missing_parent() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let err = svc
        .create(create_input("Orphan", "orphan", Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn create_rejects_inactive_parent() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let parent = svc
        .create(create_input("Parent", "parent", None))
        .await
        .unwrap();
    svc.update(parent.category.id, deactivate()).await.unwrap();

    let err = svc
        .create(create_input("Child", "child", Some(parent.category.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn create_below_third_level_fails_with_max_depth() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let root = svc.create(create_input("Root", "root", None)).await.unwrap();
    let mid = svc
        .create(create_input("Mid", "mid", Some(root.category.id)))
        .await
        .unwrap();
    let leaf = svc
        .create(create_input("Leaf", "leaf", Some(mid.category.id)))
        .await
        .unwrap();

    assert_eq!(svc.depth(root.category.id).await.unwrap(), 0);
    assert_eq!(svc.depth(mid.category.id).await.unwrap(), 1);
    assert_eq!(svc.depth(leaf.category.id).await.unwrap(), 2);

    let err = svc
        .create(create_input("Too Deep", "too-deep", Some(leaf.category.id)))
        .await
        .unwrap_err();
    match err {
        ServiceError::ValidationError(msg) => {
            assert!(msg.contains("Maximum category depth"), "got: {msg}")
        }
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[tokio::test]
async fn update_rejects_self_parenting() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let cat = svc.create(create_input("Solo", "solo", None)).await.unwrap();

    let err = svc
        .update(
            cat.category.id,
            UpdateCategoryInput {
                parent_id: Some(Some(cat.category.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn update_rejects_circular_reference() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let a = svc.create(create_input("A", "a", None)).await.unwrap();
    let b = svc
        .create(create_input("B", "b", Some(a.category.id)))
        .await
        .unwrap();
    let c = svc
        .create(create_input("C", "c", Some(b.category.id)))
        .await
        .unwrap();

    assert!(svc
        .check_circular(a.category.id, c.category.id)
        .await
        .unwrap());
    assert!(!svc
        .check_circular(c.category.id, a.category.id)
        .await
        .unwrap());

    let err = svc
        .update(
            a.category.id,
            UpdateCategoryInput {
                parent_id: Some(Some(c.category.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        ServiceError::ValidationError(msg) => {
            assert!(msg.contains("Circular reference"), "got: {msg}")
        }
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[tokio::test]
async fn update_rejects_slug_collision() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    svc.create(create_input("First", "first", None))
        .await
        .unwrap();
    let second = svc
        .create(create_input("Second", "second", None))
        .await
        .unwrap();

    let err = svc
        .update(
            second.category.id,
            UpdateCategoryInput {
                slug: Some("first".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn deactivation_reassigns_products_to_uncategorized() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let a = svc.create(create_input("A", "a", None)).await.unwrap();
    let b = svc
        .create(create_input("B", "b", Some(a.category.id)))
        .await
        .unwrap();
    let p = seed_product(&app, b.category.id, "SKU-B-1").await;

    let updated = svc.update(b.category.id, deactivate()).await.unwrap();
    assert!(!updated.category.active);

    let uncategorized = sentinel(&app).await;
    assert!(uncategorized.active);
    assert!(uncategorized.parent_id.is_none());
    assert_eq!(product_row(&app, p).await.category_id, uncategorized.id);
}

#[tokio::test]
async fn deactivation_cascades_to_all_descendants() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let root = svc.create(create_input("Root", "root", None)).await.unwrap();
    let mid = svc
        .create(create_input("Mid", "mid", Some(root.category.id)))
        .await
        .unwrap();
    let leaf = svc
        .create(create_input("Leaf", "leaf", Some(mid.category.id)))
        .await
        .unwrap();

    let p_root = seed_product(&app, root.category.id, "SKU-R").await;
    let p_mid = seed_product(&app, mid.category.id, "SKU-M").await;
    let p_leaf = seed_product(&app, leaf.category.id, "SKU-L").await;

    svc.update(root.category.id, deactivate()).await.unwrap();

    for id in [root.category.id, mid.category.id, leaf.category.id] {
        assert!(!category_row(&app, id).await.unwrap().active);
    }

    let uncategorized = sentinel(&app).await;
    for product_id in [p_root, p_mid, p_leaf] {
        assert_eq!(
            product_row(&app, product_id).await.category_id,
            uncategorized.id
        );
    }
}

#[tokio::test]
async fn activating_under_inactive_parent_fails() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let parent = svc
        .create(create_input("Parent", "parent", None))
        .await
        .unwrap();
    let child = svc
        .create(create_input("Child", "child", Some(parent.category.id)))
        .await
        .unwrap();

    svc.update(parent.category.id, deactivate()).await.unwrap();
    assert!(!category_row(&app, child.category.id).await.unwrap().active);

    let err = svc
        .update(
            child.category.id,
            UpdateCategoryInput {
                active: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn deactivating_already_inactive_category_is_a_noop() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let cat = svc.create(create_input("Once", "once", None)).await.unwrap();
    svc.update(cat.category.id, deactivate()).await.unwrap();

    // No products were ever attached, so no sentinel exists; a second
    // deactivation must not create one either.
    let again = svc.update(cat.category.id, deactivate()).await.unwrap();
    assert!(!again.category.active);

    let sentinel_count = Category::find()
        .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(sentinel_count, 0);
}

#[tokio::test]
async fn remove_deletes_subtree_and_reassigns_products() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let a = svc.create(create_input("A", "a", None)).await.unwrap();
    let b = svc
        .create(create_input("B", "b", Some(a.category.id)))
        .await
        .unwrap();
    let c = svc
        .create(create_input("C", "c", Some(a.category.id)))
        .await
        .unwrap();

    let p_a = seed_product(&app, a.category.id, "SKU-A").await;
    let p_b = seed_product(&app, b.category.id, "SKU-B").await;

    svc.remove(a.category.id).await.unwrap();

    for id in [a.category.id, b.category.id, c.category.id] {
        assert!(category_row(&app, id).await.is_none());
    }
    let err = svc.find_one(a.category.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let uncategorized = sentinel(&app).await;
    for product_id in [p_a, p_b] {
        assert_eq!(
            product_row(&app, product_id).await.category_id,
            uncategorized.id
        );
    }
}

#[tokio::test]
async fn remove_missing_category_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .categories
        .remove(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn hierarchy_lists_active_roots_with_nested_children_by_name() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let shirts = svc
        .create(create_input("Shirts", "shirts", None))
        .await
        .unwrap();
    svc.create(create_input("Basics", "basics", Some(shirts.category.id)))
        .await
        .unwrap();
    svc.create(create_input("Prints", "prints", Some(shirts.category.id)))
        .await
        .unwrap();
    svc.create(create_input("Accessories", "accessories", None))
        .await
        .unwrap();
    let hidden = svc
        .create(create_input("Hidden", "hidden", None))
        .await
        .unwrap();
    svc.update(hidden.category.id, deactivate()).await.unwrap();

    let tree = svc.get_hierarchy().await.unwrap();

    let names: Vec<&str> = tree.iter().map(|n| n.category.name.as_str()).collect();
    assert_eq!(names, vec!["Accessories", "Shirts"]);

    let shirts_node = tree
        .iter()
        .find(|n| n.category.name == "Shirts")
        .expect("Shirts root missing");
    let child_names: Vec<&str> = shirts_node
        .children
        .iter()
        .map(|n| n.category.name.as_str())
        .collect();
    assert_eq!(child_names, vec!["Basics", "Prints"]);
}

#[tokio::test]
async fn parent_chain_always_terminates_at_a_root() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let root = svc.create(create_input("Root", "root", None)).await.unwrap();
    let mid = svc
        .create(create_input("Mid", "mid", Some(root.category.id)))
        .await
        .unwrap();
    let leaf = svc
        .create(create_input("Leaf", "leaf", Some(mid.category.id)))
        .await
        .unwrap();

    for id in [root.category.id, mid.category.id, leaf.category.id] {
        let mut current = id;
        let mut steps = 0;
        loop {
            let row = category_row(&app, current).await.expect("row missing");
            match row.parent_id {
                Some(parent_id) => {
                    steps += 1;
                    assert!(steps <= 3, "parent chain did not terminate within 3 steps");
                    current = parent_id;
                }
                None => break,
            }
        }
    }
}

#[tokio::test]
async fn sentinel_is_created_once_across_cascades() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    let a = svc.create(create_input("A", "a", None)).await.unwrap();
    let b = svc.create(create_input("B", "b", None)).await.unwrap();
    seed_product(&app, a.category.id, "SKU-A").await;
    seed_product(&app, b.category.id, "SKU-B").await;

    svc.update(a.category.id, deactivate()).await.unwrap();
    svc.update(b.category.id, deactivate()).await.unwrap();

    let sentinel_count = Category::find()
        .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(sentinel_count, 1);
}

#[tokio::test]
async fn find_all_orders_by_name_and_filters_inactive() {
    let app = TestApp::new().await;
    let svc = &app.state.services.categories;

    svc.create(create_input("Zeta", "zeta", None)).await.unwrap();
    svc.create(create_input("Alpha", "alpha", None))
        .await
        .unwrap();
    let inactive = svc.create(create_input("Mid", "mid", None)).await.unwrap();
    svc.update(inactive.category.id, deactivate()).await.unwrap();

    let active_only = svc.find_all(false).await.unwrap();
    let names: Vec<&str> = active_only
        .iter()
        .map(|c| c.category.name.as_str())
        .collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);

    let all = svc.find_all(true).await.unwrap();
    assert_eq!(all.len(), 3);
}
