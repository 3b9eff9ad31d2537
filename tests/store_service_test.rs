mod common;

use catalog_cms_api::{
    entities::{stock_by_store, StockByStore, StoreType},
    errors::ServiceError,
    services::categories::CreateCategoryInput,
    services::products::{CreateProductInput, StockEntryInput},
    services::stores::{CreateStoreInput, UpdateStoreInput},
};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

fn store_input(name: &str, active: bool) -> CreateStoreInput {
    CreateStoreInput {
        name: name.to_string(),
        store_type: StoreType::Physical,
        full_address: Some("123 Main Street".to_string()),
        opening_hours: Some("Mon-Fri 09:00-18:00".to_string()),
        active,
    }
}

async fn seed_product_with_stock(app: &TestApp, store_id: Uuid, sku: &str, quantity: i32) -> Uuid {
    let category_id = app
        .state
        .services
        .categories
        .create(CreateCategoryInput {
            name: format!("Category {sku}"),
            description: None,
            slug: format!("category-{}", sku.to_lowercase()),
            parent_id: None,
            active: true,
        })
        .await
        .unwrap()
        .category
        .id;

    app.state
        .services
        .products
        .create(CreateProductInput {
            name: format!("Product {sku}"),
            detailed_description: "A test product".to_string(),
            category_id,
            price: dec!(19.90),
            promotional_price: None,
            sku: sku.to_string(),
            ean_upc: None,
            sizes: vec![],
            colors: vec![],
            images: vec!["https://cdn.example.com/p.jpg".to_string()],
            stock: vec![StockEntryInput { store_id, quantity }],
            active: true,
        })
        .await
        .unwrap()
        .product
        .id
}

#[tokio::test]
async fn list_orders_by_name_and_hides_inactive_by_default() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stores;

    svc.create(store_input("Uptown", true)).await.unwrap();
    svc.create(store_input("Airport", true)).await.unwrap();
    svc.create(store_input("Closed", false)).await.unwrap();

    let visible = svc.find_all(false).await.unwrap();
    let names: Vec<&str> = visible.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Airport", "Uptown"]);

    let all = svc.find_all(true).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn find_one_reports_stock_count() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stores;

    let store = svc.create(store_input("Main", true)).await.unwrap();
    seed_product_with_stock(&app, store.id, "SKU-1", 5).await;
    seed_product_with_stock(&app, store.id, "SKU-2", 0).await;

    let found = svc.find_one(store.id).await.unwrap();
    assert_eq!(found.store.id, store.id);
    assert_eq!(found.stock_count, 2);

    let err = svc.find_one(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn update_changes_fields() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stores;

    let store = svc.create(store_input("Main", true)).await.unwrap();
    let updated = svc
        .update(
            store.id,
            UpdateStoreInput {
                name: Some("Main Street".to_string()),
                store_type: Some(StoreType::Online),
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Main Street");
    assert_eq!(updated.store_type, StoreType::Online);
    assert!(!updated.active);
}

#[tokio::test]
async fn remove_deletes_store_and_its_stock_rows() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stores;

    let store = svc.create(store_input("Main", true)).await.unwrap();
    seed_product_with_stock(&app, store.id, "SKU-1", 5).await;

    svc.remove(store.id).await.unwrap();

    let err = svc.find_one(store.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let remaining = StockByStore::find()
        .filter(stock_by_store::Column::StoreId.eq(store.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn stock_by_store_joins_product_summaries() {
    let app = TestApp::new().await;
    let svc = &app.state.services.stores;

    let store = svc.create(store_input("Main", true)).await.unwrap();
    let product_id = seed_product_with_stock(&app, store.id, "SKU-1", 8).await;

    let entries = svc.stock_by_store(store.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].stock.product_id, product_id);
    assert_eq!(entries[0].stock.quantity, 8);
    let product = entries[0].product.as_ref().expect("product summary missing");
    assert_eq!(product.sku, "SKU-1");
    assert!(product.active);
}
