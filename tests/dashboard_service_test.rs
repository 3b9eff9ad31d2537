mod common;

use catalog_cms_api::{
    entities::StoreType,
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
    services::products::{CreateProductInput, StockEntryInput},
    services::stores::CreateStoreInput,
};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn seed_category(app: &TestApp, name: &str, slug: &str) -> Uuid {
    app.state
        .services
        .categories
        .create(CreateCategoryInput {
            name: name.to_string(),
            description: None,
            slug: slug.to_string(),
            parent_id: None,
            active: true,
        })
        .await
        .unwrap()
        .category
        .id
}

async fn seed_product(
    app: &TestApp,
    category_id: Uuid,
    sku: &str,
    promotional: bool,
    stock: Vec<StockEntryInput>,
) -> Uuid {
    app.state
        .services
        .products
        .create(CreateProductInput {
            name: format!("Product {sku}"),
            detailed_description: "A test product".to_string(),
            category_id,
            price: dec!(99.90),
            promotional_price: promotional.then(|| dec!(79.90)),
            sku: sku.to_string(),
            ean_upc: None,
            sizes: vec![],
            colors: vec![],
            images: vec!["https://cdn.example.com/p.jpg".to_string()],
            stock,
            active: true,
        })
        .await
        .unwrap()
        .product
        .id
}

#[tokio::test]
async fn summary_reports_catalog_counts() {
    let app = TestApp::new().await;

    let store_id = app
        .state
        .services
        .stores
        .create(CreateStoreInput {
            name: "Main".to_string(),
            store_type: StoreType::Physical,
            full_address: None,
            opening_hours: None,
            active: true,
        })
        .await
        .unwrap()
        .id;

    let shirts = seed_category(&app, "Shirts", "shirts").await;
    seed_product(
        &app,
        shirts,
        "SKU-STOCKED",
        false,
        vec![StockEntryInput {
            store_id,
            quantity: 10,
        }],
    )
    .await;
    seed_product(&app, shirts, "SKU-PROMO", true, vec![]).await;

    let summary = app.state.services.dashboard.summary().await.unwrap();
    assert_eq!(summary.total_products, 2);
    assert_eq!(summary.active_products, 2);
    assert_eq!(summary.inactive_products, 0);
    assert_eq!(summary.total_categories, 1);
    assert_eq!(summary.total_stores, 1);
    assert_eq!(summary.products_with_promotional_price, 1);
    assert_eq!(summary.products_without_stock, 1);
    assert_eq!(summary.products_without_category, 0);
}

#[tokio::test]
async fn alerts_flag_uncategorized_products_after_cascade() {
    let app = TestApp::new().await;

    let doomed = seed_category(&app, "Doomed", "doomed").await;
    seed_product(&app, doomed, "SKU-1", false, vec![]).await;

    app.state
        .services
        .categories
        .update(
            doomed,
            UpdateCategoryInput {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let alerts = app.state.services.dashboard.alerts().await.unwrap();
    assert_eq!(alerts.products_in_uncategorized.len(), 1);
    assert!(alerts.inactive_categories_with_products.is_empty());

    let summary = app.state.services.dashboard.summary().await.unwrap();
    assert_eq!(summary.products_without_category, 1);
}

#[tokio::test]
async fn recent_activity_lists_latest_updates() {
    let app = TestApp::new().await;

    let shirts = seed_category(&app, "Shirts", "shirts").await;
    seed_product(&app, shirts, "SKU-1", false, vec![]).await;

    let activity = app
        .state
        .services
        .dashboard
        .recent_activity(5)
        .await
        .unwrap();
    assert_eq!(activity.products.len(), 1);
    assert_eq!(activity.categories.len(), 1);
    assert_eq!(activity.products[0].name, "Product SKU-1");
}
