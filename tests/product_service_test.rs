mod common;

use catalog_cms_api::{
    entities::{stock_by_store, StockByStore, StoreType},
    errors::ServiceError,
    services::categories::CreateCategoryInput,
    services::products::{
        CreateProductInput, ProductFilters, StockEntryInput, UpdateProductInput,
    },
    services::stores::CreateStoreInput,
};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
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
        .expect("failed to create category")
        .category
        .id
}

async fn seed_store(app: &TestApp, name: &str, active: bool) -> Uuid {
    app.state
        .services
        .stores
        .create(CreateStoreInput {
            name: name.to_string(),
            store_type: StoreType::Physical,
            full_address: None,
            opening_hours: None,
            active,
        })
        .await
        .expect("failed to create store")
        .id
}

fn product_input(category_id: Uuid, sku: &str, stock: Vec<StockEntryInput>) -> CreateProductInput {
    CreateProductInput {
        name: format!("Product {sku}"),
        detailed_description: "A test product".to_string(),
        category_id,
        price: dec!(49.90),
        promotional_price: None,
        sku: sku.to_string(),
        ean_upc: None,
        sizes: vec!["M".to_string(), "L".to_string()],
        colors: vec!["black".to_string()],
        images: vec!["https://cdn.example.com/p.jpg".to_string()],
        stock,
        active: true,
    }
}

#[tokio::test]
async fn create_product_with_stock() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;
    let store_id = seed_store(&app, "Main Store", true).await;

    let product = app
        .state
        .services
        .products
        .create(product_input(
            category_id,
            "SKU-1",
            vec![StockEntryInput {
                store_id,
                quantity: 7,
            }],
        ))
        .await
        .unwrap();

    assert_eq!(product.product.sku, "SKU-1");
    assert_eq!(product.total_stock, 7);
    assert_eq!(product.stocks.len(), 1);
    assert_eq!(
        product.category.as_ref().map(|c| c.name.as_str()),
        Some("Shirts")
    );
    assert_eq!(product.product.sizes_list(), vec!["M", "L"]);
}

#[tokio::test]
async fn create_rejects_duplicate_sku() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;

    let svc = &app.state.services.products;
    svc.create(product_input(category_id, "SKU-1", vec![]))
        .await
        .unwrap();

    let err = svc
        .create(product_input(category_id, "SKU-1", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn create_rejects_missing_or_inactive_category() {
    let app = TestApp::new().await;
    let svc = &app.state.services.products;

    let err = svc
        .create(product_input(Uuid::new_v4(), "SKU-X", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let category_id = seed_category(&app, "Old", "old").await;
    app.state
        .services
        .categories
        .update(
            category_id,
            catalog_cms_api::services::categories::UpdateCategoryInput {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = svc
        .create(product_input(category_id, "SKU-Y", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn create_rejects_stock_for_inactive_store() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;
    let store_id = seed_store(&app, "Closed Store", false).await;

    let err = app
        .state
        .services
        .products
        .create(product_input(
            category_id,
            "SKU-1",
            vec![StockEntryInput {
                store_id,
                quantity: 3,
            }],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn active_product_requires_an_image() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;

    let mut input = product_input(category_id, "SKU-1", vec![]);
    input.images = vec![];

    let err = app
        .state
        .services
        .products
        .create(input)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn update_replaces_stock_rows_and_fields() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;
    let store_a = seed_store(&app, "Store A", true).await;
    let store_b = seed_store(&app, "Store B", true).await;

    let svc = &app.state.services.products;
    let product = svc
        .create(product_input(
            category_id,
            "SKU-1",
            vec![StockEntryInput {
                store_id: store_a,
                quantity: 5,
            }],
        ))
        .await
        .unwrap();

    let updated = svc
        .update(
            product.product.id,
            UpdateProductInput {
                price: Some(dec!(59.90)),
                stock: Some(vec![StockEntryInput {
                    store_id: store_b,
                    quantity: 9,
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.product.price, dec!(59.90));
    assert_eq!(updated.total_stock, 9);
    assert_eq!(updated.stocks.len(), 1);
    assert_eq!(updated.stocks[0].store_id, store_b);
}

#[tokio::test]
async fn update_stock_upserts_single_row() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;
    let store_id = seed_store(&app, "Main Store", true).await;

    let svc = &app.state.services.products;
    let product = svc
        .create(product_input(category_id, "SKU-1", vec![]))
        .await
        .unwrap();

    svc.update_stock(product.product.id, store_id, 4)
        .await
        .unwrap();
    svc.update_stock(product.product.id, store_id, 11)
        .await
        .unwrap();

    let rows = StockByStore::find()
        .filter(stock_by_store::Column::ProductId.eq(product.product.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 11);
}

#[tokio::test]
async fn update_stock_for_missing_store_is_not_found() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;

    let svc = &app.state.services.products;
    let product = svc
        .create(product_input(category_id, "SKU-1", vec![]))
        .await
        .unwrap();

    let err = svc
        .update_stock(product.product.id, Uuid::new_v4(), 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn remove_deletes_product_and_stock_rows() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;
    let store_id = seed_store(&app, "Main Store", true).await;

    let svc = &app.state.services.products;
    let product = svc
        .create(product_input(
            category_id,
            "SKU-1",
            vec![StockEntryInput {
                store_id,
                quantity: 2,
            }],
        ))
        .await
        .unwrap();

    svc.remove(product.product.id).await.unwrap();

    let err = svc.find_one(product.product.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let stock_count = StockByStore::find()
        .filter(stock_by_store::Column::ProductId.eq(product.product.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(stock_count, 0);
}

#[tokio::test]
async fn find_all_paginates_and_filters() {
    let app = TestApp::new().await;
    let shirts = seed_category(&app, "Shirts", "shirts").await;
    let pants = seed_category(&app, "Pants", "pants").await;

    let svc = &app.state.services.products;
    svc.create(product_input(shirts, "SKU-1", vec![]))
        .await
        .unwrap();
    svc.create(product_input(shirts, "SKU-2", vec![]))
        .await
        .unwrap();
    svc.create(product_input(pants, "SKU-3", vec![]))
        .await
        .unwrap();

    let (page, total) = svc
        .find_all(1, 2, ProductFilters::default())
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);

    let (shirts_only, shirts_total) = svc
        .find_all(
            1,
            10,
            ProductFilters {
                category_id: Some(shirts),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(shirts_total, 2);
    assert!(shirts_only
        .iter()
        .all(|p| p.product.category_id == shirts));

    let (without_stock, _) = svc
        .find_all(
            1,
            10,
            ProductFilters {
                has_stock: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(without_stock.len(), 3);
}

#[tokio::test]
async fn uncategorized_reports_follow_category_deactivation() {
    let app = TestApp::new().await;
    let doomed = seed_category(&app, "Doomed", "doomed").await;

    let svc = &app.state.services.products;
    let product = svc
        .create(product_input(doomed, "SKU-1", vec![]))
        .await
        .unwrap();

    assert_eq!(svc.products_without_category_count().await.unwrap(), 0);

    app.state
        .services
        .categories
        .update(
            doomed,
            catalog_cms_api::services::categories::UpdateCategoryInput {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(svc.products_without_category_count().await.unwrap(), 1);
    let orphans = svc.products_without_category().await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].product.id, product.product.id);
}

#[tokio::test]
async fn promotional_price_report_lists_active_promotions() {
    let app = TestApp::new().await;
    let category_id = seed_category(&app, "Shirts", "shirts").await;

    let svc = &app.state.services.products;
    let mut promo = product_input(category_id, "SKU-PROMO", vec![]);
    promo.promotional_price = Some(dec!(29.90));
    svc.create(promo).await.unwrap();
    svc.create(product_input(category_id, "SKU-PLAIN", vec![]))
        .await
        .unwrap();

    let promos = svc.products_with_promotional_price().await.unwrap();
    assert_eq!(promos.len(), 1);
    assert_eq!(promos[0].product.sku, "SKU-PROMO");
}
