mod common;

use catalog_cms_api::{
    entities::{AuditAction, EntityType},
    errors::ServiceError,
    services::audit::{AuditLogFilters, CreateAuditLogInput},
};
use common::TestApp;
use uuid::Uuid;

fn log_input(user_id: Uuid, action: AuditAction, entity_type: EntityType) -> CreateAuditLogInput {
    CreateAuditLogInput {
        user_id: Some(user_id),
        action,
        entity_type,
        entity_id: Some(Uuid::new_v4()),
        product_id: None,
        category_id: None,
        store_id: None,
        details: Some(serde_json::json!({ "source": "test" })),
        ip_address: Some("127.0.0.1".to_string()),
        user_agent: Some("integration-test".to_string()),
    }
}

#[tokio::test]
async fn create_and_fetch_audit_entry() {
    let app = TestApp::new().await;
    let svc = &app.state.services.audit;
    let user_id = Uuid::new_v4();

    let created = svc
        .create_log(log_input(user_id, AuditAction::Create, EntityType::Product))
        .await
        .unwrap();

    let fetched = svc.find_one(created.id).await.unwrap();
    assert_eq!(fetched.user_id, Some(user_id));
    assert_eq!(fetched.action, AuditAction::Create);
    assert_eq!(fetched.entity_type, EntityType::Product);

    let err = svc.find_one(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn find_all_filters_by_action_and_entity_type() {
    let app = TestApp::new().await;
    let svc = &app.state.services.audit;
    let user_id = Uuid::new_v4();

    svc.create_log(log_input(user_id, AuditAction::Create, EntityType::Product))
        .await
        .unwrap();
    svc.create_log(log_input(user_id, AuditAction::Update, EntityType::Product))
        .await
        .unwrap();
    svc.create_log(log_input(user_id, AuditAction::Create, EntityType::Category))
        .await
        .unwrap();

    let (creates, total) = svc
        .find_all(
            1,
            10,
            AuditLogFilters {
                action: Some(AuditAction::Create),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(creates.iter().all(|l| l.action == AuditAction::Create));

    let (product_creates, product_total) = svc
        .find_all(
            1,
            10,
            AuditLogFilters {
                action: Some(AuditAction::Create),
                entity_type: Some(EntityType::Product),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(product_total, 1);
    assert_eq!(product_creates[0].entity_type, EntityType::Product);
}

#[tokio::test]
async fn user_activity_is_limited_and_scoped() {
    let app = TestApp::new().await;
    let svc = &app.state.services.audit;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    for _ in 0..3 {
        svc.create_log(log_input(user_a, AuditAction::Update, EntityType::Store))
            .await
            .unwrap();
    }
    svc.create_log(log_input(user_b, AuditAction::Login, EntityType::User))
        .await
        .unwrap();

    let activity = svc.user_activity(user_a, 2).await.unwrap();
    assert_eq!(activity.len(), 2);
    assert!(activity.iter().all(|l| l.user_id == Some(user_a)));

    let recent = svc.recent_activity(10).await.unwrap();
    assert_eq!(recent.len(), 4);
}

#[tokio::test]
async fn typed_helpers_record_expected_shapes() {
    let app = TestApp::new().await;
    let svc = &app.state.services.audit;
    let user_id = Uuid::new_v4();
    let category_id = Uuid::new_v4();

    svc.log_login(user_id, Some("10.0.0.1".to_string()), None)
        .await
        .unwrap();
    svc.log_category_action(user_id, AuditAction::Delete, category_id, None)
        .await
        .unwrap();

    let (logs, total) = svc
        .find_all(
            1,
            10,
            AuditLogFilters {
                user_id: Some(user_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 2);

    let login = logs
        .iter()
        .find(|l| l.action == AuditAction::Login)
        .expect("login entry missing");
    assert_eq!(login.entity_type, EntityType::User);
    assert_eq!(login.ip_address.as_deref(), Some("10.0.0.1"));

    let delete = logs
        .iter()
        .find(|l| l.action == AuditAction::Delete)
        .expect("delete entry missing");
    assert_eq!(delete.category_id, Some(category_id));
}
