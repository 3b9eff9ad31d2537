mod common;

use catalog_cms_api::{
    entities::{AuditAction, EntityType},
    errors::ServiceError,
    services::audit::AuditLogFilters,
    services::users::{LoginInput, RegisterUserInput},
};
use common::TestApp;

fn register_input(email: &str) -> RegisterUserInput {
    RegisterUserInput {
        name: "Jane Admin".to_string(),
        email: email.to_string(),
        password: "SecurePass123!".to_string(),
    }
}

#[tokio::test]
async fn register_login_and_profile_flow() {
    let app = TestApp::new().await;
    let users = &app.state.services.users;

    let user = users.register(register_input("jane@example.com")).await.unwrap();
    assert_eq!(user.email, "jane@example.com");
    assert!(user.active);
    // Stored hash is argon2, never the raw password
    assert_ne!(user.password_hash, "SecurePass123!");

    let (tokens, logged_in) = users
        .login(
            LoginInput {
                email: "jane@example.com".to_string(),
                password: "SecurePass123!".to_string(),
            },
            Some("127.0.0.1".to_string()),
            Some("integration-test".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);
    assert_eq!(tokens.token_type, "Bearer");

    // The issued access token resolves back to the user
    let claims = app
        .state
        .services
        .auth
        .validate_token(&tokens.access_token)
        .await
        .unwrap();
    assert_eq!(claims.sub, user.id.to_string());

    let profile = users.find_by_id(user.id).await.unwrap();
    assert_eq!(profile.email, "jane@example.com");
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = TestApp::new().await;
    let users = &app.state.services.users;

    users.register(register_input("jane@example.com")).await.unwrap();
    let err = users
        .register(register_input("jane@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    let users = &app.state.services.users;

    users.register(register_input("jane@example.com")).await.unwrap();

    let err = users
        .login(
            LoginInput {
                email: "jane@example.com".to_string(),
                password: "wrong-password".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    let err = users
        .login(
            LoginInput {
                email: "nobody@example.com".to_string(),
                password: "whatever".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn login_and_logout_are_audited() {
    let app = TestApp::new().await;
    let users = &app.state.services.users;

    let user = users.register(register_input("jane@example.com")).await.unwrap();
    users
        .login(
            LoginInput {
                email: "jane@example.com".to_string(),
                password: "SecurePass123!".to_string(),
            },
            Some("10.0.0.9".to_string()),
            None,
        )
        .await
        .unwrap();
    users.logout(user.id, Some("10.0.0.9".to_string()), None).await.unwrap();

    let (logs, _) = app
        .state
        .services
        .audit
        .find_all(
            1,
            10,
            AuditLogFilters {
                user_id: Some(user.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let actions: Vec<AuditAction> = logs.iter().map(|l| l.action).collect();
    assert!(actions.contains(&AuditAction::Create));
    assert!(actions.contains(&AuditAction::Login));
    assert!(actions.contains(&AuditAction::Logout));
    assert!(logs.iter().all(|l| l.entity_type == EntityType::User));
}

#[tokio::test]
async fn refresh_rotates_token_pairs() {
    let app = TestApp::new().await;
    let users = &app.state.services.users;
    let auth = &app.state.services.auth;

    users.register(register_input("jane@example.com")).await.unwrap();
    let (tokens, _) = users
        .login(
            LoginInput {
                email: "jane@example.com".to_string(),
                password: "SecurePass123!".to_string(),
            },
            None,
            None,
        )
        .await
        .unwrap();

    let refreshed = auth.refresh_token(&tokens.refresh_token).await.unwrap();
    assert_ne!(refreshed.access_token, tokens.access_token);

    // Refresh tokens are single-use
    let err = auth.refresh_token(&tokens.refresh_token).await;
    assert!(err.is_err());
}
