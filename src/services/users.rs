use crate::{
    auth::{AuthService, TokenPair},
    entities::{user, User, UserModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Service for account registration and credential login. Token issuance is
/// delegated to the auth module.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    audit: AuditService,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        audit: AuditService,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            auth,
            audit,
            event_sender,
        }
    }

    /// Register a new user account
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterUserInput) -> Result<UserModel, ServiceError> {
        let db = &*self.db;

        if User::find()
            .filter(user::Column::Email.eq(&input.email))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("Email already in use".to_string()));
        }

        let password_hash = AuthService::hash_password(&input.password)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;

        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            email: Set(input.email),
            password_hash: Set(password_hash),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = user.insert(db).await?;

        if let Err(e) = self
            .audit
            .create_log(crate::services::audit::CreateAuditLogInput {
                user_id: Some(user.id),
                action: crate::entities::AuditAction::Create,
                entity_type: crate::entities::EntityType::User,
                entity_id: Some(user.id),
                product_id: None,
                category_id: None,
                store_id: None,
                details: Some(serde_json::json!({
                    "action": "user_registration",
                    "user_email": user.email,
                })),
                ip_address: None,
                user_agent: None,
            })
            .await
        {
            warn!(user_id = %user.id, "Failed to record registration audit log: {}", e);
        }

        self.event_sender
            .send_or_log(Event::UserRegistered(user.id))
            .await;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue a token pair
    #[instrument(skip(self, input))]
    pub async fn login(
        &self,
        input: LoginInput,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(TokenPair, UserModel), ServiceError> {
        let db = &*self.db;

        let user = User::find()
            .filter(user::Column::Email.eq(&input.email))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        if !AuthService::verify_password(&input.password, &user.password_hash) {
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        if !user.active {
            return Err(ServiceError::Unauthorized(
                "Account is deactivated".to_string(),
            ));
        }

        if let Err(e) = self
            .audit
            .log_login(user.id, ip_address, user_agent)
            .await
        {
            warn!(user_id = %user.id, "Failed to record login audit log: {}", e);
        }

        let tokens = self
            .auth
            .generate_token(&user)
            .await
            .map_err(|e| ServiceError::AuthError(e.to_string()))?;

        self.event_sender
            .send_or_log(Event::UserLoggedIn(user.id))
            .await;

        info!(user_id = %user.id, "User logged in");
        Ok((tokens, user))
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<UserModel, ServiceError> {
        let db = &*self.db;

        User::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", id)))
    }

    /// Record a logout for the audit trail
    #[instrument(skip(self))]
    pub async fn logout(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(), ServiceError> {
        if let Err(e) = self
            .audit
            .log_logout(user_id, ip_address, user_agent)
            .await
        {
            warn!(user_id = %user_id, "Failed to record logout audit log: {}", e);
        }

        self.event_sender
            .send_or_log(Event::UserLoggedOut(user_id))
            .await;

        Ok(())
    }
}
