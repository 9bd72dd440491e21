use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};

use crate::domain::{
    AuthError, CreateUserDto, DomainResult, OtpChallenge, User, UserRepositoryInterface, UserRole,
};
use crate::infrastructure::database::entities::user;

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: &str) -> DomainResult<Option<user::Model>> {
        user::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    async fn update_model<F>(&self, id: &str, f: F) -> DomainResult<Option<user::Model>>
    where
        F: FnOnce(&mut user::ActiveModel) + Send,
    {
        let Some(model) = self.find_model(id).await? else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        f(&mut active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await.map_err(db_err)?;
        Ok(Some(updated))
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::Clinician => UserRole::Clinician,
        user::UserRole::Patient => UserRole::Patient,
    }
}

fn domain_role_to_entity(role: UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::Clinician => user::UserRole::Clinician,
        UserRole::Patient => user::UserRole::Patient,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    // A code without an expiry (or the reverse) is treated as no pending OTP.
    let otp = match (model.otp, model.otp_expires_at) {
        (Some(code), Some(expires_at)) => Some(OtpChallenge { code, expires_at }),
        _ => None,
    };

    User {
        id: model.id,
        full_name: model.full_name,
        email: model.email,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        is_verified: model.is_verified,
        is_active: model.is_active,
        otp,
        last_login_at: model.last_login_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> AuthError {
    AuthError::internal(format!("Database error: {}", e))
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepositoryInterface for UserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let now = Utc::now();

        let new_user = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            full_name: Set(dto.full_name),
            email: Set(dto.email),
            password_hash: Set(dto.password_hash),
            role: Set(domain_role_to_entity(dto.role)),
            is_verified: Set(false),
            is_active: Set(true),
            otp: Set(None),
            otp_expires_at: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = new_user.insert(&self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AuthError::DuplicateEmail
            } else {
                db_err(e)
            }
        })?;

        Ok(user_model_to_domain(model))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.find_model(id).await?.map(user_model_to_domain))
    }

    async fn email_exists(&self, email: &str) -> DomainResult<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    async fn count_users(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn set_otp(&self, id: &str, challenge: &OtpChallenge) -> DomainResult<()> {
        let code = challenge.code.clone();
        let expires_at = challenge.expires_at;
        self.update_model(id, move |m| {
            m.otp = Set(Some(code));
            m.otp_expires_at = Set(Some(expires_at));
        })
        .await?
        .map(|_| ())
        .ok_or(AuthError::UserNotFound)
    }

    async fn clear_otp(&self, id: &str) -> DomainResult<()> {
        self.update_model(id, |m| {
            m.otp = Set(None);
            m.otp_expires_at = Set(None);
        })
        .await?;
        Ok(())
    }

    async fn record_login(&self, id: &str, code: &str, at: DateTime<Utc>) -> DomainResult<bool> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::Otp, Expr::value(Option::<String>::None))
            .col_expr(
                user::Column::OtpExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(user::Column::IsVerified, Expr::value(true))
            .col_expr(user::Column::LastLoginAt, Expr::value(Some(at)))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::Otp.eq(code))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn set_active(&self, id: &str, is_active: bool) -> DomainResult<Option<User>> {
        let updated = self
            .update_model(id, move |m| m.is_active = Set(is_active))
            .await?;
        Ok(updated.map(user_model_to_domain))
    }

    async fn ping(&self) -> DomainResult<()> {
        self.db
            .execute_unprepared("SELECT 1")
            .await
            .map(|_| ())
            .map_err(db_err)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::Migrator;
    use chrono::Duration;
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    async fn repo() -> UserRepository {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        UserRepository::new(db)
    }

    fn dto(email: &str, role: UserRole) -> CreateUserDto {
        CreateUserDto {
            full_name: "Alice Doe".into(),
            email: email.into(),
            password_hash: "$2b$04$hash".into(),
            role,
        }
    }

    #[tokio::test]
    async fn create_and_find() {
        let repo = repo().await;
        let user = repo
            .create_user(dto("alice@example.com", UserRole::Patient))
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Patient);
        assert!(user.is_active);
        assert!(user.otp.is_none());

        let found = repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.email_exists("alice@example.com").await.unwrap());
        assert!(!repo.email_exists("bob@example.com").await.unwrap());
        assert_eq!(repo.count_users().await.unwrap(), 1);
        repo.ping().await.unwrap();
    }

    #[tokio::test]
    async fn unique_violation_maps_to_duplicate_email() {
        let repo = repo().await;
        repo.create_user(dto("alice@example.com", UserRole::Clinician))
            .await
            .unwrap();
        let err = repo
            .create_user(dto("alice@example.com", UserRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn otp_lifecycle_round_trips_through_columns() {
        let repo = repo().await;
        let user = repo
            .create_user(dto("alice@example.com", UserRole::Clinician))
            .await
            .unwrap();
        let expires = Utc::now() + Duration::minutes(10);

        repo.set_otp(&user.id, &OtpChallenge::new("042137", expires))
            .await
            .unwrap();
        let stored = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        let otp = stored.otp.unwrap();
        assert_eq!(otp.code, "042137");
        assert_eq!(otp.expires_at.timestamp(), expires.timestamp());

        repo.clear_otp(&user.id).await.unwrap();
        let stored = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.otp.is_none());
    }

    #[tokio::test]
    async fn record_login_consumes_code_once() {
        let repo = repo().await;
        let user = repo
            .create_user(dto("alice@example.com", UserRole::Clinician))
            .await
            .unwrap();
        let now = Utc::now();
        repo.set_otp(&user.id, &OtpChallenge::new("111111", now + Duration::minutes(10)))
            .await
            .unwrap();
        repo.set_otp(&user.id, &OtpChallenge::new("222222", now + Duration::minutes(10)))
            .await
            .unwrap();

        assert!(!repo.record_login(&user.id, "111111", now).await.unwrap());
        let stored = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.otp.map(|o| o.code).as_deref(), Some("222222"));

        assert!(repo.record_login(&user.id, "222222", now).await.unwrap());
        assert!(!repo.record_login(&user.id, "222222", now).await.unwrap());
        let stored = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.otp.is_none());
        assert_eq!(
            stored.last_login_at.map(|t| t.timestamp()),
            Some(now.timestamp())
        );
    }

    #[tokio::test]
    async fn record_login_and_deactivate() {
        let repo = repo().await;
        let user = repo
            .create_user(dto("alice@example.com", UserRole::Clinician))
            .await
            .unwrap();
        let now = Utc::now();

        repo.set_otp(&user.id, &OtpChallenge::new("042137", now + Duration::minutes(10)))
            .await
            .unwrap();
        assert!(!repo.record_login(&user.id, "999999", now).await.unwrap());
        assert!(repo.record_login(&user.id, "042137", now).await.unwrap());
        let stored = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.is_verified);
        assert!(stored.last_login_at.is_some());

        let updated = repo.set_active(&user.id, false).await.unwrap().unwrap();
        assert!(!updated.is_active);
        assert!(repo.set_active("missing", true).await.unwrap().is_none());
        assert!(!repo.record_login("missing", "042137", now).await.unwrap());
    }
}
