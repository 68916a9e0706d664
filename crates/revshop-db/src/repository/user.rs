//! # User Repository
//!
//! Buyers and sellers share one `users` table. Sellers additionally own a
//! `seller_profiles` row, written in the same transaction as the user.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use revshop_core::validation::validate_email;
use revshop_core::{Account, NewUser, Role, SellerProfile, User};

const USER_COLUMNS: &str = "id, email, first_name, last_name, address, role, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a buyer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn create_buyer(&self, new_user: &NewUser) -> DbResult<User> {
        validate_email(&new_user.email)?;
        debug!(email = %new_user.email, "Creating buyer");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, address, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(new_user.email.trim())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.address)
        .bind(Role::Buyer)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_email(e, &new_user.email))?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DbError::Internal("inserted user vanished".to_string()))
    }

    /// Registers a seller together with its business profile.
    pub async fn create_seller(
        &self,
        new_user: &NewUser,
        business_name: &str,
        business_address: Option<&str>,
    ) -> DbResult<Account> {
        validate_email(&new_user.email)?;
        debug!(email = %new_user.email, business = %business_name, "Creating seller");

        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (email, first_name, last_name, address, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(new_user.email.trim())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.address)
        .bind(Role::Seller)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_email(e, &new_user.email))?
        .last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO seller_profiles (user_id, business_name, business_address, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(user_id)
        .bind(business_name)
        .bind(business_address)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.get_account(user_id)
            .await?
            .ok_or_else(|| DbError::Internal("inserted seller vanished".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Users with `role`, oldest first.
    pub async fn list_by_role(&self, role: Role) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY id");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Loads a user with its seller profile, if any.
    pub async fn get_account(&self, id: i64) -> DbResult<Option<Account>> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let seller_profile = sqlx::query_as::<_, SellerProfile>(
            r#"
            SELECT user_id, business_name, business_address, created_at
            FROM seller_profiles
            WHERE user_id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(Account {
            user,
            seller_profile,
        }))
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn duplicate_email(err: sqlx::Error, email: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
        other => other,
    }
}
