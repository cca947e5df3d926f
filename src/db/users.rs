use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::constants::CREDENTIAL_PROVIDER;
use crate::db::verifications;
use crate::error::{AppError, Result};
use crate::models::{Account, Role, User};

const USER_COLUMNS: &str =
    "id, name, email, email_verified, image, role, created_at, updated_at";

const ACCOUNT_COLUMNS: &str =
    "id, account_id, provider_id, user_id, password, created_at, updated_at";

/// Fields of a user about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub role: Role,
}

/// Look up a user by email, ignoring case
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE lower(email) = lower(?)",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_account(
    pool: &SqlitePool,
    user_id: &str,
    provider_id: &str,
) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM accounts WHERE user_id = ? AND provider_id = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(user_id)
    .bind(provider_id)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

/// The password-based login of a user, if it has one
pub async fn find_credential_account(pool: &SqlitePool, user_id: &str) -> Result<Option<Account>> {
    find_account(pool, user_id, CREDENTIAL_PROVIDER).await
}

/// Insert a user row; a duplicate email maps to `AppError::AccountExists`
pub async fn insert_user<'e, E>(executor: E, user: &NewUser, now: DateTime<Utc>) -> Result<User>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO users (id, name, email, email_verified, image, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, NULL, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.email_verified)
    .bind(user.role.as_str())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::AccountExists
        }
        other => AppError::Database(other),
    })?;

    Ok(User {
        id,
        name: user.name.clone(),
        email: user.email.clone(),
        email_verified: user.email_verified,
        image: None,
        role: user.role.as_str().to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Link a login method to a user
///
/// For password logins `provider_id` is [`CREDENTIAL_PROVIDER`] and
/// `account_id` is the user id.
pub async fn insert_account<'e, E>(
    executor: E,
    user_id: &str,
    provider_id: &str,
    account_id: &str,
    password_hash: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO accounts (id, account_id, provider_id, user_id, password, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(account_id)
    .bind(provider_id)
    .bind(user_id)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(id)
}

/// Create a user with a password login and consume the verification that
/// authorised it, all in one transaction
pub async fn create_with_credential(
    pool: &SqlitePool,
    user: &NewUser,
    password_hash: &str,
    verification_id: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    let mut tx = pool.begin().await?;

    let created = insert_user(&mut *tx, user, now).await?;
    insert_account(
        &mut *tx,
        &created.id,
        CREDENTIAL_PROVIDER,
        &created.id,
        Some(password_hash),
        now,
    )
    .await?;
    verifications::delete(&mut *tx, verification_id).await?;

    tx.commit().await?;

    Ok(created)
}

/// Replace an account's password hash and consume the verification that
/// authorised it, in one transaction
pub async fn update_password(
    pool: &SqlitePool,
    account_id: &str,
    password_hash: &str,
    verification_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE accounts SET password = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(now)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
    verifications::delete(&mut *tx, verification_id).await?;

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn test_db() -> (TempDir, SqlitePool) {
        let temp_dir = TempDir::new().unwrap();
        let db = open_database(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            email_verified: true,
            role: Role::User,
        }
    }

    async fn pending_verification(db: &SqlitePool) -> String {
        let now = Utc::now();
        verifications::replace(db, "signup:x@example.com", "{}", now, now + Duration::minutes(10))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_with_credential() {
        let (_dir, db) = test_db().await;
        let verification_id = pending_verification(&db).await;

        let user = create_with_credential(
            &db,
            &new_user("x@example.com"),
            "$argon2id$fake",
            &verification_id,
            Utc::now(),
        )
        .await
        .unwrap();

        let found = find_by_email(&db, "X@Example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(found.email_verified);
        assert_eq!(found.role(), Role::User);

        let account = find_credential_account(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(account.account_id, user.id);
        assert_eq!(account.password.as_deref(), Some("$argon2id$fake"));

        assert!(verifications::find_by_identifier(&db, "signup:x@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rolls_back() {
        let (_dir, db) = test_db().await;
        insert_user(&db, &new_user("x@example.com"), Utc::now())
            .await
            .unwrap();
        let verification_id = pending_verification(&db).await;

        let result = create_with_credential(
            &db,
            &new_user("X@EXAMPLE.COM"),
            "$argon2id$fake",
            &verification_id,
            Utc::now(),
        )
        .await;

        assert!(matches!(result, Err(AppError::AccountExists)));

        // The transaction rolled back, so the verification is still pending
        assert!(verifications::find_by_identifier(&db, "signup:x@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_social_account_has_no_credential() {
        let (_dir, db) = test_db().await;
        let user = insert_user(&db, &new_user("social@example.com"), Utc::now())
            .await
            .unwrap();
        insert_account(&db, &user.id, "github", "gh-1234", None, Utc::now())
            .await
            .unwrap();

        assert!(find_credential_account(&db, &user.id).await.unwrap().is_none());
        assert!(find_account(&db, &user.id, "github").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_password() {
        let (_dir, db) = test_db().await;
        let verification_id = pending_verification(&db).await;
        let user = insert_user(&db, &new_user("x@example.com"), Utc::now())
            .await
            .unwrap();
        let account_id = insert_account(
            &db,
            &user.id,
            CREDENTIAL_PROVIDER,
            &user.id,
            Some("old-hash"),
            Utc::now(),
        )
        .await
        .unwrap();

        update_password(&db, &account_id, "new-hash", &verification_id, Utc::now())
            .await
            .unwrap();

        let account = find_credential_account(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(account.password.as_deref(), Some("new-hash"));
        assert!(verifications::find_by_identifier(&db, "signup:x@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
