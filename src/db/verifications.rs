use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::VerificationRecord;

/// Store a new pending verification, discarding any earlier one for the
/// same identifier. Returns the new record's id.
pub async fn replace(
    pool: &SqlitePool,
    identifier: &str,
    value: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM verifications WHERE identifier = ?")
        .bind(identifier)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO verifications (id, identifier, value, expires_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(identifier)
    .bind(value)
    .bind(expires_at)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(id)
}

pub async fn find_by_identifier(
    pool: &SqlitePool,
    identifier: &str,
) -> Result<Option<VerificationRecord>> {
    let record = sqlx::query_as::<_, VerificationRecord>(
        "SELECT id, identifier, value, expires_at, created_at, updated_at \
         FROM verifications WHERE identifier = ?",
    )
    .bind(identifier)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Swap the payload of a pending verification, but only if it still holds
/// `expected`
///
/// Returns false when the record was changed or removed since it was read.
pub async fn compare_and_set_value(
    pool: &SqlitePool,
    id: &str,
    expected: &str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result =
        sqlx::query("UPDATE verifications SET value = ?, updated_at = ? WHERE id = ? AND value = ?")
            .bind(value)
            .bind(now)
            .bind(id)
            .bind(expected)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete a verification by id; usable inside a caller's transaction
pub async fn delete<'e, E>(executor: E, id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM verifications WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

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

    async fn count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM verifications")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_replace_and_find() {
        let (_dir, db) = test_db().await;
        let now = Utc::now();

        let id = replace(&db, "signup:a@example.com", "{}", now, now + Duration::minutes(10))
            .await
            .unwrap();

        let record = find_by_identifier(&db, "signup:a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.value, "{}");
        assert_eq!(record.expires_at, now + Duration::minutes(10));

        assert!(find_by_identifier(&db, "signup:b@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_replace_supersedes_previous_record() {
        let (_dir, db) = test_db().await;
        let now = Utc::now();
        let expires = now + Duration::minutes(10);

        let first = replace(&db, "signup:a@example.com", "first", now, expires)
            .await
            .unwrap();
        let second = replace(&db, "signup:a@example.com", "second", now, expires)
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(count(&db).await, 1);

        let record = find_by_identifier(&db, "signup:a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.id, second);
        assert_eq!(record.value, "second");
    }

    #[tokio::test]
    async fn test_purposes_do_not_collide() {
        let (_dir, db) = test_db().await;
        let now = Utc::now();
        let expires = now + Duration::minutes(10);

        replace(&db, "signup:a@example.com", "s", now, expires).await.unwrap();
        replace(&db, "password-reset:a@example.com", "r", now, expires)
            .await
            .unwrap();

        assert_eq!(count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_compare_and_set_and_delete() {
        let (_dir, db) = test_db().await;
        let now = Utc::now();

        let id = replace(&db, "signup:a@example.com", "old", now, now + Duration::minutes(10))
            .await
            .unwrap();

        assert!(compare_and_set_value(&db, &id, "old", "new", now + Duration::seconds(5))
            .await
            .unwrap());
        let record = find_by_identifier(&db, "signup:a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.value, "new");
        assert_eq!(record.updated_at, now + Duration::seconds(5));

        // Stale expectation loses
        assert!(!compare_and_set_value(&db, &id, "old", "newer", now)
            .await
            .unwrap());
        let record = find_by_identifier(&db, "signup:a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.value, "new");

        delete(&db, &id).await.unwrap();
        assert_eq!(count(&db).await, 0);
        assert!(!compare_and_set_value(&db, &id, "new", "newer", now)
            .await
            .unwrap());
    }
}
