//! # User Repository
//!
//! Logins and roles. Password hashing happens in the API layer; this
//! repository only ever sees Argon2 hashes.
//!
//! ## Rules
//! - Email is unique, case-insensitively
//! - The last admin can be neither deleted nor demoted to staff

use chrono::Utc;
use haze_core::input::{NewUser, UserUpdate};
use haze_core::{CoreError, ManagedUser, Role};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{clean, generate_id, log};

const USER_COLUMNS: &str = r#"
    id, name, email, phone, role, password_hash, created_at, updated_at
"#;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists users ordered by name.
    pub async fn list(&self) -> DbResult<Vec<ManagedUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name COLLATE NOCASE");
        let users = sqlx::query_as::<_, ManagedUser>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ManagedUser>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, id).await
    }

    /// Looks a user up by login email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<ManagedUser>> {
        debug!(email = %email, "Looking up user by email");

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE");
        let user = sqlx::query_as::<_, ManagedUser>(&sql)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Creates a user with an already hashed password.
    pub async fn create(
        &self,
        new: &NewUser,
        password_hash: &str,
        actor: &str,
    ) -> DbResult<ManagedUser> {
        new.validate()?;

        let now = Utc::now();
        let user = ManagedUser {
            id: generate_id(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_lowercase(),
            phone: clean(new.phone.as_deref()),
            role: new.role,
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(email = %user.email, role = user.role.as_str(), "Creating user");

        let mut tx = self.pool.begin().await?;

        ensure_email_free(&mut tx, &user.email, None).await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, phone, role, password_hash, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        log::append_in(
            &mut tx,
            actor,
            format!(
                "Created {} user {} <{}>",
                user.role.as_str(),
                user.name,
                user.email
            ),
        )
        .await?;

        tx.commit().await?;

        info!(id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Updates a user. `password_hash` replaces the stored hash when given.
    pub async fn update(
        &self,
        id: &str,
        update: &UserUpdate,
        password_hash: Option<&str>,
        actor: &str,
    ) -> DbResult<ManagedUser> {
        update.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let mut updated = current.clone();
        if let Some(name) = &update.name {
            updated.name = name.trim().to_string();
        }
        if let Some(email) = &update.email {
            updated.email = email.trim().to_lowercase();
            ensure_email_free(&mut tx, &updated.email, Some(id)).await?;
        }
        if update.phone.is_some() {
            updated.phone = clean(update.phone.as_deref());
        }
        if let Some(role) = update.role {
            if current.role.is_admin() && !role.is_admin() && admin_count(&mut tx).await? <= 1 {
                warn!(id = %id, "Refusing to demote the last admin");
                return Err(CoreError::LastAdmin.into());
            }
            updated.role = role;
        }
        if let Some(hash) = password_hash {
            updated.password_hash = hash.to_string();
        }
        updated.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE users
            SET name = ?2, email = ?3, phone = ?4, role = ?5, password_hash = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(&updated.phone)
        .bind(updated.role)
        .bind(&updated.password_hash)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut changes = Vec::new();
        if updated.name != current.name {
            changes.push(format!("name to {}", updated.name));
        }
        if updated.email != current.email {
            changes.push(format!("email to {}", updated.email));
        }
        if updated.phone != current.phone {
            changes.push("phone".to_string());
        }
        if updated.role != current.role {
            changes.push(format!("role to {}", updated.role.as_str()));
        }
        if password_hash.is_some() {
            changes.push("password".to_string());
        }
        let action = if changes.is_empty() {
            format!("Saved user {} without changes", current.name)
        } else {
            format!("Updated user {}: {}", current.name, changes.join(", "))
        };
        log::append_in(&mut tx, actor, action).await?;

        tx.commit().await?;

        info!(id = %id, "User updated");
        Ok(updated)
    }

    /// Deletes a user.
    pub async fn delete(&self, id: &str, actor: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let user = fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        if user.role.is_admin() && admin_count(&mut tx).await? <= 1 {
            warn!(id = %id, "Refusing to delete the last admin");
            return Err(CoreError::LastAdmin.into());
        }

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        log::append_in(
            &mut tx,
            actor,
            format!("Deleted {} user {} <{}>", user.role.as_str(), user.name, user.email),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, "User deleted");
        Ok(())
    }
}

async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ManagedUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = sqlx::query_as::<_, ManagedUser>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

async fn admin_count(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?1")
        .bind(Role::Admin)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Fails with `UniqueViolation` if another user already has the email.
async fn ensure_email_free(
    conn: &mut SqliteConnection,
    email: &str,
    except_id: Option<&str>,
) -> DbResult<()> {
    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE AND (?2 IS NULL OR id != ?2)",
    )
    .bind(email)
    .bind(except_id)
    .fetch_one(&mut *conn)
    .await?;

    if taken > 0 {
        return Err(DbError::duplicate("email", email));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;

    fn new_user(name: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            role,
            password: "correct-horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_case_insensitive() {
        let db = db().await;
        let repo = db.users();

        let created = repo
            .create(&new_user("Nadia", "Nadia@Shop.test", Role::Admin), "$argon2id$x", "system")
            .await
            .unwrap();
        assert_eq!(created.email, "nadia@shop.test");

        let found = repo.find_by_email("NADIA@shop.test").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "$argon2id$x");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = db().await;
        let repo = db.users();
        repo.create(&new_user("Nadia", "nadia@shop.test", Role::Admin), "h", "system")
            .await
            .unwrap();

        let err = repo
            .create(&new_user("Other", "NADIA@shop.test", Role::Staff), "h", "system")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_last_admin_is_protected() {
        let db = db().await;
        let repo = db.users();
        let admin = repo
            .create(&new_user("Nadia", "nadia@shop.test", Role::Admin), "h", "system")
            .await
            .unwrap();

        let err = repo.delete(&admin.id, "Nadia").await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::LastAdmin)));

        let demote = UserUpdate {
            role: Some(Role::Staff),
            ..UserUpdate::default()
        };
        let err = repo.update(&admin.id, &demote, None, "Nadia").await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::LastAdmin)));

        // With a second admin, demotion goes through.
        repo.create(&new_user("Omar", "omar@shop.test", Role::Admin), "h", "Nadia")
            .await
            .unwrap();
        let demoted = repo.update(&admin.id, &demote, None, "Omar").await.unwrap();
        assert_eq!(demoted.role, Role::Staff);
    }

    #[tokio::test]
    async fn test_update_password_and_email() {
        let db = db().await;
        let repo = db.users();
        let staff = repo
            .create(&new_user("Rafi", "rafi@shop.test", Role::Staff), "old", "system")
            .await
            .unwrap();
        repo.create(&new_user("Nadia", "nadia@shop.test", Role::Admin), "h", "system")
            .await
            .unwrap();

        let taken = UserUpdate {
            email: Some("nadia@shop.test".to_string()),
            ..UserUpdate::default()
        };
        assert!(matches!(
            repo.update(&staff.id, &taken, None, "Nadia").await.unwrap_err(),
            DbError::UniqueViolation { .. }
        ));

        let updated = repo
            .update(
                &staff.id,
                &UserUpdate {
                    password: Some("new-password-1".to_string()),
                    ..UserUpdate::default()
                },
                Some("new"),
                "Nadia",
            )
            .await
            .unwrap();
        assert_eq!(updated.password_hash, "new");

        repo.delete(&staff.id, "Nadia").await.unwrap();
        assert!(repo.get_by_id(&staff.id).await.unwrap().is_none());
    }
}
