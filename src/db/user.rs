use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// An account record.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    /// bcrypt digest of the currently valid refresh token, if any.
    pub refresh_token_hash: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    uuid: String,
    email: String,
    name: String,
    password_hash: String,
    refresh_token_hash: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            refresh_token_hash: row.refresh_token_hash,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new account. Returns the account ID.
    /// Fails on a duplicate email via the unique index.
    pub async fn create(
        &self,
        uuid: &str,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (uuid, email, name, password_hash) VALUES (?, ?, ?, ?)")
                .bind(uuid)
                .bind(email)
                .bind(name)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get an account by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, email, name, password_hash, refresh_token_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Get an account by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, uuid, email, name, password_hash, refresh_token_hash FROM users WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Account::from))
    }

    /// Overwrite the stored refresh-token digest. `None` clears it (logout).
    pub async fn set_refresh_hash(
        &self,
        id: i64,
        digest: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(digest)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored refresh-token digest only if it still equals
    /// `old_digest`. Returns false when another rotation got there first.
    pub async fn rotate_refresh_hash(
        &self,
        id: i64,
        old_digest: &str,
        new_digest: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = ?, updated_at = datetime('now') \
             WHERE id = ? AND refresh_token_hash = ?",
        )
        .bind(new_digest)
        .bind(id)
        .bind(old_digest)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
