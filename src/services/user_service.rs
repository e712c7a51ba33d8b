use serde::Serialize;
use serde_json::Value;
use sqlx::mysql::MySqlPool;
use tracing::{info, warn};

use super::{ServiceError, ServiceResult};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::database::assembler::{Fallback, FieldSpec, Projection, WriteSet};
use crate::database::record::Record;
use crate::database::schema::{ColumnMap, SchemaProbe, SchemaProber};
use crate::database::SqlResult;

const TABLE: &str = "users";

pub const ROLES: &[&str] = &["admin", "editor", "viewer"];

/// Password hash column names, newer name first
const PASSWORD_COLUMNS: &[&str] = &["password_hash", "password"];

const WRITE_COLUMNS: &[&str] = &["email", "name", "password_hash", "password", "role"];

/// A back-office account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

impl User {
    fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: record.id()?,
            email: record.get_str("email")?.to_string(),
            name: record.get_str("name").unwrap_or_default().to_string(),
            role: record.get_str("role").unwrap_or("admin").to_string(),
            avatar: record.get_str("avatar").map(str::to_string),
            password_hash: record.get_str("password_hash").map(str::to_string),
        })
    }
}

fn projection() -> Projection {
    Projection::new()
        .field("id")
        .field("email")
        .with(FieldSpec::new("name").column("name").column("username").fallback(Fallback::EmptyString))
        .with(FieldSpec::new("role").column("role").fallback(Fallback::Expr("'admin'".to_string())))
        .field("avatar")
        .with(FieldSpec::new("password_hash").column("password_hash").column("password"))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService {
    pool: MySqlPool,
    prober: SchemaProber,
}

impl UserService {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            prober: SchemaProber::new(pool.clone()),
            pool,
        }
    }

    async fn find_where(&self, column: &str, value: Value) -> ServiceResult<Option<User>> {
        let projection = projection();
        let columns = self.prober.detect_columns(TABLE, &projection.columns()).await?;
        let sql = SqlResult::new(
            format!("SELECT {} FROM `users` WHERE `{column}` = ? LIMIT 1", projection.to_sql(&columns)),
            vec![value],
        );
        Ok(sql.fetch_optional(&self.pool).await?.as_ref().and_then(User::from_record))
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        self.find_where("email", Value::from(normalize_email(email))).await
    }

    pub async fn find_by_id(&self, id: i64) -> ServiceResult<Option<User>> {
        self.find_where("id", Value::from(id)).await
    }

    /// The user when the password matches, `None` for an unknown email or a
    /// wrong password. Callers must not tell the two apart in responses.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Option<User>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let Some(hash) = user.password_hash.as_deref() else {
            warn!(user_id = user.id, "User has no password hash");
            return Ok(None);
        };

        let matches = match verify_password(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(user_id = user.id, "Stored password hash is unusable: {}", e);
                false
            }
        };
        if !matches {
            return Ok(None);
        }

        self.record_login(user.id).await?;
        Ok(Some(user))
    }

    async fn record_login(&self, id: i64) -> ServiceResult<()> {
        if self.prober.column_exists(TABLE, "last_login").await? {
            SqlResult::new("UPDATE `users` SET `last_login` = NOW() WHERE `id` = ?", vec![Value::from(id)])
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn write_columns(&self) -> ServiceResult<ColumnMap> {
        Ok(self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?)
    }

    pub async fn create(&self, email: &str, password: &str, name: &str, role: &str) -> ServiceResult<User> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(ServiceError::Invalid(format!("Invalid email address: {email}")));
        }
        if !ROLES.contains(&role) {
            return Err(ServiceError::Invalid(format!("Role must be one of {}", ROLES.join(", "))));
        }
        validate_password_strength(password).map_err(ServiceError::Invalid)?;
        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Invalid(format!("User already exists: {email}")));
        }

        let hash = hash_password(password)?;
        let columns = self.write_columns().await?;
        let mut write = WriteSet::new(&columns);
        write.set("email", email.as_str());
        write.set("name", name);
        write.set("role", role);
        write.set_preferred(&[(PASSWORD_COLUMNS[0], Value::from(hash.as_str())), (PASSWORD_COLUMNS[1], Value::from(hash.as_str()))])
            .ok_or_else(|| ServiceError::Invalid("users table has no password column".to_string()))?;

        let result = write.insert_sql().execute(&self.pool).await?;
        let id = result.last_insert_id() as i64;
        info!(table = TABLE, id, email = %email, role, "Created user");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found after insert")))
    }

    pub async fn set_password(&self, email: &str, password: &str) -> ServiceResult<()> {
        validate_password_strength(password).map_err(ServiceError::Invalid)?;
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", normalize_email(email))))?;

        let hash = hash_password(password)?;
        let columns = self.write_columns().await?;
        let mut write = WriteSet::new(&columns);
        write.set_preferred(&[(PASSWORD_COLUMNS[0], Value::from(hash.as_str())), (PASSWORD_COLUMNS[1], Value::from(hash.as_str()))]);
        if let Some(sql) = write.update_sql("id", user.id) {
            sql.execute(&self.pool).await?;
        }
        info!(table = TABLE, id = user.id, "Changed user password");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_password_column_is_read_as_hash() {
        let columns = ColumnMap::new(
            TABLE,
            [("id", true), ("email", true), ("username", true), ("password", true), ("password_hash", false)],
        );
        let sql = projection().to_sql(&columns);
        assert!(sql.contains("`password` AS `password_hash`"));
        assert!(sql.contains("`username` AS `name`"));
        assert!(sql.contains("'admin' AS `role`"));
    }

    #[test]
    fn hash_is_never_serialized() {
        let record = Record::from(
            json!({ "id": 1, "email": "a@b.co", "role": "editor", "password_hash": "$argon2id$x" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let user = User::from_record(&record).unwrap();
        assert_eq!(user.password_hash.as_deref(), Some("$argon2id$x"));
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], json!("editor"));
    }

    #[test]
    fn emails_are_case_insensitive() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
    }
}
