//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation
//! of the collection ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use study_hub_core::domain::{
    Answer, Doubt, DoubtFilter, DoubtUpdate, NewDoubt, NewResource, Resource, ResourceFilter,
    User, UserCredentials, UserProfile, UserProfileUpdate,
};
use study_hub_core::ports::{
    AuthStore, DoubtStore, PortError, PortResult, ResourceStore, UserStore,
};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every collection port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn backend(e: sqlx::Error) -> PortError {
    PortError::Backend(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const DOUBT_COLUMNS: &str = "id, question_text, subject, asked_by, status, answers, created_at";

#[derive(FromRow)]
struct DoubtRecord {
    id: Uuid,
    question_text: String,
    subject: String,
    asked_by: Uuid,
    status: String,
    answers: Json<Vec<Answer>>,
    created_at: DateTime<Utc>,
}
impl DoubtRecord {
    fn to_domain(self) -> PortResult<Doubt> {
        Ok(Doubt {
            id: self.id,
            question_text: self.question_text,
            subject: self.subject,
            asked_by: self.asked_by,
            status: self.status.parse().map_err(PortError::Backend)?,
            answers: self.answers.0,
            timestamp: self.created_at,
        })
    }
}

const RESOURCE_COLUMNS: &str = "id, file_name, file_url, file_type, subject, category, \
     uploaded_by, uploaded_by_name, description, uploaded_at";

#[derive(FromRow)]
struct ResourceRecord {
    id: Uuid,
    file_name: String,
    file_url: String,
    file_type: String,
    subject: String,
    category: String,
    uploaded_by: Uuid,
    uploaded_by_name: String,
    description: Option<String>,
    uploaded_at: DateTime<Utc>,
}
impl ResourceRecord {
    fn to_domain(self) -> PortResult<Resource> {
        Ok(Resource {
            id: self.id,
            file_name: self.file_name,
            file_url: self.file_url,
            file_type: self.file_type,
            subject: self.subject,
            category: self.category.parse().map_err(PortError::Backend)?,
            uploaded_by: self.uploaded_by,
            uploaded_by_name: self.uploaded_by_name,
            description: self.description,
            uploaded_at: self.uploaded_at,
        })
    }
}

#[derive(FromRow)]
struct UserProfileRecord {
    uid: Uuid,
    display_name: Option<String>,
    email: Option<String>,
    profile_picture_url: Option<String>,
    class: Option<String>,
    semester: Option<String>,
    karma_points: i64,
}
impl UserProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            uid: self.uid,
            display_name: self.display_name,
            email: self.email,
            profile_picture_url: self.profile_picture_url,
            class: self.class,
            semester: self.semester,
            karma_points: self.karma_points,
        }
    }
}

#[derive(FromRow)]
struct AccountRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

//=========================================================================================
// `DoubtStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DoubtStore for DbAdapter {
    async fn insert_doubt(&self, doubt: NewDoubt) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO doubts (id, question_text, subject, asked_by, status, answers, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&doubt.question_text)
        .bind(&doubt.subject)
        .bind(doubt.asked_by)
        .bind(doubt.status.as_str())
        .bind(Json(&doubt.answers))
        .bind(doubt.timestamp)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(id)
    }

    async fn get_doubt(&self, id: Uuid) -> PortResult<Option<Doubt>> {
        let record = sqlx::query_as::<_, DoubtRecord>(&format!(
            "SELECT {} FROM doubts WHERE id = $1",
            DOUBT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        record.map(DoubtRecord::to_domain).transpose()
    }

    async fn query_doubts(&self, filter: DoubtFilter) -> PortResult<Vec<Doubt>> {
        let records = match filter {
            DoubtFilter::All => {
                sqlx::query_as::<_, DoubtRecord>(&format!(
                    "SELECT {} FROM doubts ORDER BY created_at DESC",
                    DOUBT_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
            DoubtFilter::Subject(subject) => {
                sqlx::query_as::<_, DoubtRecord>(&format!(
                    "SELECT {} FROM doubts WHERE subject = $1 ORDER BY created_at DESC",
                    DOUBT_COLUMNS
                ))
                .bind(subject)
                .fetch_all(&self.pool)
                .await
            }
            DoubtFilter::AskedBy(asked_by) => {
                sqlx::query_as::<_, DoubtRecord>(&format!(
                    "SELECT {} FROM doubts WHERE asked_by = $1 ORDER BY created_at DESC",
                    DOUBT_COLUMNS
                ))
                .bind(asked_by)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(backend)?;

        records.into_iter().map(DoubtRecord::to_domain).collect()
    }

    async fn update_doubt(&self, id: Uuid, update: DoubtUpdate) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE doubts SET \
                question_text = COALESCE($2, question_text), \
                subject = COALESCE($3, subject), \
                status = COALESCE($4, status), \
                answers = COALESCE($5, answers) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.question_text)
        .bind(update.subject)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.answers.map(Json))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Doubt {} not found", id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `ResourceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResourceStore for DbAdapter {
    async fn insert_resource(&self, resource: NewResource) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        let m = resource.metadata;
        sqlx::query(
            "INSERT INTO resources (id, file_name, file_url, file_type, subject, category, \
                uploaded_by, uploaded_by_name, description, uploaded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(id)
        .bind(m.file_name)
        .bind(m.file_url)
        .bind(m.file_type)
        .bind(m.subject)
        .bind(m.category.as_str())
        .bind(m.uploaded_by)
        .bind(m.uploaded_by_name)
        .bind(m.description)
        .bind(resource.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(id)
    }

    async fn query_resources(&self, filter: ResourceFilter) -> PortResult<Vec<Resource>> {
        let records = match filter {
            ResourceFilter::All => {
                sqlx::query_as::<_, ResourceRecord>(&format!(
                    "SELECT {} FROM resources ORDER BY uploaded_at DESC",
                    RESOURCE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
            ResourceFilter::Subject(subject) => {
                sqlx::query_as::<_, ResourceRecord>(&format!(
                    "SELECT {} FROM resources WHERE subject = $1 ORDER BY uploaded_at DESC",
                    RESOURCE_COLUMNS
                ))
                .bind(subject)
                .fetch_all(&self.pool)
                .await
            }
            ResourceFilter::Category(category) => {
                sqlx::query_as::<_, ResourceRecord>(&format!(
                    "SELECT {} FROM resources WHERE category = $1 ORDER BY uploaded_at DESC",
                    RESOURCE_COLUMNS
                ))
                .bind(category.as_str())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(backend)?;

        records.into_iter().map(ResourceRecord::to_domain).collect()
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn get_user_profile(&self, uid: Uuid) -> PortResult<Option<UserProfile>> {
        let record = sqlx::query_as::<_, UserProfileRecord>(
            "SELECT uid, display_name, email, profile_picture_url, class, semester, karma_points \
             FROM users WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(record.map(UserProfileRecord::to_domain))
    }

    async fn put_user_profile(&self, profile: UserProfile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO users (uid, display_name, email, profile_picture_url, class, semester, karma_points) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (uid) DO UPDATE SET \
                display_name = EXCLUDED.display_name, \
                email = EXCLUDED.email, \
                profile_picture_url = EXCLUDED.profile_picture_url, \
                class = EXCLUDED.class, \
                semester = EXCLUDED.semester, \
                karma_points = EXCLUDED.karma_points",
        )
        .bind(profile.uid)
        .bind(profile.display_name)
        .bind(profile.email)
        .bind(profile.profile_picture_url)
        .bind(profile.class)
        .bind(profile.semester)
        .bind(profile.karma_points)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_user_profile(&self, uid: Uuid, update: UserProfileUpdate) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET \
                display_name = COALESCE($2, display_name), \
                email = COALESCE($3, email), \
                profile_picture_url = COALESCE($4, profile_picture_url), \
                class = COALESCE($5, class), \
                semester = COALESCE($6, semester), \
                karma_points = COALESCE($7, karma_points) \
             WHERE uid = $1",
        )
        .bind(uid)
        .bind(update.display_name)
        .bind(update.email)
        .bind(update.profile_picture_url)
        .bind(update.class)
        .bind(update.semester)
        .bind(update.karma_points)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", uid)));
        }
        Ok(())
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO accounts (user_id, email, hashed_password) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PortError::Validation(format!("email {} is already registered", email))
                }
                other => backend(other),
            })?;
        Ok(User {
            user_id,
            email: email.to_string(),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT user_id, email, hashed_password FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;

        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
