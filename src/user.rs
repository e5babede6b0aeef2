use std::str::FromStr;

use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    progress::{CompletionStatus, Progress, ProgressUpdate},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(format!("unknown role {s:?}")),
        }
    }
}

/// User as returned by the API. Email and password hash are never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub uuid: String,
    pub name: String,
    pub nis: Option<String>,
    pub role: Role,
    pub school: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub status: CompletionStatus,
    pub progress: Progress,
    /// Lesson paths in the order they were completed
    pub completed_lessons: Vec<String>,
}

#[derive(FromRow)]
struct UserRow {
    uuid: String,
    name: String,
    nis: Option<String>,
    role: String,
    school: Option<String>,
    #[sqlx(rename = "class")]
    class_name: Option<String>,
    status: String,
    progress: i64,
    completed_lessons: String,
}

impl TryFrom<UserRow> for UserInfo {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let corrupt = |e: String| anyhow::anyhow!("corrupt record for user {}: {}", row.uuid, e);
        let role = row.role.parse::<Role>().map_err(corrupt)?;
        let status = row.status.parse::<CompletionStatus>().map_err(corrupt)?;
        let progress = Progress::try_from(row.progress).map_err(|e| corrupt(e.to_string()))?;
        let completed_lessons =
            parse_lessons(&row.completed_lessons).map_err(|e| corrupt(e.to_string()))?;
        Ok(UserInfo {
            uuid: row.uuid,
            name: row.name,
            nis: row.nis,
            role,
            school: row.school,
            class_name: row.class_name,
            status,
            progress,
            completed_lessons,
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub nis: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub school: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    /// Ignored when `progress` is given. Without `progress` the status is
    /// stored as sent, so an admin may mark a learner SELESAI at any progress.
    pub status: Option<CompletionStatus>,
    pub progress: Option<i64>,
    pub completed_lessons: Option<Vec<String>>,
}

/// Partial update, absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub nis: Option<String>,
    pub role: Option<Role>,
    pub school: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    /// Ignored when `progress` is given. Without `progress` the status is
    /// stored as sent, so an admin may mark a learner SELESAI at any progress.
    pub status: Option<CompletionStatus>,
    pub progress: Option<i64>,
    pub completed_lessons: Option<Vec<String>>,
}

fn parse_lessons(s: &str) -> serde_json::Result<Vec<String>> {
    serde_json::from_str(s)
}

fn encode_lessons(lessons: &[String]) -> Result<String> {
    serde_json::to_string(lessons).map_err(|e| anyhow::Error::from(e).into())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

fn map_unique_violation(e: sqlx::Error, email: Option<&str>) -> Error {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::InvalidInput(
            format!("email {} is already registered", email.unwrap_or_default()),
        ),
        e => e.into(),
    }
}

/// Learners (role `user`), optionally restricted to one class
pub async fn list_learners(
    database: &SqlitePool,
    class_name: Option<&str>,
) -> Result<Vec<UserInfo>> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT uuid, name, nis, role, school, class, status, progress, completed_lessons
         FROM users WHERE role = 'user' AND (? IS NULL OR class = ?) ORDER BY rowid",
    )
    .bind(class_name)
    .bind(class_name)
    .fetch_all(database)
    .await?;
    rows.into_iter().map(UserInfo::try_from).collect()
}

/// Distinct non-empty classes of learners, ascending
pub async fn list_classes(database: &SqlitePool) -> Result<Vec<String>> {
    let classes = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT class FROM users
         WHERE role = 'user' AND class IS NOT NULL AND class <> '' ORDER BY class ASC",
    )
    .fetch_all(database)
    .await?;
    Ok(classes)
}

pub async fn get_user(database: &SqlitePool, uuid: &str) -> Result<UserInfo> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT uuid, name, nis, role, school, class, status, progress, completed_lessons
         FROM users WHERE uuid = ?",
    )
    .bind(uuid)
    .fetch_optional(database)
    .await?
    .ok_or_else(|| Error::UserNotFound(uuid.to_string()))?;
    row.try_into()
}

pub async fn ensure_user(database: &SqlitePool, uuid: &str) -> Result<()> {
    sqlx::query_scalar::<_, i64>("SELECT 1 FROM users WHERE uuid = ?")
        .bind(uuid)
        .fetch_optional(database)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::UserNotFound(uuid.to_string()))
}

pub async fn get_completed_lessons(database: &SqlitePool, uuid: &str) -> Result<Vec<String>> {
    let lessons = sqlx::query_scalar::<_, String>("SELECT completed_lessons FROM users WHERE uuid = ?")
        .bind(uuid)
        .fetch_optional(database)
        .await?
        .ok_or_else(|| Error::UserNotFound(uuid.to_string()))?;
    parse_lessons(&lessons).map_err(|e| anyhow::anyhow!("corrupt record for user {}: {}", uuid, e).into())
}

/// Create a user and return its uuid
pub async fn create_user(database: &SqlitePool, user: NewUser) -> Result<String> {
    require_non_empty("name", &user.name)?;
    require_non_empty("email", &user.email)?;
    require_non_empty("password", &user.password)?;
    let (progress, status) = match user.progress {
        Some(progress) => {
            let progress = Progress::try_from(progress)?;
            (progress, CompletionStatus::from_progress(progress))
        }
        None => (Progress::default(), user.status.unwrap_or_default()),
    };
    let completed_lessons = encode_lessons(user.completed_lessons.as_deref().unwrap_or_default())?;
    let password_hash = hash_password(&user.password)?;
    let uuid = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO users
         (uuid, name, email, nis, password, role, school, class, status, progress, completed_lessons)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&uuid)
    .bind(user.name.as_str())
    .bind(user.email.as_str())
    .bind(user.nis.as_deref())
    .bind(password_hash)
    .bind(user.role.as_str())
    .bind(user.school.as_deref())
    .bind(user.class_name.as_deref())
    .bind(status.as_str())
    .bind(i64::from(progress))
    .bind(completed_lessons)
    .execute(database)
    .await
    .map_err(|e| map_unique_violation(e, Some(user.email.as_str())))?;
    info!("created {} {}", user.role.as_str(), uuid);
    Ok(uuid)
}

pub async fn update_user(database: &SqlitePool, uuid: &str, user: UserUpdate) -> Result<()> {
    ensure_user(database, uuid).await?;
    for (field, value) in [
        ("name", &user.name),
        ("email", &user.email),
        ("password", &user.password),
    ] {
        if let Some(value) = value {
            require_non_empty(field, value)?;
        }
    }
    let progress = user.progress.map(Progress::try_from).transpose()?;
    let status = progress.map(CompletionStatus::from_progress).or(user.status);
    let password_hash = user.password.as_deref().map(hash_password).transpose()?;
    let completed_lessons = user
        .completed_lessons
        .as_deref()
        .map(encode_lessons)
        .transpose()?;
    let result = sqlx::query(
        "UPDATE users SET
            name = COALESCE(?, name),
            email = COALESCE(?, email),
            nis = COALESCE(?, nis),
            password = COALESCE(?, password),
            role = COALESCE(?, role),
            school = COALESCE(?, school),
            class = COALESCE(?, class),
            status = COALESCE(?, status),
            progress = COALESCE(?, progress),
            completed_lessons = COALESCE(?, completed_lessons),
            updated_at = CURRENT_TIMESTAMP
         WHERE uuid = ?",
    )
    .bind(user.name.as_deref())
    .bind(user.email.as_deref())
    .bind(user.nis.as_deref())
    .bind(password_hash)
    .bind(user.role.map(Role::as_str))
    .bind(user.school.as_deref())
    .bind(user.class_name.as_deref())
    .bind(status.map(CompletionStatus::as_str))
    .bind(progress.map(i64::from))
    .bind(completed_lessons)
    .bind(uuid)
    .execute(database)
    .await
    .map_err(|e| map_unique_violation(e, user.email.as_deref()))?;
    if result.rows_affected() == 0 {
        return Err(Error::UserNotFound(uuid.to_string()));
    }
    info!("updated user {}", uuid);
    Ok(())
}

pub async fn delete_user(database: &SqlitePool, uuid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE uuid = ?")
        .bind(uuid)
        .execute(database)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::UserNotFound(uuid.to_string()));
    }
    info!("deleted user {}", uuid);
    Ok(())
}

pub async fn update_progress(
    database: &SqlitePool,
    uuid: &str,
    update: ProgressUpdate,
) -> Result<()> {
    let completed_lessons = update
        .completed_lessons
        .as_deref()
        .map(encode_lessons)
        .transpose()?;
    let result = sqlx::query(
        "UPDATE users SET
            progress = ?,
            status = ?,
            completed_lessons = COALESCE(?, completed_lessons),
            updated_at = CURRENT_TIMESTAMP
         WHERE uuid = ?",
    )
    .bind(i64::from(update.progress))
    .bind(update.status.as_str())
    .bind(completed_lessons)
    .bind(uuid)
    .execute(database)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::UserNotFound(uuid.to_string()));
    }
    info!("user {} progress {} ({})", uuid, update.progress, update.status);
    Ok(())
}

/// Check credentials and return the user's uuid
pub async fn login(database: &SqlitePool, email: &str, password: &str) -> Result<String> {
    let user = sqlx::query_as::<_, (String, String)>("SELECT uuid, password FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(database)
        .await?;
    let Some((uuid, password_hash)) = user else {
        warn!("login attempt for an unknown account");
        return Err(Error::InvalidCredentials);
    };
    let parsed_hash = PasswordHash::new(&password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("wrong password for user {}", uuid);
        return Err(Error::InvalidCredentials);
    }
    Ok(uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, progress::InvalidRangeError};

    fn learner(name: &str, email: &str, class_name: Option<&str>) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "rahasia".to_string(),
            nis: Some("12345".to_string()),
            role: Role::User,
            school: Some("SMK 1".to_string()),
            class_name: class_name.map(str::to_string),
            status: None,
            progress: None,
            completed_lessons: None,
        }
    }

    #[tokio::test]
    async fn create_and_get() {
        let database = db::memory().await.unwrap();
        let uuid = create_user(&database, learner("Ani", "ani@example.com", Some("XI RPL")))
            .await
            .unwrap();
        let user = get_user(&database, &uuid).await.unwrap();
        assert_eq!(user.name, "Ani");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.class_name.as_deref(), Some("XI RPL"));
        assert_eq!(user.progress, Progress::default());
        assert_eq!(user.status, CompletionStatus::NotCompleted);
        assert!(user.completed_lessons.is_empty());

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["class"], "XI RPL");
        assert_eq!(json["status"], "BELUM SELESAI");
        assert_eq!(json["completedLessons"], serde_json::json!([]));
        assert!(json.get("email").is_none());
        assert!(json.get("password").is_none());
    }

    #[tokio::test]
    async fn create_derives_status_from_progress() {
        let database = db::memory().await.unwrap();
        let mut user = learner("Budi", "budi@example.com", None);
        user.progress = Some(100);
        user.status = Some(CompletionStatus::NotCompleted);
        let uuid = create_user(&database, user).await.unwrap();
        assert_eq!(
            get_user(&database, &uuid).await.unwrap().status,
            CompletionStatus::Completed
        );

        let mut user = learner("Citra", "citra@example.com", None);
        user.progress = Some(101);
        assert!(matches!(
            create_user(&database, user).await,
            Err(Error::InvalidRange(_))
        ));
    }

    #[tokio::test]
    async fn status_without_progress_is_stored_as_sent() {
        let database = db::memory().await.unwrap();
        let mut user = learner("Dewi", "dewi@example.com", None);
        user.status = Some(CompletionStatus::Completed);
        let uuid = create_user(&database, user).await.unwrap();
        let stored = get_user(&database, &uuid).await.unwrap();
        assert_eq!(stored.status, CompletionStatus::Completed);
        assert_eq!(stored.progress, Progress::default());

        let update = UserUpdate {
            status: Some(CompletionStatus::NotCompleted),
            ..Default::default()
        };
        update_user(&database, &uuid, update).await.unwrap();
        let stored = get_user(&database, &uuid).await.unwrap();
        assert_eq!(stored.status, CompletionStatus::NotCompleted);
        assert_eq!(stored.progress, Progress::default());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let database = db::memory().await.unwrap();
        create_user(&database, learner("Ani", "ani@example.com", None))
            .await
            .unwrap();
        let err = create_user(&database, learner("Ani 2", "ani@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
        let err = create_user(&database, learner(" ", "x@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
    }

    #[tokio::test]
    async fn learners_and_classes() {
        let database = db::memory().await.unwrap();
        create_user(&database, learner("A", "a@example.com", Some("XII"))).await.unwrap();
        create_user(&database, learner("B", "b@example.com", Some("X"))).await.unwrap();
        create_user(&database, learner("C", "c@example.com", Some("XII"))).await.unwrap();
        create_user(&database, learner("D", "d@example.com", Some(""))).await.unwrap();
        create_user(&database, learner("E", "e@example.com", None)).await.unwrap();
        let mut admin = learner("Guru", "guru@example.com", Some("STAFF"));
        admin.role = Role::Admin;
        create_user(&database, admin).await.unwrap();

        let all = list_learners(&database, None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|u| u.role == Role::User));

        let names: Vec<_> = list_learners(&database, Some("XII"))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);

        assert_eq!(list_classes(&database).await.unwrap(), vec!["X", "XII"]);
    }

    #[tokio::test]
    async fn partial_update() {
        let database = db::memory().await.unwrap();
        let uuid = create_user(&database, learner("Ani", "ani@example.com", Some("X")))
            .await
            .unwrap();
        update_user(
            &database,
            &uuid,
            UserUpdate {
                school: Some("SMA 2".to_string()),
                password: Some("baru".to_string()),
                progress: Some(100),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let user = get_user(&database, &uuid).await.unwrap();
        assert_eq!(user.name, "Ani");
        assert_eq!(user.class_name.as_deref(), Some("X"));
        assert_eq!(user.school.as_deref(), Some("SMA 2"));
        assert_eq!(user.status, CompletionStatus::Completed);
        assert!(login(&database, "ani@example.com", "rahasia").await.is_err());
        assert_eq!(login(&database, "ani@example.com", "baru").await.unwrap(), uuid);

        update_user(
            &database,
            &uuid,
            UserUpdate {
                status: Some(CompletionStatus::NotCompleted),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let user = get_user(&database, &uuid).await.unwrap();
        assert_eq!(user.status, CompletionStatus::NotCompleted);
        assert_eq!(user.progress.value(), 100);

        let err = update_user(&database, "missing", UserUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
        let err = update_user(
            &database,
            &uuid,
            UserUpdate {
                progress: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRange(InvalidRangeError(-1))));
    }

    #[tokio::test]
    async fn progress_is_persisted() {
        let database = db::memory().await.unwrap();
        let uuid = create_user(&database, learner("Ani", "ani@example.com", None))
            .await
            .unwrap();
        let lessons = vec![
            "/materi/bab1/pengenalan".to_string(),
            "/materi/bab1/struktur-kode".to_string(),
        ];
        let update = ProgressUpdate::new(40, Some(lessons.clone())).unwrap();
        update_progress(&database, &uuid, update).await.unwrap();
        assert_eq!(get_completed_lessons(&database, &uuid).await.unwrap(), lessons);

        // lessons left out of the update stay as they were
        update_progress(&database, &uuid, ProgressUpdate::new(100, None).unwrap())
            .await
            .unwrap();
        let user = get_user(&database, &uuid).await.unwrap();
        assert_eq!(user.completed_lessons, lessons);
        assert_eq!(user.status, CompletionStatus::Completed);

        let err = update_progress(&database, "missing", ProgressUpdate::new(1, None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn delete_and_login() {
        let database = db::memory().await.unwrap();
        let uuid = create_user(&database, learner("Ani", "ani@example.com", None))
            .await
            .unwrap();
        assert_eq!(login(&database, "ani@example.com", "rahasia").await.unwrap(), uuid);
        assert!(matches!(
            login(&database, "nobody@example.com", "rahasia").await,
            Err(Error::InvalidCredentials)
        ));
        delete_user(&database, &uuid).await.unwrap();
        assert!(matches!(
            get_user(&database, &uuid).await,
            Err(Error::UserNotFound(_))
        ));
        assert!(matches!(
            delete_user(&database, &uuid).await,
            Err(Error::UserNotFound(_))
        ));
        assert!(matches!(
            get_completed_lessons(&database, &uuid).await,
            Err(Error::UserNotFound(_))
        ));
    }
}
