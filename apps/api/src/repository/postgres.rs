use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ItemRecord, NewUser, Palette, Resume, SectionKind, User, UserPreferences};
use crate::repository::{plan_item_changes, PreferenceRepository, ResumeRepository, UserRepository};

#[derive(Debug, FromRow)]
struct ResumeRow {
    id: Uuid,
    user_id: Uuid,
    header: Value,
    profile: Value,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    resume_id: Uuid,
    section: String,
    client_id: Uuid,
    position: i32,
    start_date: Option<NaiveDate>,
    data: Value,
}

#[derive(Debug, FromRow)]
struct PreferencesRow {
    palette: String,
    banner_color: String,
    language: String,
}

impl PreferencesRow {
    /// Values written by older releases may no longer parse; fall back per field.
    fn into_preferences(self) -> UserPreferences {
        let defaults = UserPreferences::default();
        UserPreferences {
            palette: self.palette.parse().unwrap_or(defaults.palette),
            banner_color: self.banner_color.parse().unwrap_or(defaults.banner_color),
            language: self.language.parse().unwrap_or(defaults.language),
        }
    }
}

impl ItemRow {
    fn into_record(self) -> Option<ItemRecord> {
        match self.section.parse::<SectionKind>() {
            Ok(section) => Some(ItemRecord {
                id: Some(self.id),
                section,
                client_id: self.client_id,
                position: self.position,
                start_date: self.start_date,
                data: self.data,
            }),
            Err(e) => {
                warn!("Skipping item {}: {e}", self.id);
                None
            }
        }
    }
}

fn corrupt(e: serde_json::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("corrupt resume row: {e}"))
}

fn assemble(row: ResumeRow, items: Vec<ItemRecord>) -> Result<Resume, AppError> {
    let shell = Resume {
        id: Some(row.id),
        user_id: row.user_id,
        header: serde_json::from_value(row.header).map_err(corrupt)?,
        profile: serde_json::from_value(row.profile).map_err(corrupt)?,
        updated_at: Some(row.updated_at),
        ..Resume::default()
    };
    Resume::from_records(shell, &items).map_err(corrupt)
}

/// Ids of stored items a snapshot can update or delete.
///
/// Rows with a section this build does not know are never returned by reads,
/// so no snapshot can mention them; they are left out here to keep a save
/// from deleting them.
fn reconcilable_ids(rows: Vec<(Uuid, String)>) -> HashSet<Uuid> {
    rows.into_iter()
        .filter(|(_, section)| section.parse::<SectionKind>().is_ok())
        .map(|(id, _)| id)
        .collect()
}

/// Maps constraint violations to user-facing errors; everything else stays a
/// database error.
fn map_write_error(e: sqlx::Error, subject: &str) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("23503") => return AppError::NotFound(format!("{subject}: owning user not found")),
            Some("23505") => return AppError::Conflict(format!("{subject} already exists")),
            _ => {}
        }
    }
    AppError::Database(e)
}

/// sqlx-backed implementation of the repository traits.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, resume_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ItemRecord>>, AppError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, resume_id, section, client_id, position, start_date, data
            FROM resume_items
            WHERE resume_id = ANY($1)
            ORDER BY position ASC, start_date DESC NULLS LAST
            "#,
        )
        .bind(resume_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<ItemRecord>> = HashMap::new();
        for row in rows {
            let resume_id = row.resume_id;
            if let Some(record) = row.into_record() {
                grouped.entry(resume_id).or_default().push(record);
            }
        }
        Ok(grouped)
    }
}

#[async_trait]
impl ResumeRepository for PgRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, user_id, header, profile, updated_at FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let own = items.remove(&row.id).unwrap_or_default();
                assemble(row, own)
            })
            .collect()
    }

    async fn find(&self, user_id: Uuid, resume_id: Uuid) -> Result<Option<Resume>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT id, user_id, header, profile, updated_at FROM resumes WHERE id = $1 AND user_id = $2",
        )
        .bind(resume_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.load_items(&[row.id]).await?.remove(&row.id).unwrap_or_default();
        assemble(row, items).map(Some)
    }

    async fn save_snapshot(&self, snapshot: Resume) -> Result<Resume, AppError> {
        let records = snapshot
            .to_records()
            .map_err(|e| AppError::Validation(format!("unserializable item: {e}")))?;
        let header = serde_json::to_value(&snapshot.header).map_err(|e| AppError::Internal(e.into()))?;
        let profile = serde_json::to_value(&snapshot.profile).map_err(|e| AppError::Internal(e.into()))?;

        let mut tx = self.pool.begin().await?;

        let resume_id = match snapshot.id {
            Some(id) => {
                let owner: Option<Uuid> =
                    sqlx::query_scalar("SELECT user_id FROM resumes WHERE id = $1 FOR UPDATE")
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await?;
                if owner != Some(snapshot.user_id) {
                    return Err(AppError::NotFound(format!("Resume {id} not found")));
                }
                sqlx::query("UPDATE resumes SET header = $2, profile = $3, updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(&header)
                    .bind(&profile)
                    .execute(&mut *tx)
                    .await?;
                id
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query("INSERT INTO resumes (id, user_id, header, profile) VALUES ($1, $2, $3, $4)")
                    .bind(id)
                    .bind(snapshot.user_id)
                    .bind(&header)
                    .bind(&profile)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_write_error(e, "Resume"))?;
                info!("Created resume {id} for user {}", snapshot.user_id);
                id
            }
        };

        let existing: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, section FROM resume_items WHERE resume_id = $1")
                .bind(resume_id)
                .fetch_all(&mut *tx)
                .await?;
        let existing = reconcilable_ids(existing);
        let changes = plan_item_changes(&existing, records);

        if !changes.deletes.is_empty() {
            sqlx::query("DELETE FROM resume_items WHERE id = ANY($1)")
                .bind(&changes.deletes)
                .execute(&mut *tx)
                .await?;
        }

        for record in &changes.updates {
            sqlx::query(
                r#"
                UPDATE resume_items
                SET section = $2, client_id = $3, position = $4, start_date = $5, data = $6
                WHERE id = $1
                "#,
            )
            .bind(record.id)
            .bind(record.section.as_str())
            .bind(record.client_id)
            .bind(record.position)
            .bind(record.start_date)
            .bind(&record.data)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "Resume item"))?;
        }

        for record in &changes.inserts {
            sqlx::query(
                r#"
                INSERT INTO resume_items
                    (id, resume_id, section, client_id, position, start_date, data)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(record.id)
            .bind(resume_id)
            .bind(record.section.as_str())
            .bind(record.client_id)
            .bind(record.position)
            .bind(record.start_date)
            .bind(&record.data)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "Resume item"))?;
        }

        tx.commit().await?;

        info!(
            resume_id = %resume_id,
            inserted = changes.inserts.len(),
            updated = changes.updates.len(),
            deleted = changes.deletes.len(),
            "Saved resume snapshot"
        );

        ResumeRepository::find(self, snapshot.user_id, resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
    }

    async fn delete(&self, user_id: Uuid, resume_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(resume_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PreferenceRepository for PgRepository {
    async fn get(&self, user_id: Uuid) -> Result<UserPreferences, AppError> {
        let row = sqlx::query_as::<_, PreferencesRow>(
            "SELECT palette, banner_color, language FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PreferencesRow::into_preferences).unwrap_or_default())
    }

    async fn put(&self, user_id: Uuid, prefs: UserPreferences) -> Result<UserPreferences, AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, palette, banner_color, language)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET palette = EXCLUDED.palette,
                banner_color = EXCLUDED.banner_color,
                language = EXCLUDED.language,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(prefs.palette.as_str())
        .bind(prefs.banner_color.as_str())
        .bind(prefs.language.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Preferences"))?;
        Ok(prefs)
    }

    async fn set_palette(&self, user_id: Uuid, palette: Palette) -> Result<UserPreferences, AppError> {
        let defaults = UserPreferences::default();
        let row = sqlx::query_as::<_, PreferencesRow>(
            r#"
            INSERT INTO user_preferences (user_id, palette, banner_color, language)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET palette = EXCLUDED.palette,
                updated_at = now()
            RETURNING palette, banner_color, language
            "#,
        )
        .bind(user_id)
        .bind(palette.as_str())
        .bind(defaults.banner_color.as_str())
        .bind(defaults.language.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Preferences"))?;
        Ok(row.into_preferences())
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn create(&self, user_id: Uuid, new_user: &NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email) VALUES ($1, $2, $3) RETURNING id, username, email, created_at",
        )
        .bind(user_id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "User"))
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT id, username, email, created_at FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
