//! Persistence boundary.
//!
//! Handlers and the in-process editor gateway only see these traits. The
//! Postgres implementation backs the server; the in-memory one backs tests
//! and local tooling. Both share [`plan_item_changes`] so snapshot saves
//! reconcile identically.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ItemRecord, NewUser, Palette, Resume, User, UserPreferences};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait ResumeRepository: Send + Sync {
    /// All resumes of a user, most recently updated first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError>;

    async fn find(&self, user_id: Uuid, resume_id: Uuid) -> Result<Option<Resume>, AppError>;

    /// Makes the stored resume match `snapshot` exactly and returns the
    /// persisted record. A snapshot without `id` creates a new resume.
    async fn save_snapshot(&self, snapshot: Resume) -> Result<Resume, AppError>;

    /// Returns false when no resume matched.
    async fn delete(&self, user_id: Uuid, resume_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Stored preferences, or the defaults when the user never chose any.
    async fn get(&self, user_id: Uuid) -> Result<UserPreferences, AppError>;

    async fn put(&self, user_id: Uuid, prefs: UserPreferences) -> Result<UserPreferences, AppError>;

    /// Changes only the palette in a single write and returns the stored
    /// preferences. Fields never chosen take their defaults.
    async fn set_palette(&self, user_id: Uuid, palette: Palette) -> Result<UserPreferences, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user_id: Uuid, new_user: &NewUser) -> Result<User, AppError>;

    async fn find(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Deletes the account and, by cascade, its resumes and preferences.
    async fn delete(&self, user_id: Uuid) -> Result<bool, AppError>;
}

/// Row-level changes needed to make a resume's items match a snapshot.
#[derive(Debug, Default, PartialEq)]
pub struct ItemChanges {
    pub inserts: Vec<ItemRecord>,
    pub updates: Vec<ItemRecord>,
    pub deletes: Vec<Uuid>,
}

/// Splits incoming records into inserts, updates and deletes.
///
/// Records whose `id` is unknown to this resume are treated as new and get a
/// fresh id, so a client cannot address rows of another resume. Every record
/// in the result carries `Some(id)`.
pub fn plan_item_changes(existing: &HashSet<Uuid>, incoming: Vec<ItemRecord>) -> ItemChanges {
    let mut changes = ItemChanges::default();
    let mut kept: HashSet<Uuid> = HashSet::new();

    for mut record in incoming {
        match record.id {
            Some(id) if existing.contains(&id) && kept.insert(id) => changes.updates.push(record),
            other => {
                if let Some(stale) = other {
                    warn!("Ignoring unknown item id {stale} in snapshot; assigning a new id");
                }
                record.id = Some(Uuid::new_v4());
                changes.inserts.push(record);
            }
        }
    }

    changes.deletes = existing.iter().filter(|id| !kept.contains(id)).copied().collect();
    changes.deletes.sort();
    changes
}
