use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Header, ItemRecord, NewUser, Palette, Profile, Resume, User, UserPreferences};
use crate::repository::{plan_item_changes, PreferenceRepository, ResumeRepository, UserRepository};

struct StoredResume {
    id: Uuid,
    user_id: Uuid,
    header: Header,
    profile: Profile,
    items: Vec<ItemRecord>,
    updated_at: DateTime<Utc>,
}

impl StoredResume {
    fn to_resume(&self) -> Result<Resume, AppError> {
        let shell = Resume {
            id: Some(self.id),
            user_id: self.user_id,
            header: self.header.clone(),
            profile: self.profile.clone(),
            updated_at: Some(self.updated_at),
            ..Resume::default()
        };
        Resume::from_records(shell, &self.items)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt stored item: {e}")))
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    preferences: HashMap<Uuid, UserPreferences>,
    resumes: HashMap<Uuid, StoredResume>,
    last_write: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing write timestamps so "most recent" is never a tie.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_write {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        self.last_write = Some(ts);
        ts
    }

    fn require_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {user_id} not found")))
        }
    }
}

/// Process-local implementation of every repository trait.
///
/// Mirrors the relational constraints: resumes and preferences need an
/// existing user, and deleting a user cascades.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResumeRepository for MemoryRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError> {
        let tables = self.tables.read().await;
        let mut owned: Vec<&StoredResume> =
            tables.resumes.values().filter(|r| r.user_id == user_id).collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        owned.into_iter().map(StoredResume::to_resume).collect()
    }

    async fn find(&self, user_id: Uuid, resume_id: Uuid) -> Result<Option<Resume>, AppError> {
        let tables = self.tables.read().await;
        match tables.resumes.get(&resume_id) {
            Some(r) if r.user_id == user_id => r.to_resume().map(Some),
            _ => Ok(None),
        }
    }

    async fn save_snapshot(&self, snapshot: Resume) -> Result<Resume, AppError> {
        let records = snapshot
            .to_records()
            .map_err(|e| AppError::Validation(format!("unserializable item: {e}")))?;

        let mut tables = self.tables.write().await;
        tables.require_user(snapshot.user_id)?;
        let updated_at = tables.tick();

        let resume_id = match snapshot.id {
            Some(id) => match tables.resumes.get(&id) {
                Some(existing) if existing.user_id == snapshot.user_id => id,
                _ => return Err(AppError::NotFound(format!("Resume {id} not found"))),
            },
            None => Uuid::new_v4(),
        };

        let existing: HashSet<Uuid> = tables
            .resumes
            .get(&resume_id)
            .map(|r| r.items.iter().filter_map(|i| i.id).collect())
            .unwrap_or_default();
        let changes = plan_item_changes(&existing, records);

        let mut items = changes.updates;
        items.extend(changes.inserts);

        let stored = StoredResume {
            id: resume_id,
            user_id: snapshot.user_id,
            header: snapshot.header,
            profile: snapshot.profile,
            items,
            updated_at,
        };
        let resume = stored.to_resume()?;
        tables.resumes.insert(resume_id, stored);
        Ok(resume)
    }

    async fn delete(&self, user_id: Uuid, resume_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.resumes.get(&resume_id) {
            Some(r) if r.user_id == user_id => {
                tables.resumes.remove(&resume_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PreferenceRepository for MemoryRepository {
    async fn get(&self, user_id: Uuid) -> Result<UserPreferences, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.preferences.get(&user_id).copied().unwrap_or_default())
    }

    async fn put(&self, user_id: Uuid, prefs: UserPreferences) -> Result<UserPreferences, AppError> {
        let mut tables = self.tables.write().await;
        tables.require_user(user_id)?;
        tables.preferences.insert(user_id, prefs);
        Ok(prefs)
    }

    async fn set_palette(&self, user_id: Uuid, palette: Palette) -> Result<UserPreferences, AppError> {
        let mut tables = self.tables.write().await;
        tables.require_user(user_id)?;
        let stored = tables.preferences.entry(user_id).or_default();
        stored.palette = palette;
        Ok(*stored)
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create(&self, user_id: Uuid, new_user: &NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user_id) {
            return Err(AppError::Conflict(format!("User {user_id} already exists")));
        }
        if tables.users.values().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' is taken",
                new_user.username
            )));
        }
        let created_at = tables.tick();
        let user = User {
            id: user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            created_at,
        };
        tables.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        tables.preferences.remove(&user_id);
        tables.resumes.retain(|_, r| r.user_id != user_id);
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use super::seed::with_user;
    use super::*;
    use crate::models::resume::fixtures::{sample_resume, skill};
    use crate::models::SectionKind;

    #[tokio::test]
    async fn test_first_save_assigns_ids() {
        let (repo, user_id) = with_user().await;
        let saved = repo.save_snapshot(sample_resume(user_id)).await.unwrap();
        assert!(saved.id.is_some());
        assert!(saved.skills.iter().all(|s| s.id.is_some()));
        assert!(saved.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_resave_is_idempotent() {
        let (repo, user_id) = with_user().await;
        let first = repo.save_snapshot(sample_resume(user_id)).await.unwrap();
        let mut second = repo.save_snapshot(first.clone()).await.unwrap();
        second.updated_at = first.updated_at;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_removed_items_are_deleted() {
        let (repo, user_id) = with_user().await;
        let mut saved = repo.save_snapshot(sample_resume(user_id)).await.unwrap();
        saved.skills.truncate(1);
        saved.skills.push(skill("Go"));
        saved.normalize_order();
        let again = repo.save_snapshot(saved).await.unwrap();
        let names: Vec<_> = again.skills.iter().map(|s| s.data.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Go"]);
        assert_eq!(again.section_len(SectionKind::Skill), 2);
    }

    #[tokio::test]
    async fn test_save_requires_user() {
        let repo = MemoryRepository::new();
        let err = repo.save_snapshot(sample_resume(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cannot_save_into_foreign_resume() {
        let (repo, owner) = with_user().await;
        let saved = repo.save_snapshot(sample_resume(owner)).await.unwrap();

        let intruder = Uuid::new_v4();
        UserRepository::create(
            &repo,
            intruder,
            &NewUser {
                username: "mallory".to_string(),
                email: "m@example.com".to_string(),
            },
        )
        .await
        .unwrap();
        let mut hijack = saved.clone();
        hijack.user_id = intruder;
        assert!(matches!(
            repo.save_snapshot(hijack).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let (repo, user_id) = with_user().await;
        let older = repo.save_snapshot(sample_resume(user_id)).await.unwrap();
        let newer = repo.save_snapshot(sample_resume(user_id)).await.unwrap();
        let list = repo.list_for_user(user_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].id, older.id);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let (repo, user_id) = with_user().await;
        repo.save_snapshot(sample_resume(user_id)).await.unwrap();
        PreferenceRepository::put(
            &repo,
            user_id,
            UserPreferences {
                palette: Palette::Forest,
                ..UserPreferences::default()
            },
        )
        .await
        .unwrap();

        assert!(UserRepository::delete(&repo, user_id).await.unwrap());
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
        assert_eq!(
            PreferenceRepository::get(&repo, user_id).await.unwrap(),
            UserPreferences::default()
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (repo, _) = with_user().await;
        let err = UserRepository::create(
            &repo,
            Uuid::new_v4(),
            &NewUser {
                username: "ada".to_string(),
                email: "other@example.com".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
