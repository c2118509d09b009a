//! Editor-side resume state.
//!
//! The store keeps two copies of the resume: `draft`, which edits mutate,
//! and `saved`, the last record confirmed by the server. Edits never touch
//! the server; only [`ResumeStore::save`] does. Every mutating method takes
//! `&mut self`, so a store can have at most one save in flight.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::editor::gateway::{GatewayError, ResumeGateway};
use crate::editor::save::{SaveError, SaveOrchestrator};
use crate::models::resume::{
    renumber, Award, Certification, Education, Experience, Language, Project, Recommendation,
    ReorderError, Skill,
};
use crate::models::{Header, Item, Profile, Resume, SectionKind};

/// Clears the loading flag when a load finishes or its future is dropped.
struct LoadingGuard<'a>(&'a watch::Sender<bool>);

impl<'a> LoadingGuard<'a> {
    fn begin(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

fn replace_section<T>(slot: &mut Vec<Item<T>>, mut items: Vec<Item<T>>) {
    renumber(&mut items);
    *slot = items;
}

pub struct ResumeStore {
    gateway: Arc<dyn ResumeGateway>,
    draft: Resume,
    saved: Resume,
    loading: watch::Sender<bool>,
    error: Option<String>,
}

impl ResumeStore {
    /// A store holding an empty, unsaved resume for `user_id`.
    pub fn new(gateway: Arc<dyn ResumeGateway>, user_id: Uuid) -> Self {
        let empty = Resume::empty(user_id);
        Self {
            gateway,
            draft: empty.clone(),
            saved: empty,
            loading: watch::channel(false).0,
            error: None,
        }
    }

    pub fn draft(&self) -> &Resume {
        &self.draft
    }

    pub fn saved(&self) -> &Resume {
        &self.saved
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Follows the loading flag from outside the store, including while a
    /// `load` holds it mutably borrowed.
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Message from the last failed load or save.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces both copies with the user's most recently updated resume.
    ///
    /// On failure the error is recorded and the current state is kept. A user
    /// without resumes gets a fresh empty draft.
    pub async fn load(&mut self, user_id: Uuid) -> Result<(), GatewayError> {
        let guard = LoadingGuard::begin(&self.loading);
        let result = self.gateway.list_resumes(user_id).await;
        drop(guard);

        match result {
            Ok(resumes) => {
                let latest = resumes
                    .into_iter()
                    .max_by_key(|r| r.updated_at)
                    .unwrap_or_else(|| Resume::empty(user_id));
                debug!(user_id = %user_id, resume_id = ?latest.id, "Loaded resume");
                self.draft = latest.clone();
                self.saved = latest;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %user_id, "Failed to load resumes: {e}");
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    pub fn update_header(&mut self, header: Header) {
        self.draft.header = header;
    }

    pub fn update_profile(&mut self, profile: Profile) {
        self.draft.profile = profile;
    }

    pub fn update_experiences(&mut self, items: Vec<Item<Experience>>) {
        replace_section(&mut self.draft.experiences, items);
    }

    pub fn update_education(&mut self, items: Vec<Item<Education>>) {
        replace_section(&mut self.draft.education, items);
    }

    pub fn update_skills(&mut self, items: Vec<Item<Skill>>) {
        replace_section(&mut self.draft.skills, items);
    }

    pub fn update_projects(&mut self, items: Vec<Item<Project>>) {
        replace_section(&mut self.draft.projects, items);
    }

    pub fn update_certifications(&mut self, items: Vec<Item<Certification>>) {
        replace_section(&mut self.draft.certifications, items);
    }

    pub fn update_awards(&mut self, items: Vec<Item<Award>>) {
        replace_section(&mut self.draft.awards, items);
    }

    pub fn update_recommendations(&mut self, items: Vec<Item<Recommendation>>) {
        replace_section(&mut self.draft.recommendations, items);
    }

    pub fn update_languages(&mut self, items: Vec<Item<Language>>) {
        replace_section(&mut self.draft.languages, items);
    }

    pub fn reorder(&mut self, section: SectionKind, from: usize, to: usize) -> Result<(), ReorderError> {
        self.draft.reorder(section, from, to)
    }

    /// True when the draft differs from the last saved record, including
    /// item order.
    pub fn has_changes(&self) -> bool {
        self.draft != self.saved
    }

    /// Persists the draft. On success both copies become the server's record;
    /// on failure the draft is kept and the error recorded.
    pub async fn save(&mut self, user_id: Uuid) -> Result<(), SaveError> {
        if self.draft.user_id.is_nil() {
            self.draft.user_id = user_id;
        } else if self.draft.user_id != user_id {
            let err = SaveError::Invalid("This resume belongs to another user".to_string());
            self.error = Some(err.message().to_string());
            return Err(err);
        }

        match SaveOrchestrator::new(self.gateway.as_ref()).save(&self.draft).await {
            Ok(saved) => {
                self.draft = saved.clone();
                self.saved = saved;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.message().to_string());
                Err(e)
            }
        }
    }

    pub fn discard_changes(&mut self) {
        self.draft = self.saved.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::gateway::testing::local_gateway;
    use crate::models::resume::fixtures::{sample_resume, skill};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct UnreachableGateway;

    #[async_trait]
    impl ResumeGateway for UnreachableGateway {
        async fn list_resumes(&self, _user_id: Uuid) -> Result<Vec<Resume>, GatewayError> {
            Err(GatewayError::Api {
                status: 503,
                code: "UNAVAILABLE".to_string(),
                message: "Service unavailable".to_string(),
            })
        }

        async fn save_resume(&self, _snapshot: &Resume) -> Result<Resume, GatewayError> {
            Err(GatewayError::Service("down".to_string()))
        }
    }

    /// Answers `list_resumes` with no resumes once released.
    struct HeldGateway {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ResumeGateway for HeldGateway {
        async fn list_resumes(&self, _user_id: Uuid) -> Result<Vec<Resume>, GatewayError> {
            self.release.notified().await;
            Ok(Vec::new())
        }

        async fn save_resume(&self, snapshot: &Resume) -> Result<Resume, GatewayError> {
            Ok(snapshot.clone())
        }
    }

    async fn loaded_store() -> (ResumeStore, Arc<dyn ResumeGateway>, Uuid) {
        let (gateway, _repo, user_id) = local_gateway().await;
        let gateway: Arc<dyn ResumeGateway> = Arc::new(gateway);
        let mut store = ResumeStore::new(gateway.clone(), user_id);
        store.load(user_id).await.unwrap();
        (store, gateway, user_id)
    }

    fn skill_names(resume: &Resume) -> Vec<String> {
        resume.skills.iter().map(|s| s.data.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_user_without_resumes_gets_empty_draft() {
        let (store, _gateway, user_id) = loaded_store().await;
        assert_eq!(store.draft(), &Resume::empty(user_id));
        assert!(!store.has_changes());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_edits_mark_changes_and_discard_reverts() {
        let (mut store, _gateway, _user_id) = loaded_store().await;
        store.update_skills(vec![skill("Rust")]);
        assert!(store.has_changes());
        store.discard_changes();
        assert!(!store.has_changes());
        assert!(store.draft().skills.is_empty());
    }

    #[tokio::test]
    async fn test_reordering_counts_as_a_change() {
        let (mut store, _gateway, user_id) = loaded_store().await;
        store.update_skills(sample_resume(user_id).skills);
        store.save(user_id).await.unwrap();
        assert!(!store.has_changes());

        store.reorder(SectionKind::Skill, 0, 1).unwrap();
        assert!(store.has_changes());
        store.reorder(SectionKind::Skill, 1, 0).unwrap();
        assert!(!store.has_changes());
    }

    #[tokio::test]
    async fn test_save_then_load_restores_the_same_draft() {
        let (mut store, gateway, user_id) = loaded_store().await;
        let sample = sample_resume(user_id);
        store.update_header(sample.header.clone());
        store.update_profile(sample.profile.clone());
        store.update_experiences(sample.experiences.clone());
        store.update_skills(sample.skills.clone());
        store.update_languages(sample.languages.clone());
        store.save(user_id).await.unwrap();

        assert!(!store.has_changes());
        assert!(store.draft().id.is_some());
        assert!(store.draft().skills.iter().all(|s| s.id.is_some()));

        let mut fresh = ResumeStore::new(gateway, user_id);
        fresh.load(user_id).await.unwrap();
        assert_eq!(fresh.draft(), store.draft());
    }

    #[tokio::test]
    async fn test_reorder_survives_save_and_load() {
        let (mut store, gateway, user_id) = loaded_store().await;
        let mut header = sample_resume(user_id).header;
        header.name = "Grace Hopper".to_string();
        store.update_header(header);
        store.update_skills(vec![skill("A"), skill("B"), skill("C")]);
        store.save(user_id).await.unwrap();

        store.reorder(SectionKind::Skill, 2, 0).unwrap();
        store.save(user_id).await.unwrap();

        let mut fresh = ResumeStore::new(gateway, user_id);
        fresh.load(user_id).await.unwrap();
        assert_eq!(skill_names(fresh.draft()), vec!["C", "A", "B"]);
        let orders: Vec<i32> = fresh.draft().skills.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_state() {
        let user_id = Uuid::new_v4();
        let mut store = ResumeStore::new(Arc::new(UnreachableGateway), user_id);
        store.update_skills(vec![skill("Unsaved")]);
        let before = store.draft().clone();

        assert!(store.load(user_id).await.is_err());
        assert_eq!(store.draft(), &before);
        assert_eq!(store.error(), Some("Service unavailable"));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_draft_and_records_error() {
        let (mut store, _gateway, user_id) = loaded_store().await;
        store.update_skills(vec![skill("")]);
        let before = store.draft().clone();

        let err = store.save(user_id).await.unwrap_err();
        assert!(matches!(err, SaveError::Invalid(_)));
        assert_eq!(store.draft(), &before);
        assert!(store.has_changes());
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn test_load_selects_most_recent_resume() {
        let (gateway, _repo, user_id) = local_gateway().await;
        let mut older = sample_resume(user_id);
        older.header.title = "Older".to_string();
        gateway.save_resume(&older).await.unwrap();
        let mut newer = sample_resume(user_id);
        newer.header.title = "Newer".to_string();
        gateway.save_resume(&newer).await.unwrap();

        let mut store = ResumeStore::new(Arc::new(gateway), user_id);
        store.load(user_id).await.unwrap();
        assert_eq!(store.draft().header.title, "Newer");
    }

    #[tokio::test]
    async fn test_loading_flag_is_visible_while_fetch_is_pending() {
        let user_id = Uuid::new_v4();
        let release = Arc::new(Notify::new());
        let mut store = ResumeStore::new(
            Arc::new(HeldGateway {
                release: release.clone(),
            }),
            user_id,
        );
        let mut loading = store.subscribe_loading();
        assert!(!*loading.borrow());

        let pending = tokio::spawn(async move {
            let result = store.load(user_id).await;
            result.map(|_| store)
        });

        loading.wait_for(|busy| *busy).await.unwrap();
        release.notify_one();
        let store = pending.await.unwrap().unwrap();

        assert!(!store.is_loading());
        assert!(!*loading.borrow_and_update());
        assert_eq!(store.draft(), &Resume::empty(user_id));
    }
}
