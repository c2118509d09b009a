// User palette / banner / language preferences. Last write wins.

pub mod handlers;

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Palette, UserPreferences};
use crate::repository::PreferenceRepository;

/// Changes only the palette, keeping the other stored preferences.
pub async fn set_palette(
    repo: &dyn PreferenceRepository,
    user_id: Uuid,
    palette: Palette,
) -> Result<UserPreferences, AppError> {
    let updated = repo.set_palette(user_id, palette).await?;
    tracing::info!(user_id = %user_id, palette = palette.as_str(), "Palette updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::models::{BannerColor, Locale};
    use crate::repository::memory::seed::with_user;
    use crate::repository::MemoryRepository;

    /// Reads and palette writes take long enough for a concurrent full write
    /// to land in between.
    struct SlowPaletteWrites {
        inner: MemoryRepository,
    }

    #[async_trait]
    impl PreferenceRepository for SlowPaletteWrites {
        async fn get(&self, user_id: Uuid) -> Result<UserPreferences, AppError> {
            let read = self.inner.get(user_id).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            read
        }

        async fn put(&self, user_id: Uuid, prefs: UserPreferences) -> Result<UserPreferences, AppError> {
            self.inner.put(user_id, prefs).await
        }

        async fn set_palette(&self, user_id: Uuid, palette: Palette) -> Result<UserPreferences, AppError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.set_palette(user_id, palette).await
        }
    }

    #[tokio::test]
    async fn test_set_palette_keeps_other_fields() {
        let (repo, user_id) = with_user().await;
        repo.put(
            user_id,
            UserPreferences {
                palette: Palette::Ocean,
                banner_color: BannerColor::Sand,
                language: Locale::De,
            },
        )
        .await
        .unwrap();

        let updated = set_palette(&repo, user_id, Palette::Lavender).await.unwrap();
        assert_eq!(updated.palette, Palette::Lavender);
        assert_eq!(updated.banner_color, BannerColor::Sand);
        assert_eq!(updated.language, Locale::De);
        assert_eq!(repo.get(user_id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_set_palette_without_stored_row_uses_defaults() {
        let (repo, user_id) = with_user().await;
        let updated = set_palette(&repo, user_id, Palette::Forest).await.unwrap();
        assert_eq!(
            updated,
            UserPreferences {
                palette: Palette::Forest,
                ..UserPreferences::default()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_full_write_is_not_reverted() {
        let (inner, user_id) = with_user().await;
        let repo = Arc::new(SlowPaletteWrites { inner });

        let palette_write = {
            let repo = repo.clone();
            tokio::spawn(async move { set_palette(repo.as_ref(), user_id, Palette::Lavender).await })
        };
        // Lands while the palette write is still pending.
        tokio::time::sleep(Duration::from_millis(10)).await;
        repo.put(
            user_id,
            UserPreferences {
                banner_color: BannerColor::Sand,
                ..UserPreferences::default()
            },
        )
        .await
        .unwrap();
        palette_write.await.unwrap().unwrap();

        let stored = repo.inner.get(user_id).await.unwrap();
        assert_eq!(stored.palette, Palette::Lavender);
        assert_eq!(stored.banner_color, BannerColor::Sand);
    }

    #[tokio::test]
    async fn test_set_palette_requires_user() {
        let repo = MemoryRepository::new();
        assert!(matches!(
            set_palette(&repo, Uuid::new_v4(), Palette::Sunset).await,
            Err(AppError::NotFound(_))
        ));
    }
}
