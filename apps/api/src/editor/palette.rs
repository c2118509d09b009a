//! Keeps the editor's theme in step with the stored preferences.
//!
//! Changes apply to the local theme first and are then written through.
//! A failed write is returned to the caller and leaves the local choice in
//! place; the next successful write or `mount` converges both sides.

use std::sync::Arc;

use tracing::warn;

use crate::editor::gateway::{GatewayError, PreferenceGateway};
use crate::models::{BannerColor, Locale, Palette, UserPreferences};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThemeContext {
    pub preferences: UserPreferences,
    /// False while a local change has not been confirmed by the server.
    pub synced: bool,
    /// True once `preferences` holds what the server stored, not defaults.
    pub mounted: bool,
}

pub struct PaletteSync {
    gateway: Arc<dyn PreferenceGateway>,
    theme: ThemeContext,
}

impl PaletteSync {
    pub fn new(gateway: Arc<dyn PreferenceGateway>) -> Self {
        Self {
            gateway,
            theme: ThemeContext::default(),
        }
    }

    pub fn theme(&self) -> &ThemeContext {
        &self.theme
    }

    /// Pulls the stored preferences into the theme.
    pub async fn mount(&mut self) -> Result<(), GatewayError> {
        let stored = self.gateway.fetch_preferences().await?;
        self.theme = ThemeContext {
            preferences: stored,
            synced: true,
            mounted: true,
        };
        Ok(())
    }

    /// Palette writes touch only the palette server side, so they are safe
    /// before `mount`.
    pub async fn change_palette(&mut self, palette: Palette) -> Result<(), GatewayError> {
        self.theme.preferences.palette = palette;
        self.theme.synced = false;
        let written = self.gateway.update_palette(palette).await;
        self.settle(written)
    }

    pub async fn change_banner_color(&mut self, banner_color: BannerColor) -> Result<(), GatewayError> {
        self.write_full(|prefs| prefs.banner_color = banner_color).await
    }

    pub async fn change_language(&mut self, language: Locale) -> Result<(), GatewayError> {
        self.write_full(|prefs| prefs.language = language).await
    }

    /// Applies `change` locally and writes the full preferences.
    ///
    /// The full write replaces every stored field, so an unmounted theme first
    /// pulls the stored values and reapplies `change` on top of them. If that
    /// pull fails nothing is written.
    async fn write_full<F>(&mut self, change: F) -> Result<(), GatewayError>
    where
        F: Fn(&mut UserPreferences),
    {
        change(&mut self.theme.preferences);
        self.theme.synced = false;

        if !self.theme.mounted {
            match self.gateway.fetch_preferences().await {
                Ok(mut stored) => {
                    change(&mut stored);
                    self.theme.preferences = stored;
                    self.theme.mounted = true;
                }
                Err(e) => {
                    warn!("Could not read stored preferences before writing: {e}");
                    return Err(e);
                }
            }
        }

        let written = self.gateway.update_preferences(self.theme.preferences).await;
        self.settle(written)
    }

    fn settle(&mut self, written: Result<UserPreferences, GatewayError>) -> Result<(), GatewayError> {
        match written {
            Ok(stored) => {
                self.theme = ThemeContext {
                    preferences: stored,
                    synced: true,
                    mounted: true,
                };
                Ok(())
            }
            Err(e) => {
                warn!("Preference write failed, keeping local theme: {e}");
                Err(e)
            }
        }
    }
}
