use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Components scaled to 0.0..=1.0, as PDF color operators expect.
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }

    /// Relative luminance (Rec. 709 weights, no gamma correction).
    pub fn luminance(&self) -> f32 {
        let (r, g, b) = self.unit();
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColors {
    pub accent: Rgb,
    pub text: Rgb,
    pub muted: Rgb,
}

/// Named color scheme applied to banner and resume rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    #[default]
    Ocean,
    Forest,
    Sunset,
    Graphite,
    Lavender,
}

impl Palette {
    pub fn as_str(&self) -> &'static str {
        match self {
            Palette::Ocean => "ocean",
            Palette::Forest => "forest",
            Palette::Sunset => "sunset",
            Palette::Graphite => "graphite",
            Palette::Lavender => "lavender",
        }
    }

    pub fn colors(&self) -> PaletteColors {
        let (accent, text, muted) = match self {
            Palette::Ocean => (Rgb(0x1D, 0x4E, 0xD8), Rgb(0x11, 0x18, 0x27), Rgb(0x4B, 0x55, 0x63)),
            Palette::Forest => (Rgb(0x15, 0x80, 0x3D), Rgb(0x14, 0x22, 0x1A), Rgb(0x4D, 0x5C, 0x52)),
            Palette::Sunset => (Rgb(0xEA, 0x58, 0x0C), Rgb(0x27, 0x17, 0x0F), Rgb(0x6B, 0x55, 0x4A)),
            Palette::Graphite => (Rgb(0x37, 0x41, 0x51), Rgb(0x0F, 0x0F, 0x10), Rgb(0x52, 0x52, 0x5B)),
            Palette::Lavender => (Rgb(0x7C, 0x3A, 0xED), Rgb(0x1E, 0x1B, 0x2E), Rgb(0x5B, 0x55, 0x70)),
        };
        PaletteColors { accent, text, muted }
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ocean" => Ok(Palette::Ocean),
            "forest" => Ok(Palette::Forest),
            "sunset" => Ok(Palette::Sunset),
            "graphite" => Ok(Palette::Graphite),
            "lavender" => Ok(Palette::Lavender),
            other => Err(format!("unknown palette '{other}'")),
        }
    }
}

/// Background of the profile banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerColor {
    #[default]
    Midnight,
    Charcoal,
    Snow,
    Sand,
    Teal,
}

impl BannerColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerColor::Midnight => "midnight",
            BannerColor::Charcoal => "charcoal",
            BannerColor::Snow => "snow",
            BannerColor::Sand => "sand",
            BannerColor::Teal => "teal",
        }
    }

    pub fn rgb(&self) -> Rgb {
        match self {
            BannerColor::Midnight => Rgb(0x0B, 0x12, 0x20),
            BannerColor::Charcoal => Rgb(0x26, 0x26, 0x26),
            BannerColor::Snow => Rgb(0xF8, 0xFA, 0xFC),
            BannerColor::Sand => Rgb(0xF5, 0xE9, 0xD4),
            BannerColor::Teal => Rgb(0x0F, 0x76, 0x6E),
        }
    }

    /// Foreground that stays readable on this background.
    pub fn foreground(&self) -> Rgb {
        if self.rgb().luminance() > 0.5 {
            Rgb(0x11, 0x18, 0x27)
        } else {
            Rgb(0xF9, 0xFA, 0xFB)
        }
    }
}

impl FromStr for BannerColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midnight" => Ok(BannerColor::Midnight),
            "charcoal" => Ok(BannerColor::Charcoal),
            "snow" => Ok(BannerColor::Snow),
            "sand" => Ok(BannerColor::Sand),
            "teal" => Ok(BannerColor::Teal),
            other => Err(format!("unknown banner color '{other}'")),
        }
    }
}

/// Language used for section headings in exported documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Es,
    Fr,
    De,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::De => "de",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept region-qualified tags such as "es-MX".
        let primary = s.trim().split(|c: char| c == '-' || c == '_').next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            "fr" => Ok(Locale::Fr),
            "de" => Ok(Locale::De),
            _ => Err(format!("unsupported language '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub palette: Palette,
    pub banner_color: BannerColor,
    pub language: Locale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_parse_is_case_insensitive() {
        assert_eq!("Forest".parse::<Palette>(), Ok(Palette::Forest));
        assert!("neon".parse::<Palette>().is_err());
    }

    #[test]
    fn test_locale_accepts_region_tags() {
        assert_eq!("es-MX".parse::<Locale>(), Ok(Locale::Es));
        assert_eq!("de_AT".parse::<Locale>(), Ok(Locale::De));
        assert!("jp".parse::<Locale>().is_err());
    }

    #[test]
    fn test_banner_foreground_contrast() {
        assert_eq!(BannerColor::Snow.foreground(), Rgb(0x11, 0x18, 0x27));
        assert_eq!(BannerColor::Midnight.foreground(), Rgb(0xF9, 0xFA, 0xFB));
    }

    #[test]
    fn test_preferences_json_shape() {
        let prefs = UserPreferences {
            palette: Palette::Sunset,
            banner_color: BannerColor::Teal,
            language: Locale::Fr,
        };
        let json = serde_json::to_value(prefs).unwrap();
        assert_eq!(json["palette"], "sunset");
        assert_eq!(json["banner_color"], "teal");
        assert_eq!(json["language"], "fr");
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb(0x1D, 0x4E, 0xD8).hex(), "1D4ED8");
    }
}
