pub mod preferences;
pub mod resume;
pub mod user;

pub use preferences::{BannerColor, Locale, Palette, PaletteColors, Rgb, UserPreferences};
pub use resume::{Header, Item, ItemRecord, Profile, Resume, SectionKind};
pub use user::{NewUser, User};
