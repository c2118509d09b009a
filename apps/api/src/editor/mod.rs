// Editor-side state: the resume draft store, the save orchestrator and the
// theme/palette sync. Everything talks to the server through `gateway`.

pub mod gateway;
pub mod palette;
pub mod save;
pub mod store;

pub use gateway::{GatewayError, HttpGateway, LocalGateway, PreferenceGateway, ResumeGateway};
pub use palette::{PaletteSync, ThemeContext};
pub use save::{SaveError, SaveOrchestrator};
pub use store::ResumeStore;
