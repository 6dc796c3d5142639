mod state;
mod store;

pub use state::{ConfigFile, SdkKey, SdkState, VersionRecord};
pub use store::{ConfigStore, CONFIG_FILE_NAME, HOME_ENV};
