mod settings;
pub mod validation;

pub use settings::{
    API_KEY_HEADER, ClientConfig, ConfigFile, DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE,
    PollerConfig, PollingSection, ServerSection,
};
