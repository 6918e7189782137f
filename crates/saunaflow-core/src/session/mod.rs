mod config;

pub use config::{
    SessionConfig, SessionConfigPatch, SessionConfigStore, DURATION_RANGE, HEAT_RANGE,
    HUMIDITY_RANGE, SESSION_CONFIG_KEY, STEP,
};
