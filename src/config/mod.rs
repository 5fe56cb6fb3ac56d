mod settings;

pub use settings::{
    Command, Config, HistorySettings, PingSettings, Settings, StorageSettings, UsageSettings,
};
