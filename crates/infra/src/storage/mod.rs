//! Ordinary (non-secret) settings persistence

pub mod settings_file;

pub use settings_file::FileSettingsStore;
