//! Desktop integration

pub mod browser;

pub use browser::SystemBrowser;
