//! Domain types and models

pub mod licensing;
pub mod session;
pub mod status;

pub use licensing::{Entitlement, LicensingInfo, LicensingKind};
pub use session::{AuthSession, Identity};
pub use status::ConnectionStatus;
