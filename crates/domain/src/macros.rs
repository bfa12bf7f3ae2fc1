//! Macro for implementing Display and FromStr for string-backed enums
//!
//! Used for enums that round-trip through environment variables and config
//! files, where parsing has to be case-insensitive.
//!
//! # Example
//!
//! ```rust
//! use mlauth_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Transport {
//!     Loopback,
//!     CustomUri,
//! }
//!
//! impl_domain_status_conversions!(Transport {
//!     Loopback => "loopback",
//!     CustomUri => "custom_uri",
//! });
//!
//! assert_eq!(Transport::CustomUri.to_string(), "custom_uri");
//! assert_eq!("LOOPBACK".parse::<Transport>().unwrap(), Transport::Loopback);
//! ```

/// Implements Display and FromStr traits for string-backed enums
///
/// Display writes the mapped string; FromStr matches it case-insensitively
/// and reports the enum name on failure.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
