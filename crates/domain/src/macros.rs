//! Display/FromStr for label-style enums
//!
//! Session states, error categories and exit triggers all travel as short
//! snake_case labels (log fields, status payloads, config values). This macro
//! generates both directions from a single mapping.
//!
//! # Example
//!
//! ```rust
//! use roomlink_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Loading,
//!     Joined,
//! }
//!
//! impl_label_conversions!(Phase {
//!     Loading => "loading",
//!     Joined => "joined",
//! });
//!
//! assert_eq!(Phase::Joined.to_string(), "joined");
//! assert_eq!("LOADING".parse::<Phase>(), Ok(Phase::Loading));
//! ```

/// Implements `Display` and case-insensitive `FromStr` for a fieldless enum.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable label used in logs and serialized payloads.
            pub const fn as_label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_label())
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
