//! Configuration model for the automation controller
//!
//! - **field**: per-slot gathering settings, edited through live validation
//! - **global**: settings shared by every slot (rejoin, Discord, keybinds...)
//! - **profile**: a named set of 5 field slots plus global settings
//! - **serializer**: canonical JSON encoding with schema checking
//! - **store**: the multi-profile store with the active-profile pointer

/// Closed set of string choices with a fixed canonical spelling.
///
/// Generates `ALL`, `NAMES`, `as_str`, `FromStr` and `Display`.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::config::UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::config::UnknownChoice {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod field;
pub mod global;
pub mod profile;
pub mod serializer;
pub mod store;

/// A string that is not one of the spellings of a choice enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

// Re-export commonly used types
pub use field::{FieldConfig, FieldKey};
pub use global::{GlobalKey, GlobalSettings};
pub use profile::Profile;
pub use store::ProfileStore;
