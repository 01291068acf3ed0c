//! Data models representing database entities.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` request DTOs with a `validate` method
//! - Query-string filter structs for list endpoints

/// Error returned when a stored or submitted value is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl From<ParseEnumError> for crate::error::AppError {
    fn from(err: ParseEnumError) -> Self {
        crate::error::AppError::InvalidRequest(err.to_string())
    }
}

/// Declare a closed set of values stored as text columns.
///
/// Generates serde (de)serialisation using the given text, `as_str`,
/// `Display`, `FromStr` and `TryFrom<String>` (for `#[sqlx(try_from)]`).
/// Defined ahead of the submodules so they can invoke it unqualified.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

/// API key authentication model
pub mod api_key;
/// Buildings and building areas
pub mod building;
/// Income/expense categories
pub mod category;
/// Donor records
pub mod donor;
/// Funds and balances
pub mod fund;
/// Grants
pub mod grant;
/// Inventory items and stock adjustments
pub mod inventory;
/// Inventory storage locations
pub mod location;
/// Page parameters and paged responses
pub mod pagination;
/// Maintenance projects
pub mod project;
/// Recurring transaction templates
pub mod recurring;
/// Maintenance service requests
pub mod service_request;
/// Income and expense transactions
pub mod transaction;
/// Maintenance work orders
pub mod work_order;

/// `?version=N` query parameter for version-checked deletes.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct VersionParam {
    pub version: i32,
}

/// Query string for endpoints that only toggle soft-deleted rows.
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct DeletedParam {
    #[serde(default)]
    pub include_deleted: bool,
}

/// Trim an optional string and drop it when empty.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Require a non-blank value no longer than `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<(), crate::error::AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::AppError::InvalidRequest(format!(
            "{field} is required"
        )));
    }
    if trimmed.chars().count() > max {
        return Err(crate::error::AppError::InvalidRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Loose e-mail shape check: one `@`, non-empty local part, dotted domain.
pub fn looks_like_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    string_enum! {
        pub enum Shade {
            Light => "light",
            Dark => "dark_grey",
        }
    }

    #[test]
    fn string_enum_round_trips_text_and_json() {
        assert_eq!("dark_grey".parse::<Shade>().unwrap(), Shade::Dark);
        assert_eq!(Shade::Light.to_string(), "light");
        assert_eq!(serde_json::to_string(&Shade::Dark).unwrap(), "\"dark_grey\"");

        let err = "purple".parse::<Shade>().unwrap_err();
        assert_eq!(err.to_string(), "unknown Shade 'purple'");
    }

    #[test]
    fn email_check_rejects_obvious_garbage() {
        assert!(looks_like_email("treasurer@example.org"));
        assert!(!looks_like_email("treasurer.example.org"));
        assert!(!looks_like_email("a@b@example.org"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("someone@localhost"));
        assert!(!looks_like_email("some one@example.org"));
    }

    #[test]
    fn require_text_counts_characters() {
        assert!(require_text("name", "  ", 10).is_err());
        assert!(require_text("name", "Café", 4).is_ok());
        assert!(require_text("name", "Cafés", 4).is_err());
    }

    #[test]
    fn clean_optional_drops_blank_values() {
        assert_eq!(clean_optional(Some("  ".into())), None);
        assert_eq!(clean_optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(clean_optional(None), None);
    }
}
