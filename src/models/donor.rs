//! Donor records and giving summaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, looks_like_email, require_text};
use crate::error::AppError;

string_enum! {
    pub enum DonorType {
        Individual => "individual",
        Organization => "organization",
    }
}

/// Represents a donor record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Donor {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub donor_type: DonorType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl Donor {
    /// Name to show in lists: organization name, or "First Last".
    pub fn display_name(&self) -> String {
        match self.donor_type {
            DonorType::Organization => self.organization_name.clone().unwrap_or_default(),
            DonorType::Individual => [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Request body for creating or replacing a donor.
///
/// ```json
/// {
///   "donor_type": "individual",
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "email": "ada@example.org"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DonorRequest {
    pub donor_type: DonorType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

impl DonorRequest {
    /// Individuals need first and last name; organizations need a name.
    pub fn validate(self) -> Result<Self, AppError> {
        let request = Self {
            donor_type: self.donor_type,
            first_name: clean_optional(self.first_name),
            last_name: clean_optional(self.last_name),
            organization_name: clean_optional(self.organization_name),
            email: clean_optional(self.email).map(|e| e.to_lowercase()),
            phone: clean_optional(self.phone),
            address_line: clean_optional(self.address_line),
            city: clean_optional(self.city),
            state: clean_optional(self.state),
            postal_code: clean_optional(self.postal_code),
            notes: clean_optional(self.notes),
        };

        match request.donor_type {
            DonorType::Individual => {
                require_text("first_name", request.first_name.as_deref().unwrap_or(""), 100)?;
                require_text("last_name", request.last_name.as_deref().unwrap_or(""), 100)?;
            }
            DonorType::Organization => {
                require_text(
                    "organization_name",
                    request.organization_name.as_deref().unwrap_or(""),
                    200,
                )?;
            }
        }

        if let Some(email) = &request.email {
            if !looks_like_email(email) {
                return Err(AppError::InvalidRequest(format!(
                    "'{email}' is not a valid email address"
                )));
            }
        }

        Ok(request)
    }
}

/// Query string for `GET /donors`.
#[derive(Debug, Default, Deserialize)]
pub struct DonorFilter {
    /// Matches name, organization or email
    pub search: Option<String>,
    pub donor_type: Option<DonorType>,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Response of `GET /donors/{id}/giving`.
#[derive(Debug, Serialize)]
pub struct GivingSummary {
    pub donor_id: Uuid,
    pub display_name: String,
    pub total_given_cents: i64,
    pub gift_count: i64,
    pub first_gift_date: Option<NaiveDate>,
    pub last_gift_date: Option<NaiveDate>,
    pub largest_gift_cents: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DonorRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn individual_needs_both_names() {
        let req = parse(r#"{"donor_type":"individual","first_name":"Ada"}"#);
        assert!(req.validate().is_err());

        let req = parse(r#"{"donor_type":"individual","first_name":"Ada","last_name":" Lovelace "}"#);
        assert_eq!(req.validate().unwrap().last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn organization_needs_organization_name() {
        let req = parse(r#"{"donor_type":"organization","first_name":"Ada","last_name":"L"}"#);
        assert!(req.validate().is_err());

        let req = parse(r#"{"donor_type":"organization","organization_name":"Acme Foundation"}"#);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn email_is_normalised_and_checked() {
        let req = parse(
            r#"{"donor_type":"organization","organization_name":"Acme","email":" Giving@Acme.ORG "}"#,
        );
        assert_eq!(req.validate().unwrap().email.as_deref(), Some("giving@acme.org"));

        let req = parse(r#"{"donor_type":"organization","organization_name":"Acme","email":"acme"}"#);
        assert!(req.validate().is_err());
    }
}
