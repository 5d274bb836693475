/// Organisation model
///
/// Organisations are owned by the organisation service. The name is unique.
/// `members` and `projects` are weak back-references kept in sync by the
/// propagation handlers; every ID in them should reference a live document
/// eventually, but never authoritatively.
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Organisation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
    /// Unique organisation ID
    pub id: Uuid,

    /// Unique organisation name
    pub name: String,

    /// Address: city
    pub city: Option<String>,

    /// Address: street
    pub street: Option<String>,

    /// Address: country
    pub country: Option<String>,

    /// Member user IDs (weak references, no duplicates)
    pub members: Vec<Uuid>,

    /// Project IDs owned by this organisation (weak references)
    pub projects: Vec<Uuid>,

    /// When the organisation was created
    pub created_at: DateTime<Utc>,

    /// When the organisation was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new organisation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrganisation {
    /// Organisation name (unique)
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,

    /// Address: city
    pub city: Option<String>,

    /// Address: street
    pub street: Option<String>,

    /// Address: country
    pub country: Option<String>,
}

/// Input for updating an organisation
///
/// Address fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateOrganisation {
    /// New name (still unique)
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: Option<String>,

    /// New city
    pub city: Option<Option<String>>,

    /// New street
    pub street: Option<Option<String>>,

    /// New country
    pub country: Option<Option<String>>,
}

impl Organisation {
    /// Builds an organisation document from validated creation input
    pub fn new(data: CreateOrganisation) -> Self {
        let now = Utc::now();
        Organisation {
            id: Uuid::new_v4(),
            name: data.name,
            city: data.city,
            street: data.street,
            country: data.country,
            members: Vec::new(),
            projects: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`
    pub fn apply(&mut self, data: UpdateOrganisation) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(city) = data.city {
            self.city = city;
        }
        if let Some(street) = data.street {
            self.street = street;
        }
        if let Some(country) = data.country {
            self.country = country;
        }
        self.updated_at = Utc::now();
    }
}

impl Entity for Organisation {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_organisation_has_empty_rosters() {
        let org = Organisation::new(CreateOrganisation {
            name: "Acme".to_string(),
            city: Some("Berlin".to_string()),
            street: None,
            country: None,
        });
        assert!(org.members.is_empty());
        assert!(org.projects.is_empty());
    }

    #[test]
    fn test_update_clears_address_field() {
        let mut org = Organisation::new(CreateOrganisation {
            name: "Acme".to_string(),
            city: Some("Berlin".to_string()),
            street: None,
            country: None,
        });

        org.apply(UpdateOrganisation {
            city: Some(None),
            ..Default::default()
        });

        assert!(org.city.is_none());
        assert_eq!(org.name, "Acme");
    }
}
