//! Domain records exchanged with the user-administration service
//!
//! The schema is owned by the remote service; these records carry the
//! subset of fields the provisioning host works with. Each record states
//! its own XML shape explicitly via [`ToXml`]/[`FromXml`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::xml::{FieldMap, FromXml, ToXml, XmlWriter, write_opt_element, write_text_element};

fn parse_bool(field: &str, text: &str) -> Result<bool, String> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("invalid boolean '{text}' in field '{field}'")),
    }
}

fn parse_timestamp(field: &str, text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{text}' in field '{field}': {e}"))
}

/// A user account in the remote user registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub user_id: String,
    /// Display name.
    pub user_name: Option<String>,
    /// Role assigned to the user.
    pub role_id: Option<String>,
    /// ERP client the user belongs to.
    pub client: Option<String>,
    /// Contact email address.
    pub email: Option<String>,
    /// Whether the account is active.
    pub active: Option<bool>,
}

impl User {
    /// Create a user with only the identifier set.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            role_id: None,
            client: None,
            email: None,
            active: None,
        }
    }
}

impl ToXml for User {
    fn tag(&self) -> &str {
        "User"
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        write_text_element(writer, "UserId", &self.user_id)?;
        write_opt_element(writer, "UserName", self.user_name.as_deref())?;
        write_opt_element(writer, "RoleId", self.role_id.as_deref())?;
        write_opt_element(writer, "Client", self.client.as_deref())?;
        write_opt_element(writer, "Email", self.email.as_deref())?;
        if let Some(active) = self.active {
            write_text_element(writer, "Active", if active { "true" } else { "false" })?;
        }
        Ok(())
    }
}

impl FromXml for User {
    fn record_tag() -> &'static str {
        "User"
    }

    fn from_fields(mut fields: FieldMap) -> Result<Self, String> {
        let user_id = fields
            .remove("UserId")
            .ok_or_else(|| "User record without UserId".to_string())?;
        let active = fields
            .remove("Active")
            .map(|text| parse_bool("Active", &text))
            .transpose()?;

        Ok(Self {
            user_id,
            user_name: fields.remove("UserName"),
            role_id: fields.remove("RoleId"),
            client: fields.remove("Client"),
            email: fields.remove("Email"),
            active,
        })
    }
}

/// A person record in the remote resource registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub resource_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Workplace the resource is attached to.
    pub workplace_id: Option<String>,
    /// Start of the employment interval.
    pub date_from: Option<DateTime<Utc>>,
    /// End of the employment interval.
    pub date_to: Option<DateTime<Utc>>,
}

impl Resource {
    /// Create a resource with only the identifier set.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            name: None,
            workplace_id: None,
            date_from: None,
            date_to: None,
        }
    }
}

impl ToXml for Resource {
    fn tag(&self) -> &str {
        "Resource"
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        write_text_element(writer, "ResourceId", &self.resource_id)?;
        write_opt_element(writer, "Name", self.name.as_deref())?;
        write_opt_element(writer, "WorkplaceId", self.workplace_id.as_deref())?;
        write_opt_element(
            writer,
            "DateFrom",
            self.date_from.map(|t| t.to_rfc3339()).as_deref(),
        )?;
        write_opt_element(
            writer,
            "DateTo",
            self.date_to.map(|t| t.to_rfc3339()).as_deref(),
        )?;
        Ok(())
    }
}

impl FromXml for Resource {
    fn record_tag() -> &'static str {
        "Resource"
    }

    fn from_fields(mut fields: FieldMap) -> Result<Self, String> {
        let resource_id = fields
            .remove("ResourceId")
            .ok_or_else(|| "Resource record without ResourceId".to_string())?;
        let date_from = fields
            .remove("DateFrom")
            .map(|text| parse_timestamp("DateFrom", &text))
            .transpose()?;
        let date_to = fields
            .remove("DateTo")
            .map(|text| parse_timestamp("DateTo", &text))
            .transpose()?;

        Ok(Self {
            resource_id,
            name: fields.remove("Name"),
            workplace_id: fields.remove("WorkplaceId"),
            date_from,
            date_to,
        })
    }
}

/// A workplace in the remote organization registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPlace {
    /// Unique workplace identifier.
    pub workplace_id: String,
    /// Display name.
    pub name: Option<String>,
    /// ERP client the workplace belongs to.
    pub client: Option<String>,
}

impl ToXml for WorkPlace {
    fn tag(&self) -> &str {
        "WorkPlace"
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        write_text_element(writer, "WorkplaceId", &self.workplace_id)?;
        write_opt_element(writer, "Name", self.name.as_deref())?;
        write_opt_element(writer, "Client", self.client.as_deref())?;
        Ok(())
    }
}

impl FromXml for WorkPlace {
    fn record_tag() -> &'static str {
        "WorkPlace"
    }

    fn from_fields(mut fields: FieldMap) -> Result<Self, String> {
        let workplace_id = fields
            .remove("WorkplaceId")
            .ok_or_else(|| "WorkPlace record without WorkplaceId".to_string())?;
        Ok(Self {
            workplace_id,
            name: fields.remove("Name"),
            client: fields.remove("Client"),
        })
    }
}

/// An organization unit in the remote organization registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique organization identifier.
    pub org_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Parent organization unit, if any.
    pub parent_id: Option<String>,
}

impl ToXml for Organization {
    fn tag(&self) -> &str {
        "Organization"
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        write_text_element(writer, "OrgId", &self.org_id)?;
        write_opt_element(writer, "Name", self.name.as_deref())?;
        write_opt_element(writer, "ParentId", self.parent_id.as_deref())?;
        Ok(())
    }
}

impl FromXml for Organization {
    fn record_tag() -> &'static str {
        "Organization"
    }

    fn from_fields(mut fields: FieldMap) -> Result<Self, String> {
        let org_id = fields
            .remove("OrgId")
            .ok_or_else(|| "Organization record without OrgId".to_string())?;
        Ok(Self {
            org_id,
            name: fields.remove("Name"),
            parent_id: fields.remove("ParentId"),
        })
    }
}

/// Outcome reported by the service for a mutation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    /// Status keyword reported by the service.
    pub status: Option<String>,
    /// Human-readable detail message.
    pub message: Option<String>,
}

impl ToXml for ServiceResponse {
    fn tag(&self) -> &str {
        "response"
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        write_opt_element(writer, "status", self.status.as_deref())?;
        write_opt_element(writer, "message", self.message.as_deref())?;
        Ok(())
    }
}

impl FromXml for ServiceResponse {
    fn record_tag() -> &'static str {
        "response"
    }

    fn from_fields(mut fields: FieldMap) -> Result<Self, String> {
        Ok(Self {
            status: fields.remove("status"),
            message: fields.remove("message"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{parse_records, to_document};

    #[test]
    fn test_user_round_trip() {
        let user = User {
            user_id: "U1".to_string(),
            user_name: Some("Test User".to_string()),
            role_id: Some("R1".to_string()),
            client: Some("C1".to_string()),
            email: Some("test@example.com".to_string()),
            active: Some(true),
        };

        let doc = to_document(&user).unwrap();
        let parsed: Vec<User> = parse_records(&doc).unwrap();
        assert_eq!(parsed, vec![user]);
    }

    #[test]
    fn test_user_round_trip_sparse() {
        let user = User::new("U2");
        let doc = to_document(&user).unwrap();
        assert_eq!(doc, "<User><UserId>U2</UserId></User>");

        let parsed: Vec<User> = parse_records(&doc).unwrap();
        assert_eq!(parsed, vec![user]);
    }

    #[test]
    fn test_user_requires_id() {
        let err = parse_records::<User>("<User><UserName>n</UserName></User>").unwrap_err();
        assert!(err.contains("UserId"), "unexpected error: {err}");
    }

    #[test]
    fn test_user_rejects_bad_boolean() {
        let xml = "<User><UserId>U1</UserId><Active>yes</Active></User>";
        assert!(parse_records::<User>(xml).is_err());
    }

    #[test]
    fn test_resource_round_trip_with_dates() {
        let resource = Resource {
            resource_id: "R1".to_string(),
            name: Some("Some Body".to_string()),
            workplace_id: Some("W1".to_string()),
            date_from: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            date_to: Some("2024-12-31T00:00:00Z".parse().unwrap()),
        };

        let doc = to_document(&resource).unwrap();
        let parsed: Vec<Resource> = parse_records(&doc).unwrap();
        assert_eq!(parsed, vec![resource]);
    }

    #[test]
    fn test_resource_rejects_bad_timestamp() {
        let xml = "<Resource><ResourceId>R1</ResourceId><DateFrom>tomorrow</DateFrom></Resource>";
        assert!(parse_records::<Resource>(xml).is_err());
    }

    #[test]
    fn test_workplace_and_organization_round_trip() {
        let workplace = WorkPlace {
            workplace_id: "W1".to_string(),
            name: Some("HQ".to_string()),
            client: Some("C1".to_string()),
        };
        let parsed: Vec<WorkPlace> = parse_records(&to_document(&workplace).unwrap()).unwrap();
        assert_eq!(parsed, vec![workplace]);

        let org = Organization {
            org_id: "O1".to_string(),
            name: Some("Finance".to_string()),
            parent_id: None,
        };
        let parsed: Vec<Organization> = parse_records(&to_document(&org).unwrap()).unwrap();
        assert_eq!(parsed, vec![org]);
    }

    #[test]
    fn test_service_response_round_trip() {
        let response = ServiceResponse {
            status: Some("ok".to_string()),
            message: Some("3 users created".to_string()),
        };
        let parsed: Vec<ServiceResponse> =
            parse_records(&to_document(&response).unwrap()).unwrap();
        assert_eq!(parsed, vec![response]);
    }
}
