//! Service client handle
//!
//! A short-lived, scoped client bound to one endpoint and one resolved
//! binding. Every facade operation acquires its own handle and the handle
//! is released exactly once on every exit path: explicitly via
//! [`ServiceClient::close`], or by the drop guard when the call unwinds.

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::binding::BindingConfig;
use crate::credentials::Credentials;
use crate::error::{ConnectorError, ConnectorResult};
use crate::models::{Organization, Resource, ServiceResponse, User, WorkPlace};
use crate::soap;
use crate::xml::{self, ItemList};

/// Produces scoped client handles for one operation call each.
pub struct ServiceClientFactory;

impl ServiceClientFactory {
    /// Create a client handle bound to the endpoint and binding.
    pub fn create(endpoint: &str, binding: &BindingConfig) -> ConnectorResult<ServiceClient> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ConnectorError::config_resolution(format!("invalid endpoint '{endpoint}': {e}"))
        })?;

        let http = reqwest::Client::builder()
            .timeout(binding.send_timeout)
            .build()
            .map_err(|e| {
                ConnectorError::transport_with_source("cannot build HTTP client", e)
            })?;

        debug!(
            endpoint = %endpoint,
            security_mode = ?binding.security_mode,
            source = ?binding.source,
            "service client created"
        );

        Ok(ServiceClient {
            http,
            endpoint,
            binding: binding.clone(),
            released: false,
        })
    }
}

/// Scoped client handle exposing the remote operation set.
///
/// Bound to one [`BindingConfig`] and endpoint; never shared or cached
/// across calls.
pub struct ServiceClient {
    http: reqwest::Client,
    endpoint: Url,
    binding: BindingConfig,
    released: bool,
}

impl ServiceClient {
    /// The endpoint this handle is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The binding this handle was created with.
    #[must_use]
    pub fn binding(&self) -> &BindingConfig {
        &self.binding
    }

    /// Release the handle explicitly. Dropping the handle has the same
    /// effect; release happens exactly once either way.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!(endpoint = %self.endpoint, "service client released");
        }
    }

    async fn invoke(&self, operation: &'static str, request: String) -> ConnectorResult<String> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", soap::action(operation))
            .body(request)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::transport_with_source(
                    format!("request to '{}' failed", self.endpoint),
                    e,
                )
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            ConnectorError::transport_with_source("cannot read service response", e)
        })?;

        if bytes.len() as u64 > self.binding.max_payload_bytes {
            return Err(ConnectorError::transport(format!(
                "response of {} bytes exceeds binding payload bound of {} bytes",
                bytes.len(),
                self.binding.max_payload_bytes
            )));
        }

        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| ConnectorError::transport(format!("response is not UTF-8: {e}")))?;

        // A fault explains the failure better than the bare status code,
        // so inspect the body before rejecting on status.
        soap::inspect_response(&body)?;

        if !status.is_success() {
            return Err(ConnectorError::transport(format!(
                "service returned HTTP {status}"
            )));
        }

        Ok(body)
    }

    // ── User registry ────────────────────────────────────────────────

    /// Fetch a single user by id.
    pub async fn get_user(
        &self,
        user_id: &str,
        credentials: &Credentials,
    ) -> ConnectorResult<Option<User>> {
        let request = soap::build_request("GetUser", credentials, |w| {
            xml::write_text_element(w, "userId", user_id)
        })?;
        let body = self.invoke("GetUser", request).await?;
        Ok(soap::parse_response(&body)?.into_iter().next())
    }

    /// Query users by the given filter arguments.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_users(
        &self,
        user_id: &str,
        user_name: &str,
        role_id: &str,
        client: &str,
        active_only: bool,
        credentials: &Credentials,
    ) -> ConnectorResult<Vec<User>> {
        let request = soap::build_request("GetUsers", credentials, |w| {
            xml::write_text_element(w, "userId", user_id)?;
            xml::write_text_element(w, "userName", user_name)?;
            xml::write_text_element(w, "roleId", role_id)?;
            xml::write_text_element(w, "client", client)?;
            xml::write_text_element(w, "activeOnly", if active_only { "true" } else { "false" })
        })?;
        let body = self.invoke("GetUsers", request).await?;
        soap::parse_response(&body)
    }

    /// Fetch a batch of users by id list.
    pub async fn get_users_by_user_id(
        &self,
        user_ids: &[String],
        credentials: &Credentials,
    ) -> ConnectorResult<Vec<User>> {
        let request = soap::build_request("GetUsersByUserId", credentials, |w| {
            xml::write_element(w, &ItemList::new("userIds", user_ids))
        })?;
        let body = self.invoke("GetUsersByUserId", request).await?;
        soap::parse_response(&body)
    }

    /// Create users; atomicity of the batch is the service's concern.
    pub async fn create_users(
        &self,
        users: &[User],
        rollback_enabled: bool,
        credentials: &Credentials,
    ) -> ConnectorResult<ServiceResponse> {
        self.mutate_users("CreateUsers", users, rollback_enabled, credentials)
            .await
    }

    /// Modify users; atomicity of the batch is the service's concern.
    pub async fn modify_users(
        &self,
        users: &[User],
        rollback_enabled: bool,
        credentials: &Credentials,
    ) -> ConnectorResult<ServiceResponse> {
        self.mutate_users("ModifyUsers", users, rollback_enabled, credentials)
            .await
    }

    async fn mutate_users(
        &self,
        operation: &'static str,
        users: &[User],
        rollback_enabled: bool,
        credentials: &Credentials,
    ) -> ConnectorResult<ServiceResponse> {
        let request = soap::build_request(operation, credentials, |w| {
            xml::write_element(w, &ItemList::new("users", users))?;
            xml::write_text_element(
                w,
                "rollbackEnabled",
                if rollback_enabled { "true" } else { "false" },
            )
        })?;
        let body = self.invoke(operation, request).await?;
        Ok(soap::parse_response(&body)?
            .into_iter()
            .next()
            .unwrap_or(ServiceResponse {
                status: None,
                message: None,
            }))
    }

    // ── Resource registry ────────────────────────────────────────────

    /// Query resources within an employment interval.
    pub async fn get_resources(
        &self,
        client: &str,
        resource_id: &str,
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
        credentials: &Credentials,
    ) -> ConnectorResult<Vec<Resource>> {
        let request = soap::build_request("GetResources", credentials, |w| {
            xml::write_text_element(w, "client", client)?;
            xml::write_text_element(w, "resourceId", resource_id)?;
            xml::write_text_element(w, "dateFrom", &date_from.to_rfc3339())?;
            xml::write_text_element(w, "dateTo", &date_to.to_rfc3339())
        })?;
        let body = self.invoke("GetResources", request).await?;
        soap::parse_response(&body)
    }

    /// Fetch all workplaces of a client.
    pub async fn get_workplaces(
        &self,
        client: &str,
        credentials: &Credentials,
    ) -> ConnectorResult<Vec<WorkPlace>> {
        let request = soap::build_request("GetWorkplaces", credentials, |w| {
            xml::write_text_element(w, "client", client)
        })?;
        let body = self.invoke("GetWorkplaces", request).await?;
        soap::parse_response(&body)
    }

    /// Fetch the organization units of a client.
    pub async fn get_organization(
        &self,
        client: &str,
        credentials: &Credentials,
    ) -> ConnectorResult<Vec<Organization>> {
        let request = soap::build_request("GetOrganization", credentials, |w| {
            xml::write_text_element(w, "client", client)
        })?;
        let body = self.invoke("GetOrganization", request).await?;
        soap::parse_response(&body)
    }

    /// Write back modified resources.
    pub async fn modify_resources(
        &self,
        resources: &[Resource],
        credentials: &Credentials,
    ) -> ConnectorResult<ServiceResponse> {
        let request = soap::build_request("ModifyResources", credentials, |w| {
            xml::write_element(w, &ItemList::new("resources", resources))
        })?;
        let body = self.invoke("ModifyResources", request).await?;
        Ok(soap::parse_response(&body)?
            .into_iter()
            .next()
            .unwrap_or(ServiceResponse {
                status: None,
                message: None,
            }))
    }
}

impl Drop for ServiceClient {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("binding", &self.binding)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingResolver;

    #[test]
    fn test_factory_rejects_invalid_endpoint() {
        let binding = BindingResolver::new(None)
            .resolve("https://erp.example.com/ws")
            .unwrap();
        let err = ServiceClientFactory::create("not a url", &binding).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_RESOLUTION");
    }

    #[test]
    fn test_client_close_and_drop_release_once() {
        let binding = BindingResolver::new(None)
            .resolve("https://erp.example.com/ws")
            .unwrap();
        let client = ServiceClientFactory::create("https://erp.example.com/ws", &binding).unwrap();
        assert!(!client.released);
        // close() consumes the handle; the drop guard then sees it already
        // released and does nothing further.
        client.close();

        let client = ServiceClientFactory::create("https://erp.example.com/ws", &binding).unwrap();
        drop(client);
    }

    #[test]
    fn test_client_keeps_binding_and_endpoint() {
        let binding = BindingResolver::new(None)
            .resolve("http://erp.example.com/ws")
            .unwrap();
        let client = ServiceClientFactory::create("http://erp.example.com/ws", &binding).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://erp.example.com/ws");
        assert_eq!(client.binding(), &binding);
    }
}
