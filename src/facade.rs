//! User-administration operation facade
//!
//! The public operation set of the connector. Every operation follows the
//! same shape: trace the input, resolve the transport binding for the
//! caller-supplied service URL, acquire a scoped client, forward the call
//! with the caller's credentials, trace the output, and release the
//! client. Failures are logged once with the operation name and re-raised
//! unchanged; recovery policy belongs entirely to the caller.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::binding::BindingResolver;
use crate::client::{ServiceClient, ServiceClientFactory};
use crate::credentials::{ConfigParameters, Credentials, DecryptSecret};
use crate::diagnostics;
use crate::error::ConnectorResult;
use crate::models::{Organization, Resource, ServiceResponse, User, WorkPlace};
use crate::xml::{ItemList, ToXml};

/// Facade over the remote user-administration service.
///
/// Stateless apart from its injected configuration: the optional binding
/// override file path and the secure-string facility. Safe to share
/// across concurrent callers; every operation resolves its own binding
/// and acquires its own client.
pub struct UserAdministration {
    resolver: BindingResolver,
    decrypt: Arc<dyn DecryptSecret>,
}

impl UserAdministration {
    /// Create the facade.
    ///
    /// `override_config` points at a binding override file (conventionally
    /// `webservice.config`); pass `None` to always use the default
    /// binding. `decrypt` is the external secure-string facility used
    /// when building credentials.
    pub fn new(override_config: Option<PathBuf>, decrypt: Arc<dyn DecryptSecret>) -> Self {
        Self {
            resolver: BindingResolver::new(override_config),
            decrypt,
        }
    }

    /// Build service credentials from host configuration parameters.
    pub fn get_credentials(&self, parameters: &ConfigParameters) -> ConnectorResult<Credentials> {
        Credentials::from_parameters(parameters, self.decrypt.as_ref()).inspect_err(|err| {
            error!(operation = "GetCredentials", error = %err, "credential assembly failed");
        })
    }

    // ── User registry ────────────────────────────────────────────────

    /// Fetch a single user by id.
    pub async fn get_user(
        &self,
        user_id: &str,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<Option<User>> {
        debug!(operation = "GetUser", user_id, "dispatching request");
        let user = self
            .execute("GetUser", service_url, async |client| {
                client.get_user(user_id, credentials).await
            })
            .await?;
        match &user {
            Some(found) => self.trace_response("GetUser", found),
            None => debug!(operation = "GetUser", "empty response"),
        }
        Ok(user)
    }

    /// Query users by filter arguments.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_users(
        &self,
        user_id: &str,
        user_name: &str,
        role_id: &str,
        client: &str,
        active_only: bool,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<Vec<User>> {
        debug!(
            operation = "GetUsers",
            user_id, user_name, role_id, client, active_only, "dispatching request"
        );
        let users = self
            .execute("GetUsers", service_url, async |handle| {
                handle
                    .get_users(user_id, user_name, role_id, client, active_only, credentials)
                    .await
            })
            .await?;
        if users.is_empty() {
            debug!(operation = "GetUsers", "empty response");
        } else {
            self.trace_response("GetUsers", &ItemList::new("Users", &users));
        }
        Ok(users)
    }

    /// Fetch a batch of users by id list.
    pub async fn get_users_by_user_id(
        &self,
        user_ids: &[String],
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<Vec<User>> {
        self.trace_request("GetUsersByUserId", &ItemList::new("userIds", user_ids));
        let users = self
            .execute("GetUsersByUserId", service_url, async |client| {
                client.get_users_by_user_id(user_ids, credentials).await
            })
            .await?;
        if users.is_empty() {
            debug!(operation = "GetUsersByUserId", "empty response");
        } else {
            self.trace_response("GetUsersByUserId", &ItemList::new("Users", &users));
        }
        Ok(users)
    }

    /// Create users on the service. `rollback_enabled` requests
    /// all-or-nothing semantics for the batch; honoring it is entirely the
    /// service's responsibility.
    pub async fn create_users(
        &self,
        users: &[User],
        rollback_enabled: bool,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<()> {
        if let Some(fragment) = self.render("CreateUsers", &ItemList::new("Users", users)) {
            debug!(
                operation = "CreateUsers",
                rollback_enabled,
                users = %fragment,
                "dispatching request"
            );
        }
        let response = self
            .execute("CreateUsers", service_url, async |client| {
                client.create_users(users, rollback_enabled, credentials).await
            })
            .await?;
        self.trace_response("CreateUsers", &response);
        Ok(())
    }

    /// Modify users on the service. See [`Self::create_users`] for the
    /// `rollback_enabled` contract.
    pub async fn modify_users(
        &self,
        users: &[User],
        rollback_enabled: bool,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<()> {
        if let Some(fragment) = self.render("ModifyUsers", &ItemList::new("Users", users)) {
            debug!(
                operation = "ModifyUsers",
                rollback_enabled,
                users = %fragment,
                "dispatching request"
            );
        }
        let response = self
            .execute("ModifyUsers", service_url, async |client| {
                client.modify_users(users, rollback_enabled, credentials).await
            })
            .await?;
        self.trace_response("ModifyUsers", &response);
        Ok(())
    }

    // ── Resource registry ────────────────────────────────────────────

    /// Query resources within an employment interval.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_resources(
        &self,
        client: &str,
        resource_id: &str,
        date_from: DateTime<Utc>,
        date_to: DateTime<Utc>,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<Vec<Resource>> {
        debug!(
            operation = "GetResources",
            client,
            resource_id,
            date_from = %date_from,
            date_to = %date_to,
            "dispatching request"
        );
        let resources = self
            .execute("GetResources", service_url, async |handle| {
                handle
                    .get_resources(client, resource_id, date_from, date_to, credentials)
                    .await
            })
            .await?;
        info!(
            operation = "GetResources",
            count = resources.len(),
            "resource query completed"
        );
        self.trace_response("GetResources", &ItemList::new("Resources", &resources));
        Ok(resources)
    }

    /// Fetch all workplaces of a client.
    pub async fn get_workplaces(
        &self,
        client: &str,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<Vec<WorkPlace>> {
        debug!(operation = "GetWorkplaces", client, "dispatching request");
        let workplaces = self
            .execute("GetWorkplaces", service_url, async |handle| {
                handle.get_workplaces(client, credentials).await
            })
            .await?;
        info!(
            operation = "GetWorkplaces",
            count = workplaces.len(),
            "workplace query completed"
        );
        self.trace_response("GetWorkplaces", &ItemList::new("WorkPlaces", &workplaces));
        Ok(workplaces)
    }

    /// Fetch the organization units of a client.
    pub async fn get_organization(
        &self,
        client: &str,
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<Vec<Organization>> {
        debug!(operation = "GetOrganization", client, "dispatching request");
        let organizations = self
            .execute("GetOrganization", service_url, async |handle| {
                handle.get_organization(client, credentials).await
            })
            .await?;
        info!(
            operation = "GetOrganization",
            count = organizations.len(),
            "organization query completed"
        );
        self.trace_response(
            "GetOrganization",
            &ItemList::new("Organizations", &organizations),
        );
        Ok(organizations)
    }

    /// Write back modified resources and return the service's outcome.
    pub async fn modify_resources(
        &self,
        resources: &[Resource],
        credentials: &Credentials,
        service_url: &str,
    ) -> ConnectorResult<ServiceResponse> {
        self.trace_request("ModifyResources", &ItemList::new("Resources", resources));
        let response = self
            .execute("ModifyResources", service_url, async |client| {
                client.modify_resources(resources, credentials).await
            })
            .await?;
        // The outcome element is the interesting part of this response;
        // log its body rather than the wrapper.
        match diagnostics::serialize(&response, diagnostics::RESPONSE_BODY) {
            Ok(fragment) => {
                debug!(operation = "ModifyResources", response = %fragment, "operation completed");
            }
            Err(err) => {
                error!(operation = "ModifyResources", error = %err, "response diagnostics failed");
            }
        }
        Ok(response)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Resolve the binding, acquire a scoped client, run the call, and
    /// log any failure once before re-raising it unchanged. The client is
    /// released when the inner scope ends, on success and failure alike.
    async fn execute<T, F>(
        &self,
        operation: &'static str,
        service_url: &str,
        call: F,
    ) -> ConnectorResult<T>
    where
        F: AsyncFnOnce(&ServiceClient) -> ConnectorResult<T>,
    {
        let outcome = async {
            let binding = self.resolver.resolve(service_url)?;
            let client = ServiceClientFactory::create(service_url, &binding)?;
            call(&client).await
        }
        .await;

        if let Err(err) = &outcome {
            error!(operation, error = %err, code = err.error_code(), "operation failed");
        }
        outcome
    }

    fn render<T: ToXml + ?Sized>(&self, operation: &'static str, payload: &T) -> Option<String> {
        match diagnostics::serialize(payload, diagnostics::FULL_DOCUMENT) {
            Ok(fragment) => Some(fragment),
            Err(err) => {
                error!(operation, error = %err, "payload diagnostics failed");
                None
            }
        }
    }

    fn trace_request<T: ToXml + ?Sized>(&self, operation: &'static str, payload: &T) {
        if let Some(fragment) = self.render(operation, payload) {
            debug!(operation, request = %fragment, "dispatching request");
        }
    }

    fn trace_response<T: ToXml + ?Sized>(&self, operation: &'static str, payload: &T) {
        if let Some(fragment) = self.render(operation, payload) {
            debug!(operation, response = %fragment, "operation completed");
        }
    }
}

impl std::fmt::Debug for UserAdministration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAdministration")
            .field("resolver", &self.resolver)
            .finish()
    }
}
