//! # Agresso User-Administration Connector
//!
//! Adapts a provisioning host to the Agresso user-administration web
//! service (SOAP over HTTP/S). The connector shields callers from
//! transport-binding selection, security-mode negotiation, and response
//! diagnostics capture; the remote call itself is a plain pass-through.
//!
//! ## Features
//!
//! - Per-call binding resolution: `https` endpoints get transport
//!   security by default, and a named binding in an optional
//!   `webservice.config` override file wins over both schemes
//! - Scoped client handles, released exactly once per call
//! - XML diagnostic fragments of every request and response payload,
//!   with optional path filtering
//! - Credentials assembled from host parameters with secret decryption
//!   behind an injected capability
//!
//! ## Example
//!
//! ```ignore
//! use agresso_connector::{ConfigParameter, UserAdministration};
//! use std::sync::Arc;
//!
//! let facade = UserAdministration::new(None, Arc::new(platform_decrypt));
//!
//! let mut params = agresso_connector::ConfigParameters::new();
//! params.insert("Username".into(), ConfigParameter::plain("svc"));
//! params.insert("Password".into(), ConfigParameter::secure(encrypted));
//! params.insert("Client".into(), ConfigParameter::plain("C1"));
//! let credentials = facade.get_credentials(&params)?;
//!
//! let user = facade
//!     .get_user("U1", &credentials, "https://erp.example.com/useradmin")
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`binding`] - Transport binding resolution and the override file
//! - [`credentials`] - Credential assembly and the secrets boundary
//! - [`client`] - Scoped service client handles
//! - [`diagnostics`] - XML fragment rendering for logging
//! - [`facade`] - The public operation set
//! - [`models`] - Domain records of the remote registry
//! - [`error`] - Error types with class codes
//! - [`xml`] - Explicit per-type XML write/read seams

pub mod binding;
pub mod client;
pub mod credentials;
pub mod diagnostics;
pub mod error;
pub mod facade;
pub mod models;
mod soap;
pub mod xml;

// Re-exports
pub use binding::{BindingConfig, BindingResolver, BindingSource, SecurityMode};
pub use client::{ServiceClient, ServiceClientFactory};
pub use credentials::{
    ConfigParameter, ConfigParameters, Credentials, DecryptSecret, SecureValue,
};
pub use error::{ConnectorError, ConnectorResult};
pub use facade::UserAdministration;
pub use models::{Organization, Resource, ServiceResponse, User, WorkPlace};
