//! Transport binding resolution
//!
//! Decides, per call, which transport configuration to use against a
//! caller-supplied endpoint: either the fixed default binding (security
//! mode derived from the URL scheme) or a named binding loaded verbatim
//! from an override file. An override that is present but broken is a
//! fatal error; resolution never falls back silently.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use url::Url;

use crate::error::{ConnectorError, ConnectorResult};

/// Upper bound on response payload size for the default binding.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 2_147_483_647;

/// Send timeout for the default binding.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(600);

/// Name of the binding looked up inside an override file.
pub const OVERRIDE_BINDING_NAME: &str = "agressoMA";

/// Conventional file name for the binding override file.
pub const OVERRIDE_FILE_NAME: &str = "webservice.config";

/// Whether transport-level encryption is applied to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// No transport security.
    None,
    /// Transport-level encryption (TLS).
    Transport,
}

impl SecurityMode {
    /// Map an endpoint URL scheme to the default security mode.
    fn from_scheme(scheme: &str) -> Self {
        match scheme {
            "https" => SecurityMode::Transport,
            _ => SecurityMode::None,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "None" => Some(SecurityMode::None),
            "Transport" => Some(SecurityMode::Transport),
            _ => None,
        }
    }
}

/// Where a resolved binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    /// Constructed from the fixed defaults and the endpoint scheme.
    Default,
    /// Loaded from an override file and trusted verbatim.
    Override,
}

/// Transport configuration used to reach a remote service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfig {
    /// Upper bound on the response payload size in bytes.
    pub max_payload_bytes: u64,

    /// Timeout for one request/response cycle.
    pub send_timeout: Duration,

    /// Transport security mode.
    pub security_mode: SecurityMode,

    /// Where this binding came from.
    pub source: BindingSource,
}

impl BindingConfig {
    /// Construct the default binding for an endpoint URL.
    ///
    /// The security mode is `Transport` iff the parsed scheme is `https`.
    /// A URL that cannot be parsed (including one with no `:` separator)
    /// is a fatal resolution error.
    pub fn default_for(endpoint_url: &str) -> ConnectorResult<Self> {
        let url = Url::parse(endpoint_url).map_err(|e| {
            ConnectorError::config_resolution(format!(
                "cannot determine scheme of endpoint '{endpoint_url}': {e}"
            ))
        })?;

        Ok(Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            security_mode: SecurityMode::from_scheme(url.scheme()),
            source: BindingSource::Default,
        })
    }
}

/// Resolves the transport binding for each call.
///
/// The override path is injected at construction; no ambient
/// configuration-folder lookup happens here. The file is probed on every
/// resolution, so dropping an override file next to a running host takes
/// effect on the next call.
#[derive(Debug, Clone)]
pub struct BindingResolver {
    override_path: Option<PathBuf>,
}

impl BindingResolver {
    /// Create a resolver with an optional override file path.
    #[must_use]
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }

    /// Resolve the binding for the given endpoint URL.
    ///
    /// If the override file exists, the named binding
    /// [`OVERRIDE_BINDING_NAME`] is loaded from it and used verbatim; the
    /// endpoint scheme is not consulted. Otherwise the default binding is
    /// constructed from the URL scheme.
    pub fn resolve(&self, endpoint_url: &str) -> ConnectorResult<BindingConfig> {
        if let Some(path) = &self.override_path {
            if path.exists() {
                let binding = load_override(path, OVERRIDE_BINDING_NAME)?;
                debug!(
                    path = %path.display(),
                    binding = OVERRIDE_BINDING_NAME,
                    "using transport binding from override file"
                );
                return Ok(binding);
            }
        }
        BindingConfig::default_for(endpoint_url)
    }
}

fn load_override(path: &Path, name: &str) -> ConnectorResult<BindingConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConnectorError::config_resolution(format!(
            "cannot read override file '{}': {e}",
            path.display()
        ))
    })?;
    parse_override(&contents, name).map_err(|message| {
        ConnectorError::config_resolution(format!(
            "override file '{}': {message}",
            path.display()
        ))
    })
}

/// Parse an override file and extract the named binding.
///
/// Expected shape:
///
/// ```xml
/// <bindings>
///   <binding name="agressoMA">
///     <securityMode>Transport</securityMode>
///     <maxPayloadBytes>1048576</maxPayloadBytes>
///     <sendTimeoutSecs>120</sendTimeoutSecs>
///   </binding>
/// </bindings>
/// ```
///
/// `securityMode` is required; the payload bound and timeout fall back to
/// the fixed defaults when omitted. A missing named binding is an error,
/// as is any malformed content.
fn parse_override(xml: &str, name: &str) -> Result<BindingConfig, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_named = false;
    let mut field: Option<String> = None;
    let mut security_mode: Option<SecurityMode> = None;
    let mut max_payload_bytes = DEFAULT_MAX_PAYLOAD_BYTES;
    let mut send_timeout = DEFAULT_SEND_TIMEOUT;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let elem = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if elem == "binding" {
                    in_named = false;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| e.to_string())?;
                        if attr.key.as_ref() == b"name" {
                            let value = attr.unescape_value().map_err(|e| e.to_string())?;
                            in_named = value == name;
                        }
                    }
                } else if in_named {
                    field = Some(elem);
                }
            }
            Event::Text(t) => {
                if !in_named {
                    continue;
                }
                let text = t.unescape().map_err(|e| e.to_string())?;
                match field.as_deref() {
                    Some("securityMode") => {
                        security_mode = Some(SecurityMode::parse(&text).ok_or_else(|| {
                            format!("unknown securityMode '{text}' in binding '{name}'")
                        })?);
                    }
                    Some("maxPayloadBytes") => {
                        max_payload_bytes = text.parse().map_err(|_| {
                            format!("invalid maxPayloadBytes '{text}' in binding '{name}'")
                        })?;
                    }
                    Some("sendTimeoutSecs") => {
                        let secs: u64 = text.parse().map_err(|_| {
                            format!("invalid sendTimeoutSecs '{text}' in binding '{name}'")
                        })?;
                        send_timeout = Duration::from_secs(secs);
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                let elem = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if elem == "binding" {
                    if in_named {
                        let security_mode = security_mode.ok_or_else(|| {
                            format!("binding '{name}' does not specify securityMode")
                        })?;
                        return Ok(BindingConfig {
                            max_payload_bytes,
                            send_timeout,
                            security_mode,
                            source: BindingSource::Override,
                        });
                    }
                } else {
                    field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(format!("binding '{name}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const OVERRIDE_XML: &str = r#"<bindings>
  <binding name="agressoMA">
    <securityMode>Transport</securityMode>
    <maxPayloadBytes>1048576</maxPayloadBytes>
    <sendTimeoutSecs>120</sendTimeoutSecs>
  </binding>
</bindings>"#;

    #[test]
    fn test_default_binding_https() {
        let binding = BindingConfig::default_for("https://erp.example.com/ws").unwrap();
        assert_eq!(binding.security_mode, SecurityMode::Transport);
        assert_eq!(binding.source, BindingSource::Default);
        assert_eq!(binding.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
        assert_eq!(binding.send_timeout, DEFAULT_SEND_TIMEOUT);
    }

    #[test]
    fn test_default_binding_http() {
        let binding = BindingConfig::default_for("http://erp.example.com/ws").unwrap();
        assert_eq!(binding.security_mode, SecurityMode::None);
        assert_eq!(binding.source, BindingSource::Default);
    }

    #[test]
    fn test_default_binding_unparseable_url() {
        let err = BindingConfig::default_for("erp.example.com/ws").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_RESOLUTION");
    }

    #[test]
    fn test_parse_override_named_binding() {
        let binding = parse_override(OVERRIDE_XML, "agressoMA").unwrap();
        assert_eq!(binding.security_mode, SecurityMode::Transport);
        assert_eq!(binding.max_payload_bytes, 1_048_576);
        assert_eq!(binding.send_timeout, Duration::from_secs(120));
        assert_eq!(binding.source, BindingSource::Override);
    }

    #[test]
    fn test_parse_override_missing_binding() {
        let err = parse_override(OVERRIDE_XML, "otherMA").unwrap_err();
        assert!(err.contains("not found"), "unexpected error: {err}");
    }

    #[test]
    fn test_parse_override_defaults_for_optional_fields() {
        let xml = r#"<bindings>
  <binding name="agressoMA">
    <securityMode>None</securityMode>
  </binding>
</bindings>"#;
        let binding = parse_override(xml, "agressoMA").unwrap();
        assert_eq!(binding.security_mode, SecurityMode::None);
        assert_eq!(binding.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
        assert_eq!(binding.send_timeout, DEFAULT_SEND_TIMEOUT);
    }

    #[test]
    fn test_parse_override_requires_security_mode() {
        let xml = r#"<bindings>
  <binding name="agressoMA">
    <maxPayloadBytes>1024</maxPayloadBytes>
  </binding>
</bindings>"#;
        let err = parse_override(xml, "agressoMA").unwrap_err();
        assert!(err.contains("securityMode"), "unexpected error: {err}");
    }

    #[test]
    fn test_parse_override_rejects_unknown_security_mode() {
        let xml = r#"<bindings>
  <binding name="agressoMA">
    <securityMode>Message</securityMode>
  </binding>
</bindings>"#;
        assert!(parse_override(xml, "agressoMA").is_err());
    }

    #[test]
    fn test_resolver_without_override_uses_scheme() {
        let resolver = BindingResolver::new(None);
        let binding = resolver.resolve("https://erp.example.com/ws").unwrap();
        assert_eq!(binding.security_mode, SecurityMode::Transport);
        assert_eq!(binding.source, BindingSource::Default);
    }

    #[test]
    fn test_resolver_override_wins_regardless_of_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OVERRIDE_FILE_NAME);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(OVERRIDE_XML.as_bytes()).unwrap();

        let resolver = BindingResolver::new(Some(path));
        // http endpoint, but the override still forces Transport.
        let binding = resolver.resolve("http://erp.example.com/ws").unwrap();
        assert_eq!(binding.security_mode, SecurityMode::Transport);
        assert_eq!(binding.source, BindingSource::Override);
        assert_eq!(binding.max_payload_bytes, 1_048_576);
    }

    #[test]
    fn test_resolver_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = BindingResolver::new(Some(dir.path().join(OVERRIDE_FILE_NAME)));
        let binding = resolver.resolve("http://erp.example.com/ws").unwrap();
        assert_eq!(binding.source, BindingSource::Default);
    }

    #[test]
    fn test_resolver_malformed_override_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OVERRIDE_FILE_NAME);
        fs::write(&path, "<bindings><binding name=").unwrap();

        let resolver = BindingResolver::new(Some(path));
        let err = resolver.resolve("https://erp.example.com/ws").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_RESOLUTION");
    }
}
