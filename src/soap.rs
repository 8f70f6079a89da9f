//! SOAP 1.1 wire codec
//!
//! Builds request envelopes for the user-administration service and picks
//! apart response envelopes. The service schema is external; this module
//! only knows the envelope framing, the credential element every
//! operation carries, and how to detect a fault.

use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::credentials::Credentials;
use crate::error::{ConnectorError, ConnectorResult};
use crate::xml::{self, FromXml, XmlWriter};

/// SOAP 1.1 envelope namespace.
const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the remote user-administration service contract.
pub(crate) const SERVICE_NS: &str = "http://services.agresso.com/UserAdministrationV200702";

/// `SOAPAction` header value for an operation.
pub(crate) fn action(operation: &str) -> String {
    format!("\"{SERVICE_NS}/{operation}\"")
}

/// Build a request envelope for one operation.
///
/// `write_args` contributes the operation-specific argument elements; the
/// credential element is appended after them on every request.
pub(crate) fn build_request(
    operation: &str,
    credentials: &Credentials,
    write_args: impl FnOnce(&mut XmlWriter) -> Result<(), quick_xml::Error>,
) -> ConnectorResult<String> {
    let mut writer = XmlWriter::new(Vec::new());

    let build = |writer: &mut XmlWriter| -> Result<(), quick_xml::Error> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut envelope = BytesStart::new("soap:Envelope");
        envelope.push_attribute(("xmlns:soap", ENVELOPE_NS));
        writer.write_event(Event::Start(envelope))?;
        writer.write_event(Event::Start(BytesStart::new("soap:Body")))?;

        let mut body = BytesStart::new(operation);
        body.push_attribute(("xmlns", SERVICE_NS));
        writer.write_event(Event::Start(body))?;

        write_args(writer)?;
        write_credentials(writer, credentials)?;

        writer.write_event(Event::End(BytesEnd::new(operation)))?;
        writer.write_event(Event::End(BytesEnd::new("soap:Body")))?;
        writer.write_event(Event::End(BytesEnd::new("soap:Envelope")))?;
        Ok(())
    };

    build(&mut writer)
        .map_err(|e| ConnectorError::transport(format!("cannot build {operation} request: {e}")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| ConnectorError::transport(format!("request envelope is not UTF-8: {e}")))
}

fn write_credentials(
    writer: &mut XmlWriter,
    credentials: &Credentials,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("credentials")))?;
    xml::write_opt_element(writer, "Username", credentials.username.as_deref())?;
    xml::write_opt_element(writer, "Password", credentials.password())?;
    xml::write_opt_element(writer, "Client", credentials.client.as_deref())?;
    writer.write_event(Event::End(BytesEnd::new("credentials")))?;
    Ok(())
}

/// Verify the response body is a SOAP envelope and surface any fault.
///
/// Returns a [`ConnectorError::ServiceFault`] carrying the fault code and
/// string when the body holds a fault, a transport error when the body is
/// not an envelope at all, and `Ok(())` otherwise.
pub(crate) fn inspect_response(body: &str) -> ConnectorResult<()> {
    ensure_envelope(body)?;

    let faults = xml::read_records(body, "Fault")
        .map_err(|e| ConnectorError::transport(format!("malformed service response: {e}")))?;
    if let Some(mut fault) = faults.into_iter().next() {
        return Err(ConnectorError::service_fault(
            fault.remove("faultcode").unwrap_or_default(),
            fault.remove("faultstring").unwrap_or_default(),
        ));
    }

    Ok(())
}

/// Parse the records of one type out of a response envelope.
pub(crate) fn parse_response<T: FromXml>(body: &str) -> ConnectorResult<Vec<T>> {
    xml::parse_records(body)
        .map_err(|message| ConnectorError::transport(format!("malformed service response: {message}")))
}

fn ensure_envelope(body: &str) -> ConnectorResult<()> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return if e.local_name().as_ref() == b"Envelope" {
                    Ok(())
                } else {
                    Err(ConnectorError::transport(
                        "service response is not a SOAP envelope",
                    ))
                };
            }
            Ok(Event::Eof) => {
                return Err(ConnectorError::transport(
                    "service response is not a SOAP envelope",
                ));
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ConnectorError::transport(format!(
                    "malformed service response: {e}"
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{ConfigParameter, ConfigParameters, DecryptSecret, SecureValue};
    use crate::models::User;

    struct Passthrough;

    impl DecryptSecret for Passthrough {
        fn decrypt(&self, value: &SecureValue) -> ConnectorResult<String> {
            Ok(value.raw().to_string())
        }
    }

    fn credentials() -> Credentials {
        let mut params = ConfigParameters::new();
        params.insert("Username".to_string(), ConfigParameter::plain("svc"));
        params.insert("Password".to_string(), ConfigParameter::secure("s3cret"));
        params.insert("Client".to_string(), ConfigParameter::plain("C1"));
        Credentials::from_parameters(&params, &Passthrough).unwrap()
    }

    #[test]
    fn test_build_request_envelope_shape() {
        let body = build_request("GetUser", &credentials(), |w| {
            xml::write_text_element(w, "userId", "U1")
        })
        .unwrap();

        assert!(body.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(body.contains(r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#));
        assert!(body.contains(&format!(r#"<GetUser xmlns="{SERVICE_NS}">"#)));
        assert!(body.contains("<userId>U1</userId>"));
        assert!(body.contains(
            "<credentials><Username>svc</Username><Password>s3cret</Password>\
             <Client>C1</Client></credentials>"
        ));
    }

    #[test]
    fn test_action_header_value() {
        assert_eq!(
            action("GetUsers"),
            format!("\"{SERVICE_NS}/GetUsers\"")
        );
    }

    #[test]
    fn test_inspect_response_accepts_envelope() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
            <soap:Body><GetUserResponse/></soap:Body></soap:Envelope>"#;
        assert!(inspect_response(body).is_ok());
    }

    #[test]
    fn test_inspect_response_surfaces_fault() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
            <soap:Body><soap:Fault>
                <faultcode>soap:Client</faultcode>
                <faultstring>invalid credentials</faultstring>
            </soap:Fault></soap:Body></soap:Envelope>"#;

        let err = inspect_response(body).unwrap_err();
        match err {
            ConnectorError::ServiceFault { code, message } => {
                assert_eq!(code, "soap:Client");
                assert_eq!(message, "invalid credentials");
            }
            other => panic!("expected service fault, got {other:?}"),
        }
    }

    #[test]
    fn test_inspect_response_rejects_non_envelope() {
        let err = inspect_response("<html>gateway timeout</html>").unwrap_err();
        assert_eq!(err.error_code(), "TRANSPORT");
    }

    #[test]
    fn test_parse_response_records() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
            <soap:Body><GetUsersResponse><GetUsersResult>
                <User><UserId>U1</UserId><UserName>Test User</UserName></User>
                <User><UserId>U2</UserId></User>
            </GetUsersResult></GetUsersResponse></soap:Body></soap:Envelope>"#;

        let users: Vec<User> = parse_response(body).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, "U1");
        assert_eq!(users[0].user_name.as_deref(), Some("Test User"));
        assert_eq!(users[1].user_id, "U2");
    }
}
