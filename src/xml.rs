//! XML write/read capabilities
//!
//! Explicit per-type serialization seams used by the diagnostics renderer
//! and the wire codec. Each message type states how it is written as an
//! XML element and how it is rebuilt from a flat field map; there is no
//! runtime type introspection anywhere.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Writer used by all XML-producing code in this crate.
pub type XmlWriter = Writer<Vec<u8>>;

/// Capability to write a value as one XML element.
pub trait ToXml {
    /// Element name this value serializes under.
    fn tag(&self) -> &str;

    /// Write the element's content (child elements or text).
    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error>;
}

/// Capability to rebuild a value from a flat element field map.
pub trait FromXml: Sized {
    /// Element name records of this type appear under.
    fn record_tag() -> &'static str;

    /// Build a value from child-element text fields.
    fn from_fields(fields: FieldMap) -> Result<Self, String>;
}

/// Child element name to text content, for one record element.
pub type FieldMap = HashMap<String, String>;

/// A borrowed slice rendered as a container element of like-tagged items.
pub struct ItemList<'a, T> {
    tag: &'a str,
    items: &'a [T],
}

impl<'a, T> ItemList<'a, T> {
    /// Wrap a slice under the given container tag.
    #[must_use]
    pub fn new(tag: &'a str, items: &'a [T]) -> Self {
        Self { tag, items }
    }
}

impl<T: ToXml> ToXml for ItemList<'_, T> {
    fn tag(&self) -> &str {
        self.tag
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        for item in self.items {
            write_element(writer, item)?;
        }
        Ok(())
    }
}

impl ToXml for String {
    fn tag(&self) -> &str {
        "string"
    }

    fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
        writer.write_event(Event::Text(BytesText::new(self)))?;
        Ok(())
    }
}

/// Write a value as a complete element: start tag, content, end tag.
pub fn write_element<T: ToXml + ?Sized>(
    writer: &mut XmlWriter,
    value: &T,
) -> Result<(), quick_xml::Error> {
    let tag = value.tag().to_string();
    writer.write_event(Event::Start(BytesStart::new(tag.as_str())))?;
    value.write_content(writer)?;
    writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    Ok(())
}

/// Write a child element holding escaped text.
pub fn write_text_element(
    writer: &mut XmlWriter,
    tag: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Write a child element when the value is present; absent values are
/// omitted entirely.
pub fn write_opt_element(
    writer: &mut XmlWriter,
    tag: &str,
    text: Option<&str>,
) -> Result<(), quick_xml::Error> {
    match text {
        Some(text) => write_text_element(writer, tag, text),
        None => Ok(()),
    }
}

/// Render a value into a standalone XML document string.
pub fn to_document<T: ToXml + ?Sized>(value: &T) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, value)?;
    String::from_utf8(writer.into_inner()).map_err(|e| quick_xml::Error::Io(std::sync::Arc::new(
        std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    )))
}

/// Collect every element named `record_tag` in the document as a flat
/// field map of its direct children. Nested structure below the direct
/// children is not captured; the wire records of this service are flat.
pub fn read_records(xml: &str, record_tag: &str) -> Result<Vec<FieldMap>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut fields: Option<FieldMap> = None;
    let mut child: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match fields {
                    None => {
                        if name == record_tag {
                            fields = Some(FieldMap::new());
                            depth = 0;
                            child = None;
                        }
                    }
                    Some(_) => {
                        depth += 1;
                        child = (depth == 1).then_some(name);
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(map), Some(name)) = (fields.as_mut(), child.as_ref()) {
                    let text = t.unescape().map_err(|e| e.to_string())?;
                    map.insert(name.clone(), text.into_owned());
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if fields.is_none() && name == record_tag {
                    records.push(FieldMap::new());
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if fields.is_some() {
                    if depth == 0 {
                        if name == record_tag {
                            records.push(fields.take().unwrap_or_default());
                        }
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            child = None;
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

/// Parse every `record_tag` element in the document into typed records.
pub fn parse_records<T: FromXml>(xml: &str) -> Result<Vec<T>, String> {
    read_records(xml, T::record_tag())?
        .into_iter()
        .map(T::from_fields)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        id: String,
        label: Option<String>,
    }

    impl ToXml for Probe {
        fn tag(&self) -> &str {
            "Probe"
        }

        fn write_content(&self, writer: &mut XmlWriter) -> Result<(), quick_xml::Error> {
            write_text_element(writer, "Id", &self.id)?;
            write_opt_element(writer, "Label", self.label.as_deref())
        }
    }

    #[test]
    fn test_to_document_escapes_text() {
        let probe = Probe {
            id: "a<b".to_string(),
            label: None,
        };
        let doc = to_document(&probe).unwrap();
        assert_eq!(doc, "<Probe><Id>a&lt;b</Id></Probe>");
    }

    #[test]
    fn test_item_list_wraps_elements() {
        let probes = vec![
            Probe {
                id: "1".to_string(),
                label: Some("first".to_string()),
            },
            Probe {
                id: "2".to_string(),
                label: None,
            },
        ];
        let doc = to_document(&ItemList::new("Probes", &probes)).unwrap();
        assert_eq!(
            doc,
            "<Probes><Probe><Id>1</Id><Label>first</Label></Probe>\
             <Probe><Id>2</Id></Probe></Probes>"
        );
    }

    #[test]
    fn test_read_records_collects_fields() {
        let xml = "<wrap><Probe><Id>1</Id><Label>one &amp; only</Label></Probe>\
                   <Probe><Id>2</Id></Probe></wrap>";
        let records = read_records(xml, "Probe").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Id").map(String::as_str), Some("1"));
        assert_eq!(
            records[0].get("Label").map(String::as_str),
            Some("one & only")
        );
        assert_eq!(records[1].get("Id").map(String::as_str), Some("2"));
        assert!(records[1].get("Label").is_none());
    }

    #[test]
    fn test_read_records_ignores_nested_structure() {
        let xml = "<Probe><Id>1</Id><Extra><Deep>x</Deep></Extra></Probe>";
        let records = read_records(xml, "Probe").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Id").map(String::as_str), Some("1"));
        assert!(records[0].get("Deep").is_none());
    }

    #[test]
    fn test_read_records_malformed_input() {
        assert!(read_records("<Probe><Id>1</Probe>", "Probe").is_err());
    }

    #[test]
    fn test_string_items_render_as_string_elements() {
        let ids = vec!["U1".to_string(), "U2".to_string()];
        let doc = to_document(&ItemList::new("userIds", &ids)).unwrap();
        assert_eq!(
            doc,
            "<userIds><string>U1</string><string>U2</string></userIds>"
        );
    }
}
