//! XML parsing utilities for workbook ingestion.
//! Provides an XML reader wrapper and helper traits for attribute and text processing.

use crate::error::WaybillError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for the lenient documents carrier exports produce
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, mapping EOF to None
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, WaybillError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(WaybillError::XmlError(error)),
        }
    }
}

/// Helper trait for XML nodes providing attribute access
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an unescaped attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, WaybillError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, WaybillError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, WaybillError> {
        self.try_get_attribute(name)?
            .map(|attribute| Ok(attribute.unescape_value()?))
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, WaybillError> {
        self.try_get_attribute(name)?
            .map(|attribute| {
                let value = attribute.unescape_value()?;
                value.parse().map_err(|_| {
                    WaybillError::XmlHelperError(XmlError::ParseAttributeValueError(
                        value.to_string(),
                    ))
                })
            })
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextHelper {
    /// Appends text content from a BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), WaybillError>;

    /// Appends text content from a BytesRef event (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), WaybillError>;
}

impl XmlTextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), WaybillError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), WaybillError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                u32::from_str_radix(number, 10)?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push_str(character.encode_utf8(&mut [0u8; 4]));
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_value_unescaped() -> Result<(), WaybillError> {
        let mut reader = XmlReader::new("<c r=\"B2\" t=\"s&amp;p\"/>".as_bytes());
        match_xml_events!(reader => {
            Event::Start(event) => {
                assert_eq!(event.get_attribute_value("r")?.as_deref(), Some("B2"));
                assert_eq!(event.get_attribute_value("t")?.as_deref(), Some("s&p"));
                assert_eq!(event.get_attribute_value("s")?, None);
            }
        });
        Ok(())
    }

    #[test]
    fn attribute_value_parsed() -> Result<(), WaybillError> {
        let mut reader = XmlReader::new("<c s=\"17\"/>".as_bytes());
        match_xml_events!(reader => {
            Event::Start(event) => {
                assert_eq!(event.parse_attribute_value::<usize>("s")?, Some(17));
            }
        });
        Ok(())
    }

    #[test]
    fn character_reference_decoded() -> Result<(), WaybillError> {
        let mut text = String::new();
        let mut reader = XmlReader::new("<t>A&#66;&#x43;</t>".as_bytes());
        match_xml_events!(reader => {
            Event::Text(event) => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(text, "ABC");
        Ok(())
    }
}
