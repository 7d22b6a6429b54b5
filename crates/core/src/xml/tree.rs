//! A small element tree over quick-xml events.
//!
//! Designspace files are small, so the reader loads the whole document into
//! memory and walks it, rather than reacting to events as they stream past.

use std::str::from_utf8;

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

use crate::{
    error::{Error, Result},
    number::parse_number,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = from_utf8(start.name().as_ref())
            .map_err(|e| Error::invalid_xml(format!("invalid element name: {e}")))?
            .to_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = from_utf8(attribute.key.as_ref())
                .map_err(|e| Error::invalid_xml(format!("invalid attribute name: {e}")))?
                .to_owned();
            attributes.push((key, attribute.unescape_value()?.into_owned()));
        }
        Ok(Self { name, attributes, ..Self::default() })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn required(&self, key: &str) -> Result<&str> {
        self.attr(key)
            .ok_or_else(|| Error::invalid_xml(format!("<{}> is missing the '{key}' attribute", self.name)))
    }

    /// An optional numeric attribute; present but not a number is an error.
    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        self.attr(key)
            .map(|value| {
                parse_number(value).ok_or_else(|| {
                    Error::invalid_xml(format!("<{}> {key}=\"{value}\" is not a number", self.name))
                })
            })
            .transpose()
    }

    pub fn required_number(&self, key: &str) -> Result<f64> {
        self.number(key)?
            .ok_or_else(|| Error::invalid_xml(format!("<{}> is missing the '{key}' attribute", self.name)))
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.attr(key), Some("1" | "true" | "True"))
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// Parse `text` into its root element.
pub(crate) fn parse(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    let mut attach = |element: Element, stack: &mut Vec<Element>| match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => root = Some(element),
    };

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(element, &mut stack);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::invalid_xml("unbalanced closing tag"))?;
                attach(element, &mut stack);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let data = from_utf8(&data)
                        .map_err(|e| Error::invalid_xml(format!("invalid CDATA: {e}")))?;
                    current.text.push_str(data);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::invalid_xml(format!("<{}> is never closed", open.name)));
    }
    root.ok_or_else(|| Error::invalid_xml("document has no root element"))
}
