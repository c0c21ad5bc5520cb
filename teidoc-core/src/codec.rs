//! XML tree codec.
//!
//! Converts raw markup into a generic attributed tree and back. Attributes
//! keep their document order and children are kept as an ordered sequence
//! of elements and text runs, so mixed content (text interleaved with
//! inline tags) survives parsing with its offsets intact.

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid UTF-8 in output: {0}")]
    Output(#[from] std::string::FromUtf8Error),

    #[error("Unknown entity reference: &{0};")]
    UnknownEntity(String),

    #[error("Closing tag without matching opening tag")]
    Unbalanced,

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Document has more than one root element")]
    MultipleRoots,
}

/// A node in the generic tree: an element or a run of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with ordered attributes and ordered mixed children
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder-style child element append
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder-style text append
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(&text.into());
        self
    }

    /// Append text, merging with a trailing text run
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(XmlNode::Text(existing)) => existing.push_str(text),
            _ => self.children.push(XmlNode::Text(text.to_string())),
        }
    }

    /// Element name without any namespace prefix (`tei:p` -> `p`)
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Look up an attribute by its qualified name
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over child elements, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given local name
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.local_name() == name)
    }

    /// First element (self included) with the given local name, depth first
    pub fn find_descendant(&self, name: &str) -> Option<&XmlElement> {
        if self.local_name() == name {
            return Some(self);
        }
        self.child_elements()
            .find_map(|child| child.find_descendant(name))
    }

    /// All descendants (self excluded) with the given local name, in document order
    pub fn find_descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        for child in self.child_elements() {
            if child.local_name() == name {
                found.push(child);
            }
            found.extend(child.find_descendants(name));
        }
        found
    }

    /// Concatenated text content of this element and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(el: &XmlElement, out: &mut String) {
    for child in &el.children {
        match child {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(inner) => collect_text(inner, out),
        }
    }
}

/// Strip a namespace prefix from a qualified name
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Parse markup into a tree rooted at the document element
///
/// Comments, processing instructions and the XML declaration are dropped.
/// Whitespace outside the root element is ignored; whitespace inside it is
/// kept verbatim.
pub fn parse(xml: &str) -> Result<XmlElement, CodecError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or(CodecError::Unbalanced)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text)?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&unescape(raw)?);
                }
            }
            Event::CData(data) => {
                let raw = std::str::from_utf8(&data)?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(raw);
                }
            }
            Event::GeneralRef(reference) => {
                let name = std::str::from_utf8(&reference)?;
                let resolved = resolve_reference(name)?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CodecError::Unbalanced);
    }
    root.ok_or(CodecError::MissingRoot)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, CodecError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = unescape(std::str::from_utf8(&attr.value)?)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(CodecError::MultipleRoots),
    }
}

fn resolve_reference(name: &str) -> Result<String, CodecError> {
    if let Some(code) = name.strip_prefix('#') {
        let parsed = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        return parsed
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| CodecError::UnknownEntity(name.to_string()));
    }
    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(|| CodecError::UnknownEntity(name.to_string()))
}

/// Serialize a tree back to markup
///
/// Childless elements are written as empty tags; text and attribute
/// values are escaped.
pub fn build(root: &XmlElement) -> Result<String, CodecError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), CodecError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(inner) => write_element(writer, inner)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_content() {
        let root = parse(r##"<p n="1">Hello <said who="#a">there</said>!</p>"##).unwrap();

        assert_eq!(root.name, "p");
        assert_eq!(root.attribute("n"), Some("1"));
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[0], XmlNode::Text("Hello ".into()));
        assert_eq!(root.text(), "Hello there!");

        let said = root.find_child("said").unwrap();
        assert_eq!(said.attribute("who"), Some("#a"));
    }

    #[test]
    fn test_parse_entities_merge_into_one_text_run() {
        let root = parse("<p>Fish &amp; chips &#x2014; &lt;tasty&gt;</p>").unwrap();

        assert_eq!(root.children.len(), 1);
        assert_eq!(root.text(), "Fish & chips \u{2014} <tasty>");
    }

    #[test]
    fn test_parse_skips_prolog_and_comments() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- header -->\n<TEI><text/></TEI>\n";
        let root = parse(xml).unwrap();

        assert_eq!(root.name, "TEI");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_local_name_and_prefixed_lookup() {
        let root = parse("<tei:TEI><tei:body><tei:p>x</tei:p></tei:body></tei:TEI>").unwrap();

        assert_eq!(root.local_name(), "TEI");
        assert!(root.find_descendant("body").is_some());
        assert_eq!(root.find_descendants("p").len(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse("<p>unclosed").is_err());
        assert!(parse("").is_err());
        assert!(parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_build_escapes_and_round_trips() {
        let tree = XmlElement::new("p")
            .with_attribute("who", "\"quoted\" & <odd>")
            .with_text("a < b & c")
            .with_child(XmlElement::new("lb"));

        let xml = build(&tree).unwrap();
        let reparsed = parse(&xml).unwrap();

        assert_eq!(reparsed, tree);
    }
}
