//! Owned XML element tree parsed with quick-xml
//!
//! Both dialects handled by the catalog core (`.midnam` patch documents and
//! `.middev` capability descriptors) are small enough to parse eagerly into
//! an owned tree. The tree is tolerant of absent optional elements: lookup
//! helpers return `Option` rather than failing.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// XML parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Reader-level error (malformed markup, bad entity, mismatched tags)
    #[error("{0}")]
    Malformed(String),

    /// Document contained no root element
    #[error("document has no root element")]
    Empty,

    /// Content outside any element where none is allowed
    #[error("unexpected content outside the root element")]
    TrailingContent,
}

/// A single element node: name, attributes in document order, children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Child node of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    /// Create an empty element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by exact name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    /// Iterate over all direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Iterate over direct child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |e| e.name == name)
    }

    /// Depth-first search for the first descendant element (self included)
    /// with the given name.
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        for child in self.child_elements() {
            if let Some(found) = child.find_first(name) {
                return Some(found);
            }
        }
        None
    }

    /// Collect every descendant element (self included) with the given name,
    /// in document order.
    pub fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for child in self.child_elements() {
            child.descendants_named(name, out);
        }
    }

    /// Concatenated direct text content, trimmed.
    pub fn text(&self) -> String {
        let mut buf = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                buf.push_str(t);
            }
        }
        buf.trim().to_string()
    }

    /// Append a child element.
    pub fn push_element(&mut self, element: Element) {
        self.children.push(Node::Element(element));
    }
}

/// Parse a full document into its root element.
///
/// Prologue content (XML declaration, DOCTYPE, comments, processing
/// instructions) is skipped. Whitespace-only text between elements is
/// dropped by the reader.
pub fn parse_document(input: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(ParseError::TrailingContent);
                }
                stack.push(element_from_start(&start)?);
            }
            Ok(Event::Empty(start)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(ParseError::TrailingContent);
                }
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Malformed("unmatched closing tag".into()))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(text)) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(unescaped.into_owned()));
                }
            }
            Ok(Event::CData(data)) => {
                let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(content));
                }
            }
            Ok(Event::Eof) => break,
            // Declaration, DOCTYPE, comments, processing instructions
            Ok(_) => {}
            Err(e) => return Err(ParseError::Malformed(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed("unclosed element at end of input".into()));
    }
    root.ok_or(ParseError::Empty)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Malformed(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Serialize an element tree to an XML string with a standard declaration.
pub fn to_xml_string(root: &Element) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    // Writing to an in-memory Vec cannot fail.
    let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
    write_element(&mut writer, root);
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        let _ = writer.write_event(Event::Empty(start));
        return;
    }

    let _ = writer.write_event(Event::Start(start));
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e),
            Node::Text(t) => {
                let _ = writer.write_event(Event::Text(BytesText::new(t)));
            }
        }
    }
    let _ = writer.write_event(Event::End(BytesEnd::new(element.name.as_str())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = parse_document(
            r#"<?xml version="1.0"?>
            <MIDINameDocument>
                <Author>Someone</Author>
                <MasterDeviceNames>
                    <Manufacturer>Alesis</Manufacturer>
                    <Model>D4</Model>
                    <DeviceID Family="0" Member="6"/>
                </MasterDeviceNames>
            </MIDINameDocument>"#,
        )
        .unwrap();

        assert_eq!(doc.name, "MIDINameDocument");
        let master = doc.child("MasterDeviceNames").unwrap();
        assert_eq!(master.child("Manufacturer").unwrap().text(), "Alesis");
        assert_eq!(master.child("DeviceID").unwrap().attr("Member"), Some("6"));
    }

    #[test]
    fn missing_optional_elements_are_none() {
        let doc = parse_document("<Root><A/></Root>").unwrap();
        assert!(doc.child("B").is_none());
        assert!(doc.child("A").unwrap().attr("X").is_none());
    }

    #[test]
    fn rejects_malformed_markup() {
        assert!(parse_document("<Root><A></Root>").is_err());
        assert!(parse_document("not xml at all <<<").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn entities_round_trip() {
        let doc = parse_document(r#"<Patch Name="A &amp; B"/>"#).unwrap();
        assert_eq!(doc.attr("Name"), Some("A & B"));
        let out = to_xml_string(&doc);
        assert!(out.contains("A &amp; B"));
    }

    #[test]
    fn serializes_with_declaration() {
        let mut root = Element::new("Root");
        root.push_element(Element::new("Child"));
        let out = to_xml_string(&root);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<Child/>"));
    }

    #[test]
    fn find_first_is_depth_first() {
        let doc = parse_document("<A><B><C Id=\"inner\"/></B><C Id=\"outer\"/></A>").unwrap();
        assert_eq!(doc.find_first("C").unwrap().attr("Id"), Some("inner"));
    }
}
