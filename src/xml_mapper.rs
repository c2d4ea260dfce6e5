// XML mapping: an element tree built from the response body, plus static
// rule tables that turn matched elements into records.
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use thiserror::Error;

// Error types for XML processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("XML parse error: {0}")]
    XmlParseError(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// One element of a parsed document. The document itself is represented by
/// an unnamed element whose children are the top-level nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn named(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    /// Parse a whole document into a tree.
    pub fn parse(xml: &str) -> Result<XmlElement, MappingError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = vec![XmlElement::default()];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = decode(e.name().as_ref())?.to_string();
                    stack.push(XmlElement::named(name));
                }
                Ok(Event::Empty(e)) => {
                    let name = decode(e.name().as_ref())?.to_string();
                    current(&mut stack)
                        .children
                        .push(XmlNode::Element(XmlElement::named(name)));
                }
                Ok(Event::End(_)) => {
                    if stack.len() < 2 {
                        return Err(MappingError::XmlParseError(format!(
                            "Unexpected closing tag at position {}",
                            reader.buffer_position()
                        )));
                    }
                    if let Some(element) = stack.pop() {
                        current(&mut stack).children.push(XmlNode::Element(element));
                    }
                }
                Ok(Event::Text(t)) => {
                    let raw = decode(&t)?;
                    let text = unescape(raw)
                        .map_err(|e| MappingError::ConversionError(e.to_string()))?;
                    current(&mut stack).push_text(&text);
                }
                Ok(Event::CData(c)) => {
                    let text = decode(&c)?;
                    current(&mut stack).push_text(text);
                }
                Ok(Event::GeneralRef(r)) => {
                    let reference = format!("&{};", decode(&r)?);
                    // Unknown entities are kept verbatim rather than failing the document.
                    let text = unescape(&reference)
                        .map(|t| t.into_owned())
                        .unwrap_or(reference);
                    current(&mut stack).push_text(&text);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(MappingError::XmlParseError(format!(
                        "Error at position {}: {}",
                        reader.error_position(),
                        e
                    )))
                }
                _ => (),
            }
        }

        if stack.len() != 1 {
            return Err(MappingError::XmlParseError(format!(
                "Unclosed element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }

        stack
            .pop()
            .ok_or_else(|| MappingError::XmlParseError("Empty document".to_string()))
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlElement>) {
        for element in self.elements() {
            if element.name == name {
                out.push(element);
            }
            element.collect_descendants(name, out);
        }
    }

    /// Resolve a selector against this element.
    ///
    /// `//Name` matches every descendant called `Name` in document order,
    /// `A/B` walks child steps and `.` is the element itself. Steps after a
    /// leading `//Name` are child steps.
    pub fn select<'a>(&'a self, selector: &str) -> Vec<&'a XmlElement> {
        let (mut matched, rest) = match selector.strip_prefix("//") {
            Some(rest) => {
                let (first, rest) = rest.split_once('/').unwrap_or((rest, ""));
                let mut found = Vec::new();
                self.collect_descendants(first, &mut found);
                (found, rest)
            }
            None => (vec![self], selector),
        };

        for step in rest.split('/').filter(|s| !s.is_empty() && *s != ".") {
            matched = matched
                .into_iter()
                .flat_map(|element| element.elements().filter(move |e| e.name == step))
                .collect();
        }
        matched
    }
}

fn current(stack: &mut [XmlElement]) -> &mut XmlElement {
    // The document node at the bottom of the stack is never popped while parsing.
    let last = stack.len() - 1;
    &mut stack[last]
}

fn decode(bytes: &[u8]) -> Result<&str, MappingError> {
    std::str::from_utf8(bytes).map_err(|e| MappingError::ConversionError(e.to_string()))
}

#[derive(Debug)]
pub enum FieldKind {
    /// Text of the first element at the path.
    Text,
    /// First record of the nested mapping found under the path.
    Single(&'static Mapping),
    /// Every record of the nested mapping found under the path.
    List(&'static Mapping),
}

#[derive(Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub path: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn text(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            kind: FieldKind::Text,
        }
    }

    pub const fn single(name: &'static str, path: &'static str, mapping: &'static Mapping) -> Self {
        Self {
            name,
            path,
            kind: FieldKind::Single(mapping),
        }
    }

    pub const fn list(name: &'static str, path: &'static str, mapping: &'static Mapping) -> Self {
        Self {
            name,
            path,
            kind: FieldKind::List(mapping),
        }
    }
}

/// A rule table: the selector picking one element per record, and the
/// fields read relative to that element.
#[derive(Debug)]
pub struct Mapping {
    pub selector: &'static str,
    pub fields: &'static [FieldRule],
}

impl Mapping {
    /// Element name the selector targets, used in error messages.
    pub fn element(&self) -> &'static str {
        let selector = self.selector.trim_start_matches('/');
        selector.rsplit('/').next().unwrap_or(selector)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Single(Option<Record>),
    List(Vec<Record>),
}

/// Field values produced for one matched element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: HashMap<&'static str, FieldValue>,
}

impl Record {
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name) {
            Some(FieldValue::Text(value)) => value.clone(),
            _ => None,
        }
    }

    pub fn single(&self, name: &str) -> Option<&Record> {
        match self.fields.get(name) {
            Some(FieldValue::Single(value)) => value.as_ref(),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> &[Record] {
        match self.fields.get(name) {
            Some(FieldValue::List(values)) => values,
            _ => &[],
        }
    }
}

/// Types built from a rule table.
pub trait Mapped: Sized {
    fn mapping() -> &'static Mapping;

    fn from_record(record: &Record) -> Self;
}

pub fn map_records(mapping: &Mapping, root: &XmlElement) -> Vec<Record> {
    root.select(mapping.selector)
        .into_iter()
        .map(|element| map_element(mapping, element))
        .collect()
}

fn map_element(mapping: &Mapping, element: &XmlElement) -> Record {
    let mut record = Record::default();
    for rule in mapping.fields {
        let targets = element.select(rule.path);
        let value = match rule.kind {
            FieldKind::Text => {
                FieldValue::Text(targets.first().map(|e| e.text().trim().to_string()))
            }
            FieldKind::Single(nested) => FieldValue::Single(
                targets
                    .into_iter()
                    .flat_map(|e| map_records(nested, e))
                    .next(),
            ),
            FieldKind::List(nested) => FieldValue::List(
                targets
                    .into_iter()
                    .flat_map(|e| map_records(nested, e))
                    .collect(),
            ),
        };
        record.fields.insert(rule.name, value);
    }
    record
}

pub fn map_document<T: Mapped>(document: &XmlElement) -> Vec<T> {
    map_records(T::mapping(), document)
        .iter()
        .map(T::from_record)
        .collect()
}

/// Parse `xml` and map every element matched by `T`'s rule table.
pub fn parse<T: Mapped>(xml: &str) -> Result<Vec<T>, MappingError> {
    let document = XmlElement::parse(xml)?;
    Ok(map_document(&document))
}

/// Vendor booleans: anything containing "true", in any case.
pub fn truthy(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.to_ascii_lowercase().contains("true"))
}

/// Vendor numbers: absent or non-numeric text counts as zero.
pub fn number(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}
