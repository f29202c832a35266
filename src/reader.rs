//! Streaming unmarshaller.
//!
//! This module turns an XML document into a graph of mapped objects. It uses
//! `quick-xml` as a forward-only cursor and never builds a tree: each mapped
//! element is read once, its attributes and children are bound to fields as
//! they are encountered, and nested mapped elements are unmarshalled
//! recursively.
//!
//! Most callers go through [`XmlMarshaller`](crate::XmlMarshaller). The
//! [`XmlCursor`] and [`Unmarshaller`] types are exposed for callers that
//! manage their own input.

use crate::error::{Error, Result};
use crate::mapping::{ClassMapping, FieldMapping, HookPoint, Registry};
use crate::types::TypeRegistry;
use crate::value::{MappedObject, Value};
use log::{debug, trace, warn};
use quick_xml::events::BytesStart;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use std::io::BufRead;
use std::str;

/// Configuration options for the unmarshaller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderConfig {
    /// Maximum element nesting depth, or `None` for no limit (default: 256)
    pub max_depth: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(256),
        }
    }
}

impl ReaderConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// The name and attributes of an opening tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Element local name
    pub name: String,
    /// Attributes as (local name, unescaped value), namespace declarations excluded
    pub attributes: Vec<(String, String)>,
}

/// A document node, owned so it can outlive the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Opening tag of an element with content
    Start(StartTag),
    /// Self-closing element
    Empty(StartTag),
    /// Closing tag, by local name
    End(String),
    /// Character data (text and CDATA sections)
    Text(String),
    /// End of input
    Eof,
}

/// A forward-only cursor over an XML document.
///
/// Comments, processing instructions, declarations and doctypes are skipped.
/// Mismatched closing tags are reported by the underlying tokenizer.
pub struct XmlCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> XmlCursor<R> {
    /// Creates a cursor from a buffered reader.
    pub fn from_reader(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(false);

        Self {
            reader: xml_reader,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Reads the next node.
    pub fn next_node(&mut self) -> Result<Node> {
        loop {
            self.buf.clear();

            let node = match self.reader.read_event_into(&mut self.buf)? {
                XmlEvent::Start(ref e) => Some(Node::Start(Self::start_tag(e)?)),
                XmlEvent::Empty(ref e) => Some(Node::Empty(Self::start_tag(e)?)),
                XmlEvent::End(ref e) => {
                    let local_name = e.local_name();
                    Some(Node::End(str::from_utf8(local_name.as_ref())?.to_string()))
                }
                XmlEvent::Text(ref e) => Some(Node::Text(e.unescape()?.into_owned())),
                XmlEvent::CData(ref e) => Some(Node::Text(str::from_utf8(e.as_ref())?.to_string())),
                XmlEvent::Eof => Some(Node::Eof),
                _ => None,
            };

            if let Some(node) = node {
                return Ok(node);
            }
        }
    }

    /// Advances to the first element of the document.
    ///
    /// Returns the opening tag and whether the element is self-closing.
    pub fn seek_first_element(&mut self) -> Result<(StartTag, bool)> {
        loop {
            match self.next_node()? {
                Node::Start(tag) => return Ok((tag, false)),
                Node::Empty(tag) => return Ok((tag, true)),
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(_) => {
                    return Err(Error::MalformedDocument(
                        "text before the root element".to_string(),
                    ))
                }
                Node::End(name) => {
                    return Err(Error::MalformedDocument(format!(
                        "unexpected closing tag </{}> before the root element",
                        name
                    )))
                }
                Node::Eof => {
                    return Err(Error::MalformedDocument(
                        "document has no root element".to_string(),
                    ))
                }
            }
        }
    }

    /// Skips the rest of the element whose opening tag was just read.
    pub fn skip_subtree(&mut self) -> Result<()> {
        let mut depth = 1usize;
        loop {
            match self.next_node()? {
                Node::Start(_) => depth += 1,
                Node::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Node::Eof => {
                    return Err(Error::MalformedDocument(
                        "unexpected end of document while skipping an element".to_string(),
                    ))
                }
                Node::Empty(_) | Node::Text(_) => {}
            }
        }
    }

    /// Reads the text content of the element whose opening tag was just read,
    /// consuming its closing tag.
    ///
    /// Returns `None` for empty content. An element inside the content is a
    /// [`Error::MalformedDocument`].
    pub fn read_text(&mut self) -> Result<Option<String>> {
        let mut text = String::new();
        loop {
            match self.next_node()? {
                Node::Text(t) => text.push_str(&t),
                Node::End(_) => break,
                Node::Start(tag) | Node::Empty(tag) => {
                    return Err(Error::MalformedDocument(format!(
                        "expected text content, found element <{}>",
                        tag.name
                    )))
                }
                Node::Eof => {
                    return Err(Error::MalformedDocument(
                        "unexpected end of document in text content".to_string(),
                    ))
                }
            }
        }
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    /// Extracts the local name and attributes of an opening tag as owned data.
    fn start_tag(e: &BytesStart<'_>) -> Result<StartTag> {
        let local_name = e.local_name();
        let name = str::from_utf8(local_name.as_ref())?.to_string();

        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = str::from_utf8(attr.key.local_name().as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(StartTag { name, attributes })
    }
}

/// Per-element binding state: which fields received a value, and the
/// collection items gathered so far.
struct FieldState {
    present: Vec<bool>,
    buffers: Vec<Option<Vec<Value>>>,
}

impl FieldState {
    fn new(len: usize) -> Self {
        Self {
            present: vec![false; len],
            buffers: (0..len).map(|_| None).collect(),
        }
    }

    /// Marks a collection as seen, so it is assigned even when empty.
    fn open(&mut self, idx: usize) {
        self.buffers[idx].get_or_insert_with(Vec::new);
    }

    fn assign(
        &mut self,
        object: &mut dyn MappedObject,
        idx: usize,
        field: &FieldMapping,
        value: Value,
    ) -> Result<()> {
        if field.is_collection() {
            let buffer = self.buffers[idx].get_or_insert_with(Vec::new);
            match value {
                Value::Null => {}
                Value::List(items) => buffer.extend(items),
                item => buffer.push(item),
            }
            return Ok(());
        }

        if matches!(value, Value::Null) {
            return Ok(());
        }
        self.present[idx] = true;
        object.set_field(field.field_name(), value)
    }

    /// Assigns every gathered collection.
    fn flush(&mut self, object: &mut dyn MappedObject, fields: &[FieldMapping]) -> Result<()> {
        for (idx, buffer) in self.buffers.iter_mut().enumerate() {
            if let Some(items) = buffer.take() {
                if !items.is_empty() {
                    self.present[idx] = true;
                }
                object.set_field(fields[idx].field_name(), Value::List(items))?;
            }
        }
        Ok(())
    }
}

/// Binds XML elements to mapped objects.
///
/// An unmarshaller borrows its registries and holds no per-document state, so
/// one instance can serve any number of documents.
pub struct Unmarshaller<'a, R: Registry + ?Sized> {
    registry: &'a R,
    types: &'a TypeRegistry,
    max_depth: Option<usize>,
}

impl<'a, R: Registry + ?Sized> Unmarshaller<'a, R> {
    /// Creates an unmarshaller.
    pub fn new(registry: &'a R, types: &'a TypeRegistry, config: &ReaderConfig) -> Self {
        Self {
            registry,
            types,
            max_depth: config.max_depth,
        }
    }

    /// Unmarshals the first element of the document.
    pub fn unmarshal<B: BufRead>(&self, cursor: &mut XmlCursor<B>) -> Result<Box<dyn MappedObject>> {
        let (tag, empty) = cursor.seek_first_element()?;
        debug!("unmarshalling <{}>", tag.name);
        self.unmarshal_element(cursor, tag, empty, None, 1)
    }

    /// Unmarshals the element whose opening tag was just read, leaving the
    /// cursor after its closing tag.
    ///
    /// The element name selects the class. `expected` is the class of the
    /// field being filled; the selected class must be it or derive from it.
    pub fn unmarshal_element<B: BufRead>(
        &self,
        cursor: &mut XmlCursor<B>,
        tag: StartTag,
        empty: bool,
        expected: Option<&str>,
        depth: usize,
    ) -> Result<Box<dyn MappedObject>> {
        self.check_depth(depth)?;

        let class_id = self
            .registry
            .resolve_by_root_element_name(&tag.name)
            .ok_or_else(|| Error::UnknownMapping(tag.name.clone()))?;
        if let Some(expected) = expected {
            if !self.is_compatible(class_id, expected) {
                return Err(Error::UnexpectedType {
                    expected: expected.to_string(),
                    found: class_id.to_string(),
                });
            }
        }
        let mapping = self
            .registry
            .resolve_mapping(class_id)
            .ok_or_else(|| Error::UnknownMapping(class_id.to_string()))?;
        let fields = mapping.field_mappings();

        let mut object = mapping.new_instance();
        mapping
            .hooks()
            .invoke_unmarshal(HookPoint::BeforeUnmarshal, object.as_mut());

        let mut state = FieldState::new(fields.len());

        for (name, raw) in &tag.attributes {
            match mapping.attribute_field(name) {
                Some((idx, field)) => {
                    let value = self.convert_attribute(field, raw)?;
                    state.assign(object.as_mut(), idx, field, value)?;
                }
                None => trace!("ignoring attribute {} on <{}>", name, tag.name),
            }
        }

        if !empty {
            loop {
                match cursor.next_node()? {
                    Node::Start(child) => {
                        self.read_child(cursor, mapping, object.as_mut(), &mut state, child, false, depth)?
                    }
                    Node::Empty(child) => {
                        self.read_child(cursor, mapping, object.as_mut(), &mut state, child, true, depth)?
                    }
                    Node::Text(text) => {
                        if !text.trim().is_empty() {
                            warn!("ignoring text content of <{}>", tag.name);
                        }
                    }
                    Node::End(_) => break,
                    Node::Eof => {
                        return Err(Error::MalformedDocument(format!(
                            "unexpected end of document inside <{}>",
                            tag.name
                        )))
                    }
                }
            }
        }

        state.flush(object.as_mut(), fields)?;

        for (idx, field) in fields.iter().enumerate() {
            if field.is_required() && !state.present[idx] {
                return Err(Error::RequiredFieldMissing {
                    class: mapping.class_id().to_string(),
                    field: field.field_name().to_string(),
                });
            }
        }

        mapping
            .hooks()
            .invoke_unmarshal(HookPoint::AfterUnmarshal, object.as_mut());
        Ok(object)
    }

    /// Dispatches one child element of a mapped element.
    #[allow(clippy::too_many_arguments)]
    fn read_child<B: BufRead>(
        &self,
        cursor: &mut XmlCursor<B>,
        mapping: &ClassMapping,
        object: &mut dyn MappedObject,
        state: &mut FieldState,
        child: StartTag,
        empty: bool,
        depth: usize,
    ) -> Result<()> {
        if let Some((idx, field)) = mapping.child_field(&child.name) {
            let value = self.read_value(cursor, field, child, empty, depth)?;
            return state.assign(object, idx, field, value);
        }

        if let Some((idx, field)) = mapping.wrapped_field(&child.name) {
            state.open(idx);
            if !empty {
                self.read_wrapper(cursor, object, state, idx, field, &child.name, depth + 1)?;
            }
            return Ok(());
        }

        if let Some(class_id) = self.registry.resolve_by_root_element_name(&child.name) {
            if let Some((idx, field)) = self.polymorphic_field(mapping, class_id) {
                let value = self.read_value(cursor, field, child, empty, depth)?;
                return state.assign(object, idx, field, value);
            }
        }

        trace!("skipping element <{}> in <{}>", child.name, mapping.xml_name());
        if !empty {
            cursor.skip_subtree()?;
        }
        Ok(())
    }

    /// Collects the items of a wrapper element.
    #[allow(clippy::too_many_arguments)]
    fn read_wrapper<B: BufRead>(
        &self,
        cursor: &mut XmlCursor<B>,
        object: &mut dyn MappedObject,
        state: &mut FieldState,
        idx: usize,
        field: &FieldMapping,
        wrapper: &str,
        depth: usize,
    ) -> Result<()> {
        self.check_depth(depth)?;
        let mapped = self.registry.is_mapped_type(field.value_type());

        loop {
            let (item, empty) = match cursor.next_node()? {
                Node::Start(item) => (item, false),
                Node::Empty(item) => (item, true),
                Node::End(_) => return Ok(()),
                Node::Text(text) => {
                    if !text.trim().is_empty() {
                        warn!("ignoring text content of <{}>", wrapper);
                    }
                    continue;
                }
                Node::Eof => {
                    return Err(Error::MalformedDocument(format!(
                        "unexpected end of document inside <{}>",
                        wrapper
                    )))
                }
            };

            let accepted = item.name == field.xml_name()
                || (mapped
                    && self
                        .registry
                        .resolve_by_root_element_name(&item.name)
                        .is_some_and(|class_id| self.is_compatible(class_id, field.value_type())));

            if accepted {
                let value = self.read_value(cursor, field, item, empty, depth)?;
                state.assign(object, idx, field, value)?;
            } else {
                trace!("skipping element <{}> in <{}>", item.name, wrapper);
                if !empty {
                    cursor.skip_subtree()?;
                }
            }
        }
    }

    /// Reads the value of a child element bound to `field`.
    fn read_value<B: BufRead>(
        &self,
        cursor: &mut XmlCursor<B>,
        field: &FieldMapping,
        tag: StartTag,
        empty: bool,
        depth: usize,
    ) -> Result<Value> {
        if self.registry.is_mapped_type(field.value_type()) {
            let object =
                self.unmarshal_element(cursor, tag, empty, Some(field.value_type()), depth + 1)?;
            return Ok(Value::Object(object));
        }

        let text = if empty { None } else { cursor.read_text()? };
        match text {
            Some(text) => Ok(Value::Scalar(
                self.types.get(field.value_type())?.to_native(&text)?,
            )),
            None => Ok(Value::Null),
        }
    }

    fn convert_attribute(&self, field: &FieldMapping, raw: &str) -> Result<Value> {
        let converter = self.types.get(field.value_type())?;

        if field.is_collection() {
            let items = raw
                .split(' ')
                .filter(|token| !token.is_empty())
                .map(|token| converter.to_native(token).map(Value::Scalar))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::List(items));
        }

        if raw.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::Scalar(converter.to_native(raw)?))
        }
    }

    /// Finds the first child-level field, in declaration order, typed as
    /// `class_id` or one of its ancestors.
    ///
    /// When several fields match, the earliest one wins.
    fn polymorphic_field<'m>(
        &self,
        mapping: &'m ClassMapping,
        class_id: &str,
    ) -> Option<(usize, &'m FieldMapping)> {
        mapping
            .field_mappings()
            .iter()
            .enumerate()
            .find(|(_, field)| {
                field.is_child()
                    && field.wrapper().is_none()
                    && self.is_compatible(class_id, field.value_type())
            })
    }

    /// Returns true if `class_id` is `type_id` or derives from it.
    fn is_compatible(&self, class_id: &str, type_id: &str) -> bool {
        class_id == type_id
            || self
                .registry
                .ancestors_of(class_id)
                .iter()
                .any(|ancestor| ancestor == type_id)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        match self.max_depth {
            Some(max) if depth > max => Err(Error::DepthLimitExceeded(max)),
            _ => Ok(()),
        }
    }
}
