//! Streaming marshaller.
//!
//! This module serializes a graph of mapped objects to XML. Each object is
//! written as the element of its runtime class: namespace declarations and
//! attribute fields on the opening tag, then text fields, then element fields,
//! each group in declaration order. Nested mapped objects are written
//! recursively.
//!
//! Output is rendered into memory first, so a failing call never leaves a
//! partial document in the sink.

use crate::error::{Error, Result};
use crate::mapping::{ClassMapping, FieldMapping, HookPoint, Registry};
use crate::types::TypeRegistry;
use crate::value::{MappedObject, ValueRef};
use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Configuration options for the marshaller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterConfig {
    /// Spaces per nesting level; 0 disables indentation (default: 4)
    pub indent: usize,
    /// Encoding named in the XML declaration (default: UTF-8)
    pub encoding: String,
    /// Version named in the XML declaration (default: 1.0)
    pub schema_version: String,
    /// Whether to include the XML declaration
    pub xml_declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            encoding: "UTF-8".to_string(),
            schema_version: "1.0".to_string(),
            xml_declaration: true,
        }
    }
}

impl WriterConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compact configuration (no indentation).
    pub fn compact() -> Self {
        Self {
            indent: 0,
            ..Self::default()
        }
    }

    /// Sets the number of spaces per nesting level.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the encoding named in the declaration. Stored upper-cased.
    ///
    /// The document itself is always written as UTF-8.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into().to_uppercase();
        self
    }

    /// Sets the version named in the declaration.
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Sets whether to include the XML declaration.
    pub fn with_xml_declaration(mut self, xml_declaration: bool) -> Self {
        self.xml_declaration = xml_declaration;
        self
    }
}

/// Serializes mapped objects to XML.
///
/// A marshaller borrows its registries and configuration and holds no
/// per-document state.
pub struct Marshaller<'a, R: Registry + ?Sized> {
    registry: &'a R,
    types: &'a TypeRegistry,
    config: &'a WriterConfig,
}

impl<'a, R: Registry + ?Sized> Marshaller<'a, R> {
    /// Creates a marshaller.
    pub fn new(registry: &'a R, types: &'a TypeRegistry, config: &'a WriterConfig) -> Self {
        Self {
            registry,
            types,
            config,
        }
    }

    /// Writes an object as a complete document to any `Write` implementation.
    ///
    /// Nothing is written to `sink` if marshalling fails.
    pub fn marshal<W: Write>(&self, object: &dyn MappedObject, mut sink: W) -> Result<()> {
        let buffer = self.marshal_to_vec(object)?;
        sink.write_all(&buffer)?;
        sink.flush()?;
        Ok(())
    }

    /// Writes an object as a complete document to a string.
    pub fn marshal_to_string(&self, object: &dyn MappedObject) -> Result<String> {
        let buffer = self.marshal_to_vec(object)?;
        String::from_utf8(buffer).map_err(|e| Error::from(e.utf8_error()))
    }

    /// Writes an object as a complete document to a byte buffer.
    pub fn marshal_to_vec(&self, object: &dyn MappedObject) -> Result<Vec<u8>> {
        debug!("marshalling {}", object.class_id());

        let mut xml_writer = if self.config.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', self.config.indent)
        } else {
            Writer::new(Vec::new())
        };

        if self.config.xml_declaration {
            xml_writer.write_event(Event::Decl(BytesDecl::new(
                self.config.schema_version.as_str(),
                Some(self.config.encoding.as_str()),
                None,
            )))?;
        }

        self.write_object(&mut xml_writer, object)?;

        Ok(xml_writer.into_inner())
    }

    /// Writes one mapped object as an element.
    pub fn write_object<W: Write>(
        &self,
        writer: &mut Writer<W>,
        object: &dyn MappedObject,
    ) -> Result<()> {
        let mapping = self
            .registry
            .resolve_mapping(object.class_id())
            .ok_or_else(|| Error::UnknownMapping(object.class_id().to_string()))?;

        mapping
            .hooks()
            .invoke_marshal(HookPoint::BeforeMarshal, object);

        let mut start = BytesStart::new(mapping.xml_name());
        for ns in mapping.namespaces() {
            start.push_attribute((ns.attribute_name().as_str(), ns.uri.as_str()));
        }

        for field in mapping.attribute_fields() {
            let value = object.get_field(field.field_name());
            if value.is_absent() {
                check_absent(mapping, field)?;
                continue;
            }
            let text = self.attribute_text(mapping, field, &value)?;
            start.push_attribute((field.qualified_name().as_str(), text.as_str()));
        }

        let mut children = Vec::new();
        for field in mapping.text_fields().chain(mapping.element_fields()) {
            let value = object.get_field(field.field_name());
            if value.is_absent() {
                check_absent(mapping, field)?;
                continue;
            }
            children.push((field, value));
        }

        let has_children = !children.is_empty();
        if has_children {
            writer.write_event(Event::Start(start))?;
            for (field, value) in children {
                self.write_field(writer, mapping, field, value)?;
            }
        } else {
            writer.write_event(Event::Empty(start))?;
        }

        mapping
            .hooks()
            .invoke_marshal(HookPoint::AfterMarshal, object);

        if has_children {
            writer.write_event(Event::End(BytesEnd::new(mapping.xml_name())))?;
        }
        Ok(())
    }

    /// Writes a text or element field, with its wrapper if it has one.
    fn write_field<W: Write>(
        &self,
        writer: &mut Writer<W>,
        mapping: &ClassMapping,
        field: &FieldMapping,
        value: ValueRef<'_>,
    ) -> Result<()> {
        if !field.is_collection() {
            return self.write_item(writer, mapping, field, value);
        }

        let items = match value {
            ValueRef::List(items) => items,
            single => vec![single],
        };

        let wrapper = field.qualified_wrapper();
        if let Some(ref name) = wrapper {
            writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
        }
        for item in items {
            self.write_item(writer, mapping, field, item)?;
        }
        if let Some(name) = wrapper {
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Ok(())
    }

    /// Writes a single value: objects as their own element, scalars as a
    /// text-bearing element named after the field.
    fn write_item<W: Write>(
        &self,
        writer: &mut Writer<W>,
        mapping: &ClassMapping,
        field: &FieldMapping,
        item: ValueRef<'_>,
    ) -> Result<()> {
        match item {
            ValueRef::Null => Ok(()),
            ValueRef::Scalar(scalar) => {
                let text = self.types.get(field.value_type())?.to_text(&scalar)?;
                self.write_simple_element(writer, &field.qualified_name(), &text)
            }
            ValueRef::Object(object) => self.write_object(writer, object),
            ValueRef::List(_) => Err(Error::invalid_field(
                mapping.class_id(),
                field.field_name(),
                "nested collections cannot be written",
            )),
        }
    }

    /// Converts an attribute value to text; collections are space-joined.
    fn attribute_text(
        &self,
        mapping: &ClassMapping,
        field: &FieldMapping,
        value: &ValueRef<'_>,
    ) -> Result<String> {
        let converter = self.types.get(field.value_type())?;
        match value {
            ValueRef::Scalar(scalar) => converter.to_text(scalar),
            ValueRef::List(items) => {
                let mut tokens = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ValueRef::Scalar(scalar) => tokens.push(converter.to_text(scalar)?),
                        ValueRef::Null => {}
                        _ => {
                            return Err(Error::invalid_field(
                                mapping.class_id(),
                                field.field_name(),
                                "attribute collections may only hold scalars",
                            ))
                        }
                    }
                }
                Ok(tokens.join(" "))
            }
            ValueRef::Object(_) => Err(Error::invalid_field(
                mapping.class_id(),
                field.field_name(),
                "an attribute cannot hold an object",
            )),
            ValueRef::Null => Ok(String::new()),
        }
    }

    /// Writes a simple text element.
    fn write_simple_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: &str,
    ) -> Result<()> {
        if value.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
            return Ok(());
        }
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

/// Fails for a required field without a value. Nillable does not exempt it.
fn check_absent(mapping: &ClassMapping, field: &FieldMapping) -> Result<()> {
    if field.is_required() {
        return Err(Error::RequiredFieldMissing {
            class: mapping.class_id().to_string(),
            field: field.field_name().to_string(),
        });
    }
    Ok(())
}
