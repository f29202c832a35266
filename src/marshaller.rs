//! High-level marshalling entry points.
//!
//! [`XmlMarshaller`] owns a mapping registry, the scalar converters and the
//! reader and writer configuration, and exposes string, stream and file
//! entry points on top of the [`reader`](crate::reader) and
//! [`writer`](crate::writer) engines.

use crate::error::{Error, Result};
use crate::mapping::{MappingRegistry, Registry};
use crate::reader::{ReaderConfig, Unmarshaller, XmlCursor};
use crate::types::TypeRegistry;
use crate::value::MappedObject;
use crate::writer::{Marshaller, WriterConfig};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Converts mapped objects to XML documents and back.
///
/// An `XmlMarshaller` is immutable once built; share it between threads
/// behind a reference or an `Arc`.
#[derive(Debug, Clone)]
pub struct XmlMarshaller<R: Registry = MappingRegistry> {
    registry: R,
    types: TypeRegistry,
    writer_config: WriterConfig,
    reader_config: ReaderConfig,
}

impl<R: Registry> XmlMarshaller<R> {
    /// Creates a marshaller with the built-in converters and default settings.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            types: TypeRegistry::with_builtins(),
            writer_config: WriterConfig::default(),
            reader_config: ReaderConfig::default(),
        }
    }

    /// Replaces the scalar converters.
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Replaces the writer configuration.
    pub fn with_writer_config(mut self, config: WriterConfig) -> Self {
        self.writer_config = config;
        self
    }

    /// Replaces the reader configuration.
    pub fn with_reader_config(mut self, config: ReaderConfig) -> Self {
        self.reader_config = config;
        self
    }

    /// The mapping registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The scalar converters.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The writer configuration.
    pub fn writer_config(&self) -> &WriterConfig {
        &self.writer_config
    }

    /// The reader configuration.
    pub fn reader_config(&self) -> &ReaderConfig {
        &self.reader_config
    }

    fn marshaller(&self) -> Marshaller<'_, R> {
        Marshaller::new(&self.registry, &self.types, &self.writer_config)
    }

    fn unmarshaller(&self) -> Unmarshaller<'_, R> {
        Unmarshaller::new(&self.registry, &self.types, &self.reader_config)
    }

    /// Marshals an object to a string.
    pub fn marshal_to_string(&self, object: &dyn MappedObject) -> Result<String> {
        self.marshaller().marshal_to_string(object)
    }

    /// Marshals an object to any `Write` implementation.
    ///
    /// Nothing is written if marshalling fails.
    pub fn marshal_to_writer<W: Write>(&self, object: &dyn MappedObject, writer: W) -> Result<()> {
        self.marshaller().marshal(object, writer)
    }

    /// Marshals an object to a file, replacing its contents.
    ///
    /// The file is only created once the document has been rendered.
    pub fn marshal_to_file<P: AsRef<Path>>(&self, object: &dyn MappedObject, path: P) -> Result<()> {
        let buffer = self.marshaller().marshal_to_vec(object)?;
        debug!("writing {} bytes to {}", buffer.len(), path.as_ref().display());
        let mut file = File::create(path)?;
        file.write_all(&buffer)?;
        Ok(())
    }

    /// Unmarshals a document held in a string.
    ///
    /// Leading and trailing whitespace is ignored.
    pub fn unmarshal_from_str(&self, xml: &str) -> Result<Box<dyn MappedObject>> {
        self.unmarshal_from_reader(xml.trim().as_bytes())
    }

    /// Unmarshals a document from a buffered reader.
    pub fn unmarshal_from_reader<B: BufRead>(&self, reader: B) -> Result<Box<dyn MappedObject>> {
        let mut cursor = XmlCursor::from_reader(reader);
        self.unmarshaller().unmarshal(&mut cursor)
    }

    /// Unmarshals a document from a file.
    pub fn unmarshal_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn MappedObject>> {
        debug!("reading {}", path.as_ref().display());
        let file = File::open(path)?;
        self.unmarshal_from_reader(BufReader::new(file))
    }

    /// Unmarshals a document held in a string into a concrete type.
    ///
    /// Fails with [`Error::UnexpectedType`] if the root element is bound to
    /// another class.
    pub fn unmarshal_str<T: MappedObject>(&self, xml: &str) -> Result<T> {
        let object = self.unmarshal_from_str(xml)?;
        object.downcast::<T>().map_err(|object| Error::UnexpectedType {
            expected: std::any::type_name::<T>().to_string(),
            found: object.class_id().to_string(),
        })
    }
}
