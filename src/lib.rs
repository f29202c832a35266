//! Object/XML mapping library for Rust.
//!
//! This crate converts in-memory objects to XML documents and back, driven by
//! declarative class mappings instead of hand-written serialization code.
//! Documents are streamed in both directions; no DOM tree is built.
//!
//! # Features
//!
//! - **Declarative Mappings**: Bind fields to attributes, text elements or
//!   nested elements, with collections, wrappers, namespaces and prefixes.
//! - **Polymorphism**: Nested elements are dispatched on their element name,
//!   so a field typed as a base class accepts any mapped subclass.
//! - **Lifecycle Hooks**: Optional callbacks before and after each object is
//!   marshalled or unmarshalled.
//! - **Pluggable Converters**: Scalar types are converted by name through a
//!   [`TypeRegistry`](types::TypeRegistry).
//! - **File Storage**: Keep one document per object identifier on disk.
//! - **Serde Support**: Optional serialization of configuration and scalar
//!   values with the `serde` feature.
//!
//! # Quick Start
//!
//! ```rust
//! use oxm_rs::mapping::{ClassMapping, FieldMapping, MappingRegistry};
//! use oxm_rs::types::{INTEGER, STRING};
//! use oxm_rs::{MappedObject, Result, Value, ValueRef, XmlMarshaller};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Book {
//!     isbn: Option<String>,
//!     title: Option<String>,
//!     pages: Option<i64>,
//! }
//!
//! impl MappedObject for Book {
//!     fn class_id(&self) -> &'static str {
//!         "Book"
//!     }
//!
//!     fn get_field(&self, field: &str) -> ValueRef<'_> {
//!         match field {
//!             "isbn" => ValueRef::scalar(&self.isbn),
//!             "title" => ValueRef::scalar(&self.title),
//!             "pages" => ValueRef::scalar(&self.pages),
//!             _ => ValueRef::Null,
//!         }
//!     }
//!
//!     fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
//!         match field {
//!             "isbn" => self.isbn = value.into_opt()?,
//!             "title" => self.title = value.into_opt()?,
//!             "pages" => self.pages = value.into_opt()?,
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let registry = MappingRegistry::new()
//!     .with(
//!         ClassMapping::new("Book", "book", || Box::new(Book::default()))
//!             .with_field(FieldMapping::attribute("isbn", STRING).required())
//!             .with_field(FieldMapping::text("title", STRING))
//!             .with_field(FieldMapping::text("pages", INTEGER)),
//!     )
//!     .unwrap();
//! let oxm = XmlMarshaller::new(registry);
//!
//! let book = Book {
//!     isbn: Some("0-553-29335-4".to_string()),
//!     title: Some("Foundation".to_string()),
//!     pages: Some(255),
//! };
//! let xml = oxm.marshal_to_string(&book).unwrap();
//! assert!(xml.contains(r#"<book isbn="0-553-29335-4">"#));
//!
//! let parsed: Book = oxm.unmarshal_str(&xml).unwrap();
//! assert_eq!(parsed, book);
//! ```
//!
//! # Module Structure
//!
//! - [`mapping`] - Class and field mappings, and the registry
//! - [`value`] - The [`MappedObject`] trait and the values it exchanges
//! - [`types`] - Scalar type converters
//! - [`reader`] - Streaming unmarshaller
//! - [`writer`] - Streaming marshaller
//! - [`marshaller`] - String, stream and file entry points
//! - [`storage`] - Document storage
//! - [`error`] - Error types
//!
//! # Optional Features
//!
//! - `serde` - Enable serde serialization/deserialization support

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod mapping;
pub mod marshaller;
pub mod reader;
pub mod storage;
pub mod types;
pub mod value;
pub mod writer;

#[cfg(test)]
mod testing;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};
pub use mapping::{ClassMapping, FieldMapping, MappingRegistry, NodeKind, Registry};
pub use marshaller::XmlMarshaller;
pub use reader::ReaderConfig;
pub use storage::{FileSystemStorage, Storage};
pub use types::{TypeConverter, TypeRegistry};
pub use value::{FromScalar, MappedObject, Scalar, Value, ValueRef};
pub use writer::WriterConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
