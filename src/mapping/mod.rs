//! Mapping metadata.
//!
//! This module contains the static description of how classes bind to XML:
//!
//! - [`FieldMapping`] - The binding of one field (attribute, text or element)
//! - [`ClassMapping`] - The binding of one class, its fields and hooks
//! - [`Registry`] and [`MappingRegistry`] - Lookup of mappings by class and element name
//!
//! Mappings are built once and never modified by the engines.

mod class;
mod field;
mod registry;

pub use class::{
    ClassMapping, Factory, HookPoint, LifecycleHooks, MarshalHook, Namespace, UnmarshalHook,
};
pub use field::{FieldMapping, NodeKind};
pub use registry::{MappingRegistry, Registry};
