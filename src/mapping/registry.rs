//! Mapping registries.
//!
//! The engines only depend on the [`Registry`] trait. [`MappingRegistry`] is
//! the in-memory implementation: mappings are registered once at start-up,
//! after which the registry is read-only and can be shared between threads.

use crate::error::{Error, Result};
use crate::mapping::class::ClassMapping;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup of class mappings by class identifier and by element name.
pub trait Registry {
    /// Returns the class identifier bound to an element local name.
    fn resolve_by_root_element_name(&self, xml_name: &str) -> Option<&str>;

    /// Returns the mapping of a class.
    fn resolve_mapping(&self, class_id: &str) -> Option<&ClassMapping>;

    /// Returns true if the type identifier names a mapped class.
    fn is_mapped_type(&self, type_id: &str) -> bool {
        self.resolve_mapping(type_id).is_some()
    }

    /// Returns the ancestor class identifiers of a mapped class.
    fn ancestors_of(&self, class_id: &str) -> &[String] {
        self.resolve_mapping(class_id)
            .map(ClassMapping::ancestors)
            .unwrap_or(&[])
    }
}

impl<R: Registry + ?Sized> Registry for &R {
    fn resolve_by_root_element_name(&self, xml_name: &str) -> Option<&str> {
        (**self).resolve_by_root_element_name(xml_name)
    }

    fn resolve_mapping(&self, class_id: &str) -> Option<&ClassMapping> {
        (**self).resolve_mapping(class_id)
    }

    fn is_mapped_type(&self, type_id: &str) -> bool {
        (**self).is_mapped_type(type_id)
    }

    fn ancestors_of(&self, class_id: &str) -> &[String] {
        (**self).ancestors_of(class_id)
    }
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn resolve_by_root_element_name(&self, xml_name: &str) -> Option<&str> {
        (**self).resolve_by_root_element_name(xml_name)
    }

    fn resolve_mapping(&self, class_id: &str) -> Option<&ClassMapping> {
        (**self).resolve_mapping(class_id)
    }

    fn is_mapped_type(&self, type_id: &str) -> bool {
        (**self).is_mapped_type(type_id)
    }

    fn ancestors_of(&self, class_id: &str) -> &[String] {
        (**self).ancestors_of(class_id)
    }
}

/// An in-memory registry of class mappings.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    classes: HashMap<String, ClassMapping>,
    root_names: HashMap<String, String>,
}

impl MappingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class mapping.
    ///
    /// Fails with [`Error::InvalidMapping`] if the mapping is invalid, the
    /// class is already registered, or another class claims the same
    /// element name.
    pub fn register(&mut self, mapping: ClassMapping) -> Result<()> {
        mapping.validate()?;

        if self.classes.contains_key(mapping.class_id()) {
            return Err(Error::InvalidMapping(format!(
                "class '{}' is already registered",
                mapping.class_id()
            )));
        }
        if let Some(owner) = self.root_names.get(mapping.xml_name()) {
            return Err(Error::InvalidMapping(format!(
                "element '{}' of '{}' is already bound to '{}'",
                mapping.xml_name(),
                mapping.class_id(),
                owner
            )));
        }

        debug!(
            "registered {} as <{}> with {} fields",
            mapping.class_id(),
            mapping.xml_name(),
            mapping.field_mappings().len()
        );
        self.root_names
            .insert(mapping.xml_name().to_string(), mapping.class_id().to_string());
        self.classes.insert(mapping.class_id().to_string(), mapping);
        Ok(())
    }

    /// Registers a mapping, builder style.
    pub fn with(mut self, mapping: ClassMapping) -> Result<Self> {
        self.register(mapping)?;
        Ok(self)
    }

    /// Returns the number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no class is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over all registered mappings.
    pub fn iter(&self) -> impl Iterator<Item = &ClassMapping> {
        self.classes.values()
    }
}

impl Registry for MappingRegistry {
    fn resolve_by_root_element_name(&self, xml_name: &str) -> Option<&str> {
        self.root_names.get(xml_name).map(String::as_str)
    }

    fn resolve_mapping(&self, class_id: &str) -> Option<&ClassMapping> {
        self.classes.get(class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Author};
    use crate::value::MappedObject;

    fn author() -> Box<dyn MappedObject> {
        Box::new(Author::default())
    }

    #[test]
    fn test_lookups() {
        let registry = testing::registry();

        assert_eq!(
            registry.resolve_by_root_element_name("book"),
            Some(testing::BOOK)
        );
        assert!(registry.resolve_by_root_element_name("magazine").is_none());
        assert!(registry.is_mapped_type(testing::AUTHOR));
        assert!(!registry.is_mapped_type("string"));
        assert_eq!(
            registry.ancestors_of(testing::NOVEL),
            [testing::BOOK.to_string()]
        );
        assert!(registry.ancestors_of("nothing").is_empty());
    }

    #[test]
    fn test_duplicate_element_name_rejected() {
        let mut registry = MappingRegistry::new();
        registry
            .register(ClassMapping::new("A", "person", author))
            .unwrap();
        let err = registry
            .register(ClassMapping::new("B", "person", author))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMapping(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let mut registry = MappingRegistry::new();
        registry.register(ClassMapping::new("A", "a", author)).unwrap();
        assert!(registry.register(ClassMapping::new("A", "b", author)).is_err());
    }

    #[test]
    fn test_shared_registry() {
        let registry = Arc::new(testing::registry());
        let shared = Arc::clone(&registry);
        assert!(shared.is_mapped_type(testing::BOOK));
        assert!((&*registry).is_mapped_type(testing::BOOK));
    }
}
