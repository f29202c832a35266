//! Field mappings.

use std::fmt;

/// Placement of a field's value in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// An attribute of the owning element
    Attribute,
    /// A text-bearing child element
    Text,
    /// A nested child element
    Element,
}

impl NodeKind {
    /// Returns the lowercase name of the node kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Element => "element",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The binding of one field of a class to the document.
///
/// Built with the constructor for the node kind and refined with builder
/// methods:
///
/// ```rust
/// use oxm_rs::mapping::{FieldMapping, NodeKind};
///
/// let tags = FieldMapping::text("tags", "string")
///     .with_xml_name("tag")
///     .collection()
///     .with_wrapper("tags");
///
/// assert_eq!(tags.node(), NodeKind::Text);
/// assert_eq!(tags.xml_name(), "tag");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    field_name: String,
    xml_name: String,
    node: NodeKind,
    value_type: String,
    collection: bool,
    required: bool,
    nillable: bool,
    wrapper: Option<String>,
    prefix: Option<String>,
}

impl FieldMapping {
    /// Creates a mapping for a field of the given node kind and value type.
    ///
    /// The XML name defaults to the field name.
    pub fn new(field_name: impl Into<String>, node: NodeKind, value_type: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self {
            xml_name: field_name.clone(),
            field_name,
            node,
            value_type: value_type.into(),
            collection: false,
            required: false,
            nillable: false,
            wrapper: None,
            prefix: None,
        }
    }

    /// Creates an attribute mapping.
    pub fn attribute(field_name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self::new(field_name, NodeKind::Attribute, value_type)
    }

    /// Creates a text mapping.
    pub fn text(field_name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self::new(field_name, NodeKind::Text, value_type)
    }

    /// Creates an element mapping.
    pub fn element(field_name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self::new(field_name, NodeKind::Element, value_type)
    }

    /// Sets the XML name.
    pub fn with_xml_name(mut self, xml_name: impl Into<String>) -> Self {
        self.xml_name = xml_name.into();
        self
    }

    /// Marks the field as holding an ordered sequence of values.
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as nillable.
    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    /// Encloses the values of a collection in one element of this name.
    pub fn with_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.wrapper = Some(wrapper.into());
        self
    }

    /// Qualifies the attribute or element with a namespace prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Name of the field on the object.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Local XML name of the attribute or element.
    pub fn xml_name(&self) -> &str {
        &self.xml_name
    }

    /// Node kind.
    pub fn node(&self) -> NodeKind {
        self.node
    }

    /// Scalar type identifier or mapped class identifier.
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    /// Whether the field holds a collection.
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Whether a missing value is an error.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the field may be absent from the document.
    pub fn is_nillable(&self) -> bool {
        self.nillable
    }

    /// Wrapper element name, if any.
    pub fn wrapper(&self) -> Option<&str> {
        self.wrapper.as_deref()
    }

    /// Namespace prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the possibly prefixed name written to the document.
    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.xml_name)
    }

    /// Returns the possibly prefixed wrapper name.
    pub fn qualified_wrapper(&self) -> Option<String> {
        self.wrapper
            .as_deref()
            .map(|w| qualify(self.prefix.as_deref(), w))
    }

    /// Whether the field's values appear as child elements.
    pub fn is_child(&self) -> bool {
        self.node != NodeKind::Attribute
    }
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{}:{}", p, name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let f = FieldMapping::attribute("id", "integer");
        assert_eq!(f.field_name(), "id");
        assert_eq!(f.xml_name(), "id");
        assert_eq!(f.node(), NodeKind::Attribute);
        assert!(!f.is_collection());
        assert!(!f.is_required());
        assert!(!f.is_nillable());
        assert_eq!(f.wrapper(), None);
        assert!(!f.is_child());
    }

    #[test]
    fn test_qualified_names() {
        let f = FieldMapping::text("title", "string")
            .with_prefix("dc")
            .collection()
            .with_wrapper("titles");
        assert_eq!(f.qualified_name(), "dc:title");
        assert_eq!(f.qualified_wrapper().as_deref(), Some("dc:titles"));
    }
}
