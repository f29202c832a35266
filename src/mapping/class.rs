//! Class mappings.

use crate::error::{Error, Result};
use crate::mapping::field::{FieldMapping, NodeKind};
use crate::value::MappedObject;
use log::trace;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Creates a fresh, zero-valued instance of a mapped class.
pub type Factory = fn() -> Box<dyn MappedObject>;

/// Hook invoked around unmarshalling; may modify the object.
pub type UnmarshalHook = fn(&mut dyn MappedObject);

/// Hook invoked around marshalling; observes the object.
pub type MarshalHook = fn(&dyn MappedObject);

/// A namespace declaration emitted on a mapped element.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Namespace {
    /// Prefix, or `None` for the default namespace
    pub prefix: Option<String>,
    /// Namespace URI
    pub uri: String,
}

impl Namespace {
    /// Creates a namespace declaration.
    pub fn new(prefix: Option<&str>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            uri: uri.into(),
        }
    }

    /// Returns the declaring attribute name (`xmlns` or `xmlns:<prefix>`).
    pub fn attribute_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("xmlns:{}", p),
            None => "xmlns".to_string(),
        }
    }
}

/// Named points at which lifecycle hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After instantiation, before any field is read from the document
    BeforeUnmarshal,
    /// After all fields have been assigned
    AfterUnmarshal,
    /// Before the element is opened
    BeforeMarshal,
    /// Before the element is closed
    AfterMarshal,
}

/// Optional lifecycle callbacks of a class.
#[derive(Clone, Copy, Default)]
pub struct LifecycleHooks {
    /// Runs before unmarshalling
    pub before_unmarshal: Option<UnmarshalHook>,
    /// Runs after unmarshalling
    pub after_unmarshal: Option<UnmarshalHook>,
    /// Runs before marshalling
    pub before_marshal: Option<MarshalHook>,
    /// Runs after marshalling
    pub after_marshal: Option<MarshalHook>,
}

impl LifecycleHooks {
    /// Returns true if a hook is declared for the point.
    pub fn has(&self, point: HookPoint) -> bool {
        match point {
            HookPoint::BeforeUnmarshal => self.before_unmarshal.is_some(),
            HookPoint::AfterUnmarshal => self.after_unmarshal.is_some(),
            HookPoint::BeforeMarshal => self.before_marshal.is_some(),
            HookPoint::AfterMarshal => self.after_marshal.is_some(),
        }
    }

    /// Runs an unmarshal hook. A no-op when none is declared for the point.
    pub fn invoke_unmarshal(&self, point: HookPoint, object: &mut dyn MappedObject) {
        let hook = match point {
            HookPoint::BeforeUnmarshal => self.before_unmarshal,
            HookPoint::AfterUnmarshal => self.after_unmarshal,
            _ => None,
        };
        if let Some(hook) = hook {
            trace!("invoking {:?} hook on {}", point, object.class_id());
            hook(object);
        }
    }

    /// Runs a marshal hook. A no-op when none is declared for the point.
    pub fn invoke_marshal(&self, point: HookPoint, object: &dyn MappedObject) {
        let hook = match point {
            HookPoint::BeforeMarshal => self.before_marshal,
            HookPoint::AfterMarshal => self.after_marshal,
            _ => None,
        };
        if let Some(hook) = hook {
            trace!("invoking {:?} hook on {}", point, object.class_id());
            hook(object);
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("before_unmarshal", &self.before_unmarshal.is_some())
            .field("after_unmarshal", &self.after_unmarshal.is_some())
            .field("before_marshal", &self.before_marshal.is_some())
            .field("after_marshal", &self.after_marshal.is_some())
            .finish()
    }
}

/// The XML binding of one class.
///
/// Field mappings keep their declaration order. Grouping by node kind and the
/// name lookups used while reading are computed as fields are added, so the
/// engines never regroup per call.
///
/// ```rust
/// use oxm_rs::mapping::{ClassMapping, FieldMapping};
/// # use oxm_rs::{MappedObject, Result, Value, ValueRef};
/// # #[derive(Debug, Default)]
/// # struct Book;
/// # impl MappedObject for Book {
/// #     fn class_id(&self) -> &'static str { "library::Book" }
/// #     fn get_field(&self, _: &str) -> ValueRef<'_> { ValueRef::Null }
/// #     fn set_field(&mut self, _: &str, _: Value) -> Result<()> { Ok(()) }
/// # }
///
/// let mapping = ClassMapping::new("library::Book", "book", || Box::new(Book::default()))
///     .with_namespace(None, "urn:library")
///     .with_field(FieldMapping::text("title", "string").required())
///     .with_field(FieldMapping::attribute("isbn", "string"));
///
/// // Attributes come first regardless of declaration order.
/// let names: Vec<_> = mapping.attribute_fields().map(|f| f.field_name()).collect();
/// assert_eq!(names, ["isbn"]);
/// ```
#[derive(Clone)]
pub struct ClassMapping {
    class_id: String,
    xml_name: String,
    namespaces: Vec<Namespace>,
    fields: Vec<FieldMapping>,
    ancestors: Vec<String>,
    hooks: LifecycleHooks,
    factory: Factory,

    // Indexes into `fields`, in declaration order
    attributes: Vec<usize>,
    texts: Vec<usize>,
    elements: Vec<usize>,

    attribute_index: HashMap<String, usize>,
    child_index: HashMap<String, usize>,
    wrapper_index: HashMap<String, usize>,
}

impl ClassMapping {
    /// Creates a mapping for a class bound to the element `xml_name`.
    pub fn new(class_id: impl Into<String>, xml_name: impl Into<String>, factory: Factory) -> Self {
        Self {
            class_id: class_id.into(),
            xml_name: xml_name.into(),
            namespaces: Vec::new(),
            fields: Vec::new(),
            ancestors: Vec::new(),
            hooks: LifecycleHooks::default(),
            factory,
            attributes: Vec::new(),
            texts: Vec::new(),
            elements: Vec::new(),
            attribute_index: HashMap::new(),
            child_index: HashMap::new(),
            wrapper_index: HashMap::new(),
        }
    }

    /// Declares a namespace on the element.
    pub fn with_namespace(mut self, prefix: Option<&str>, uri: impl Into<String>) -> Self {
        self.namespaces.push(Namespace::new(prefix, uri));
        self
    }

    /// Appends a field mapping.
    pub fn with_field(mut self, field: FieldMapping) -> Self {
        let idx = self.fields.len();
        let name = field.xml_name().to_string();
        match field.node() {
            NodeKind::Attribute => {
                self.attributes.push(idx);
                self.attribute_index.entry(name).or_insert(idx);
            }
            NodeKind::Text | NodeKind::Element => {
                if field.node() == NodeKind::Text {
                    self.texts.push(idx);
                } else {
                    self.elements.push(idx);
                }
                match field.wrapper() {
                    Some(wrapper) => {
                        self.wrapper_index.entry(wrapper.to_string()).or_insert(idx);
                    }
                    None => {
                        self.child_index.entry(name).or_insert(idx);
                    }
                }
            }
        }
        self.fields.push(field);
        self
    }

    /// Declares an ancestor class, nearest first.
    pub fn with_ancestor(mut self, class_id: impl Into<String>) -> Self {
        self.ancestors.push(class_id.into());
        self
    }

    /// Sets all lifecycle hooks.
    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Class identifier.
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Element local name.
    pub fn xml_name(&self) -> &str {
        &self.xml_name
    }

    /// Namespace declarations, in declaration order.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// All field mappings, in declaration order.
    pub fn field_mappings(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Ancestor class identifiers.
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// Lifecycle hooks.
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }

    /// Creates a zero-valued instance of the class.
    pub fn new_instance(&self) -> Box<dyn MappedObject> {
        (self.factory)()
    }

    /// Attribute fields, in declaration order.
    pub fn attribute_fields(&self) -> impl Iterator<Item = &FieldMapping> + '_ {
        self.attributes.iter().map(move |&i| &self.fields[i])
    }

    /// Text fields, in declaration order.
    pub fn text_fields(&self) -> impl Iterator<Item = &FieldMapping> + '_ {
        self.texts.iter().map(move |&i| &self.fields[i])
    }

    /// Element fields, in declaration order.
    pub fn element_fields(&self) -> impl Iterator<Item = &FieldMapping> + '_ {
        self.elements.iter().map(move |&i| &self.fields[i])
    }

    /// Looks up an attribute field by local name.
    pub fn attribute_field(&self, xml_name: &str) -> Option<(usize, &FieldMapping)> {
        self.attribute_index
            .get(xml_name)
            .map(|&i| (i, &self.fields[i]))
    }

    /// Looks up an unwrapped text or element field by local name.
    pub fn child_field(&self, xml_name: &str) -> Option<(usize, &FieldMapping)> {
        self.child_index.get(xml_name).map(|&i| (i, &self.fields[i]))
    }

    /// Looks up a wrapped collection field by wrapper name.
    pub fn wrapped_field(&self, wrapper: &str) -> Option<(usize, &FieldMapping)> {
        self.wrapper_index.get(wrapper).map(|&i| (i, &self.fields[i]))
    }

    /// Checks the mapping invariants.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Error::InvalidMapping(format!("{}: {}", self.class_id, msg));

        if self.xml_name.is_empty() {
            return Err(invalid("empty element name".to_string()));
        }

        let mut field_names = HashSet::new();
        let mut attribute_names = HashSet::new();
        let mut child_names = HashSet::new();

        for field in &self.fields {
            if !field_names.insert(field.field_name()) {
                return Err(invalid(format!("field '{}' mapped twice", field.field_name())));
            }

            if let Some(prefix) = field.prefix() {
                let declared = prefix == "xml"
                    || self
                        .namespaces
                        .iter()
                        .any(|ns| ns.prefix.as_deref() == Some(prefix));
                if !declared {
                    return Err(invalid(format!(
                        "prefix '{}' of field '{}' is not declared",
                        prefix,
                        field.field_name()
                    )));
                }
            }

            match field.node() {
                NodeKind::Attribute => {
                    if field.wrapper().is_some() {
                        return Err(invalid(format!(
                            "attribute field '{}' cannot have a wrapper",
                            field.field_name()
                        )));
                    }
                    if !attribute_names.insert(field.xml_name()) {
                        return Err(invalid(format!(
                            "attribute '{}' mapped twice",
                            field.xml_name()
                        )));
                    }
                }
                NodeKind::Text | NodeKind::Element => {
                    let occupied = match field.wrapper() {
                        Some(wrapper) => {
                            if !field.is_collection() {
                                return Err(invalid(format!(
                                    "wrapper on non-collection field '{}'",
                                    field.field_name()
                                )));
                            }
                            wrapper
                        }
                        None => field.xml_name(),
                    };
                    if !child_names.insert(occupied) {
                        return Err(invalid(format!(
                            "child element '{}' mapped twice",
                            occupied
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ClassMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMapping")
            .field("class_id", &self.class_id)
            .field("xml_name", &self.xml_name)
            .field("namespaces", &self.namespaces)
            .field("fields", &self.fields)
            .field("ancestors", &self.ancestors)
            .field("hooks", &self.hooks)
            .finish()
    }
}
