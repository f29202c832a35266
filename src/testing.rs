//! Mapped classes shared by the unit tests.

use crate::error::Result;
use crate::mapping::{ClassMapping, FieldMapping, LifecycleHooks, MappingRegistry};
use crate::types::{DATE, INTEGER, STRING};
use crate::value::{MappedObject, Scalar, Value, ValueRef};
use chrono::NaiveDate;
use std::cell::RefCell;

pub const BOOK: &str = "library::Book";
pub const NOVEL: &str = "library::Novel";
pub const AUTHOR: &str = "library::Author";
pub const CHAPTER: &str = "library::Chapter";
pub const SHELF: &str = "library::Shelf";

pub const XMLNS_LIBRARY: &str = "urn:example:library";
pub const XMLNS_DC: &str = "http://purl.org/dc/elements/1.1/";

thread_local! {
    static MARSHAL_LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static UNMARSHAL_LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Returns and clears the marshal hook calls seen on this thread.
pub fn take_marshal_log() -> Vec<String> {
    MARSHAL_LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

/// Returns and clears the unmarshal hook calls seen on this thread.
pub fn take_unmarshal_log() -> Vec<String> {
    UNMARSHAL_LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub aliases: Vec<String>,
    pub ratings: Vec<i64>,
}

impl MappedObject for Author {
    fn class_id(&self) -> &'static str {
        AUTHOR
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "id" => ValueRef::scalar(&self.id),
            "name" => ValueRef::scalar(&self.name),
            "aliases" => ValueRef::scalars(&self.aliases),
            "ratings" => ValueRef::scalars(&self.ratings),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.into_opt()?,
            "name" => self.name = value.into_opt()?,
            "aliases" => self.aliases = value.into_vec()?,
            "ratings" => self.ratings = value.into_vec()?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chapter {
    pub number: Option<i64>,
    pub heading: Option<String>,
    /// Set by the after-unmarshal hook, not mapped.
    pub loaded: bool,
}

impl MappedObject for Chapter {
    fn class_id(&self) -> &'static str {
        CHAPTER
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "number" => ValueRef::scalar(&self.number),
            "heading" => ValueRef::scalar(&self.heading),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "number" => self.number = value.into_opt()?,
            "heading" => self.heading = value.into_opt()?,
            "loaded" => self.loaded = value.into_opt()?.unwrap_or(false),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    pub isbn: Option<String>,
    pub edition: Option<i64>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub published: Option<NaiveDate>,
    pub author: Option<Author>,
    pub chapters: Vec<Chapter>,
}

impl MappedObject for Book {
    fn class_id(&self) -> &'static str {
        BOOK
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "isbn" => ValueRef::scalar(&self.isbn),
            "edition" => ValueRef::scalar(&self.edition),
            "title" => ValueRef::scalar(&self.title),
            "tags" => ValueRef::scalars(&self.tags),
            "published" => ValueRef::scalar(&self.published),
            "author" => ValueRef::object(&self.author),
            "chapters" => ValueRef::objects(&self.chapters),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "isbn" => self.isbn = value.into_opt()?,
            "edition" => self.edition = value.into_opt()?,
            "title" => self.title = value.into_opt()?,
            "tags" => self.tags = value.into_vec()?,
            "published" => self.published = value.into_opt()?,
            "author" => self.author = value.into_object()?,
            "chapters" => self.chapters = value.into_objects()?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Novel {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
}

impl MappedObject for Novel {
    fn class_id(&self) -> &'static str {
        NOVEL
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "isbn" => ValueRef::scalar(&self.isbn),
            "title" => ValueRef::scalar(&self.title),
            "genre" => ValueRef::scalar(&self.genre),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "isbn" => self.isbn = value.into_opt()?,
            "title" => self.title = value.into_opt()?,
            "genre" => self.genre = value.into_opt()?,
            _ => {}
        }
        Ok(())
    }
}

/// Holds books of any mapped subclass.
#[derive(Debug, Default)]
pub struct Shelf {
    pub label: Option<String>,
    pub books: Vec<Box<dyn MappedObject>>,
    pub featured: Vec<Box<dyn MappedObject>>,
}

impl MappedObject for Shelf {
    fn class_id(&self) -> &'static str {
        SHELF
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "label" => ValueRef::scalar(&self.label),
            "books" => ValueRef::boxed_list(&self.books),
            "featured" => ValueRef::boxed_list(&self.featured),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "label" => self.label = value.into_opt()?,
            "books" => self.books = value.into_boxed_list()?,
            "featured" => self.featured = value.into_boxed_list()?,
            _ => {}
        }
        Ok(())
    }
}

/// Records the state of `number` when the hook runs.
fn log_unmarshal(point: &str, object: &dyn MappedObject) {
    let number = if object.get_field("number").is_absent() {
        "unset"
    } else {
        "set"
    };
    UNMARSHAL_LOG.with(|log| {
        log.borrow_mut()
            .push(format!("{}:{}:{}", point, object.class_id(), number))
    });
}

fn log_before_unmarshal(object: &mut dyn MappedObject) {
    log_unmarshal("before", object);
}

fn mark_loaded(object: &mut dyn MappedObject) {
    object
        .set_field("loaded", Value::Scalar(Scalar::Bool(true)))
        .unwrap();
    log_unmarshal("after", object);
}

fn log_before_marshal(object: &dyn MappedObject) {
    MARSHAL_LOG.with(|log| log.borrow_mut().push(format!("before:{}", object.class_id())));
}

fn log_after_marshal(object: &dyn MappedObject) {
    MARSHAL_LOG.with(|log| log.borrow_mut().push(format!("after:{}", object.class_id())));
}

pub fn author_mapping() -> ClassMapping {
    ClassMapping::new(AUTHOR, "author", || Box::new(Author::default()))
        .with_field(FieldMapping::text("name", STRING))
        .with_field(FieldMapping::attribute("id", INTEGER).required())
        .with_field(
            FieldMapping::text("aliases", STRING)
                .with_xml_name("alias")
                .collection()
                .with_wrapper("aliases"),
        )
        .with_field(FieldMapping::attribute("ratings", INTEGER).collection())
}

pub fn chapter_mapping() -> ClassMapping {
    ClassMapping::new(CHAPTER, "chapter", || Box::new(Chapter::default()))
        .with_field(FieldMapping::attribute("number", INTEGER))
        .with_field(FieldMapping::text("heading", STRING))
        .with_hooks(LifecycleHooks {
            before_unmarshal: Some(log_before_unmarshal),
            after_unmarshal: Some(mark_loaded),
            before_marshal: Some(log_before_marshal),
            after_marshal: Some(log_after_marshal),
            ..Default::default()
        })
}

pub fn book_mapping() -> ClassMapping {
    ClassMapping::new(BOOK, "book", || Box::new(Book::default()))
        .with_namespace(None, XMLNS_LIBRARY)
        .with_namespace(Some("dc"), XMLNS_DC)
        .with_field(FieldMapping::text("title", STRING).with_prefix("dc").required())
        .with_field(FieldMapping::attribute("isbn", STRING).required())
        .with_field(FieldMapping::element("author", AUTHOR).nillable())
        .with_field(FieldMapping::text("tags", STRING).with_xml_name("tag").collection())
        .with_field(FieldMapping::attribute("edition", INTEGER).nillable())
        .with_field(FieldMapping::text("published", DATE))
        .with_field(
            FieldMapping::element("chapters", CHAPTER)
                .with_xml_name("chapter")
                .collection()
                .with_wrapper("chapters"),
        )
        .with_hooks(LifecycleHooks {
            before_marshal: Some(log_before_marshal),
            after_marshal: Some(log_after_marshal),
            ..Default::default()
        })
}

pub fn novel_mapping() -> ClassMapping {
    ClassMapping::new(NOVEL, "novel", || Box::new(Novel::default()))
        .with_ancestor(BOOK)
        .with_field(FieldMapping::attribute("isbn", STRING).required())
        .with_field(FieldMapping::text("title", STRING))
        .with_field(FieldMapping::text("genre", STRING))
}

pub fn shelf_mapping() -> ClassMapping {
    ClassMapping::new(SHELF, "shelf", || Box::new(Shelf::default()))
        .with_field(FieldMapping::attribute("label", STRING))
        .with_field(FieldMapping::element("books", BOOK).collection())
        .with_field(
            FieldMapping::element("featured", BOOK)
                .with_xml_name("book")
                .collection()
                .with_wrapper("featured"),
        )
}

pub fn registry() -> MappingRegistry {
    let mut registry = MappingRegistry::new();
    for mapping in [
        author_mapping(),
        chapter_mapping(),
        book_mapping(),
        novel_mapping(),
        shelf_mapping(),
    ] {
        registry.register(mapping).expect("fixture mappings are valid");
    }
    registry
}

pub fn sample_book() -> Book {
    Book {
        isbn: Some("978-0-441-01359-3".to_string()),
        edition: Some(2),
        title: Some("The Left Hand of Darkness".to_string()),
        tags: vec!["classic".to_string(), "sf".to_string()],
        published: NaiveDate::from_ymd_opt(1969, 3, 1),
        author: Some(Author {
            id: Some(7),
            name: Some("Ursula K. Le Guin".to_string()),
            aliases: vec!["UKL".to_string(), "Ursula Kroeber".to_string()],
            ratings: vec![5, 4, 5],
        }),
        chapters: vec![
            Chapter {
                number: Some(1),
                heading: Some("A Parade in Erhenrang".to_string()),
                loaded: false,
            },
            Chapter {
                number: Some(2),
                heading: Some("The Place Inside the Blizzard".to_string()),
                loaded: false,
            },
        ],
    }
}
