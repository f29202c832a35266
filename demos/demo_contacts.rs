//! demo_contacts - Map an address book to XML, store it and read it back.
//!
//! This demo declares two mapped classes, marshals a small address book,
//! stores the document with [`FileSystemStorage`] and unmarshals it again.
//! When a file name is given, that document is unmarshalled instead and the
//! resulting objects are printed.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example demo_contacts [contacts.xml]
//! ```

use std::env;

use oxm_rs::mapping::{ClassMapping, FieldMapping, MappingRegistry};
use oxm_rs::storage::{FileSystemStorage, Storage};
use oxm_rs::types::{DATE, INTEGER, STRING};
use oxm_rs::{MappedObject, Result, Value, ValueRef, XmlMarshaller};

const CONTACT: &str = "contacts::Contact";
const ADDRESS_BOOK: &str = "contacts::AddressBook";

#[derive(Debug, Default)]
struct Contact {
    id: Option<i64>,
    name: Option<String>,
    emails: Vec<String>,
    birthday: Option<chrono::NaiveDate>,
}

impl MappedObject for Contact {
    fn class_id(&self) -> &'static str {
        CONTACT
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "id" => ValueRef::scalar(&self.id),
            "name" => ValueRef::scalar(&self.name),
            "emails" => ValueRef::scalars(&self.emails),
            "birthday" => ValueRef::scalar(&self.birthday),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.into_opt()?,
            "name" => self.name = value.into_opt()?,
            "emails" => self.emails = value.into_vec()?,
            "birthday" => self.birthday = value.into_opt()?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct AddressBook {
    owner: Option<String>,
    contacts: Vec<Contact>,
}

impl MappedObject for AddressBook {
    fn class_id(&self) -> &'static str {
        ADDRESS_BOOK
    }

    fn get_field(&self, field: &str) -> ValueRef<'_> {
        match field {
            "owner" => ValueRef::scalar(&self.owner),
            "contacts" => ValueRef::objects(&self.contacts),
            _ => ValueRef::Null,
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "owner" => self.owner = value.into_opt()?,
            "contacts" => self.contacts = value.into_objects()?,
            _ => {}
        }
        Ok(())
    }
}

fn contact_mapping() -> ClassMapping {
    ClassMapping::new(CONTACT, "contact", || Box::new(Contact::default()))
        .with_field(FieldMapping::attribute("id", INTEGER).required())
        .with_field(FieldMapping::text("name", STRING).required())
        .with_field(
            FieldMapping::text("emails", STRING)
                .with_xml_name("email")
                .collection()
                .with_wrapper("emails"),
        )
        .with_field(FieldMapping::text("birthday", DATE))
}

fn address_book_mapping() -> ClassMapping {
    ClassMapping::new(ADDRESS_BOOK, "address-book", || {
        Box::new(AddressBook::default())
    })
    .with_namespace(None, "urn:example:contacts")
    .with_field(FieldMapping::attribute("owner", STRING))
    .with_field(
        FieldMapping::element("contacts", CONTACT)
            .with_xml_name("contact")
            .collection(),
    )
}

fn sample() -> AddressBook {
    AddressBook {
        owner: Some("Ada".to_string()),
        contacts: vec![
            Contact {
                id: Some(1),
                name: Some("Charles Babbage".to_string()),
                emails: vec!["charles@example.org".to_string()],
                birthday: chrono::NaiveDate::from_ymd_opt(1791, 12, 26),
            },
            Contact {
                id: Some(2),
                name: Some("Mary Somerville".to_string()),
                emails: Vec::new(),
                birthday: None,
            },
        ],
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let registry = MappingRegistry::new()
        .with(contact_mapping())?
        .with(address_book_mapping())?;
    let oxm = XmlMarshaller::new(registry);

    let args: Vec<String> = env::args().collect();
    if let Some(path) = args.get(1) {
        let object = oxm.unmarshal_from_file(path)?;
        println!("{:#?}", object);
        return Ok(());
    }

    let xml = oxm.marshal_to_string(&sample())?;
    println!("{}", xml);

    let storage = FileSystemStorage::new(env::temp_dir().join("oxm-demo"));
    let mapping = address_book_mapping();
    storage.insert(&mapping, "ada", &xml)?;
    println!(
        "\nStored at {}",
        storage.document_path(&mapping, "ada")?.display()
    );

    let stored = storage
        .load(&mapping, "ada")?
        .ok_or("document vanished from storage")?;
    let book: AddressBook = oxm.unmarshal_str(&stored)?;
    for contact in &book.contacts {
        println!(
            "{:>4}  {:<20} {}",
            contact.id.unwrap_or_default(),
            contact.name.as_deref().unwrap_or("?"),
            contact.emails.join(", ")
        );
    }

    Ok(())
}
