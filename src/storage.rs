//! Durable storage of marshalled documents.
//!
//! A [`Storage`] keeps one XML document per (class, identifier) pair. The
//! engines never touch storage; callers marshal an object, then store the
//! resulting text.
//!
//! [`FileSystemStorage`] lays documents out as one directory per class:
//!
//! ```text
//! <storage_path>/library/Book/978-0-441-01359-3.xml
//! ```

use crate::error::{Error, Result};
use crate::mapping::ClassMapping;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Document storage keyed by class mapping and identifier.
pub trait Storage {
    /// Stores a document, replacing any previous one. Returns true if bytes
    /// were written.
    fn insert(&self, mapping: &ClassMapping, id: &str, xml: &str) -> Result<bool>;

    /// Loads a document, or `None` if none is stored under the identifier.
    fn load(&self, mapping: &ClassMapping, id: &str) -> Result<Option<String>>;

    /// Returns true if a document is stored under the identifier.
    fn exists(&self, mapping: &ClassMapping, id: &str) -> Result<bool>;

    /// Removes a document. Returns true if one was removed.
    fn delete(&self, mapping: &ClassMapping, id: &str) -> Result<bool>;
}

/// Stores documents as files below a base directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    storage_path: PathBuf,
    file_extension: String,
    dir_mode: u32,
    use_namespace_in_path: bool,
}

impl FileSystemStorage {
    /// Creates a storage rooted at `storage_path` with the `xml` extension.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            file_extension: "xml".to_string(),
            dir_mode: 0o755,
            use_namespace_in_path: true,
        }
    }

    /// Sets the file extension, without the leading dot.
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Sets the permission bits of created directories (Unix only).
    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    /// Sets whether the full class path or only the last segment of the
    /// class identifier names the directory.
    pub fn with_namespace_in_path(mut self, enabled: bool) -> Self {
        self.use_namespace_in_path = enabled;
        self
    }

    /// Base directory.
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// File extension.
    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    /// Permission bits of created directories.
    pub fn dir_mode(&self) -> u32 {
        self.dir_mode
    }

    /// Whether the full class path names the directory.
    pub fn use_namespace_in_path(&self) -> bool {
        self.use_namespace_in_path
    }

    /// Returns the directory holding the documents of a class.
    pub fn class_dir(&self, mapping: &ClassMapping) -> PathBuf {
        let segments = mapping.class_id().split("::").filter(|s| !s.is_empty());
        let mut dir = self.storage_path.clone();
        if self.use_namespace_in_path {
            dir.extend(segments);
        } else if let Some(last) = segments.last() {
            dir.push(last);
        }
        dir
    }

    /// Returns the file path of a document.
    pub fn document_path(&self, mapping: &ClassMapping, id: &str) -> Result<PathBuf> {
        check_id(id)?;
        Ok(self
            .class_dir(mapping)
            .join(format!("{}.{}", id, self.file_extension)))
    }

    fn create_dir(&self, dir: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }
        builder.create(dir)
    }
}

impl Storage for FileSystemStorage {
    fn insert(&self, mapping: &ClassMapping, id: &str, xml: &str) -> Result<bool> {
        let path = self.document_path(mapping, id)?;
        if let Some(dir) = path.parent() {
            self.create_dir(dir)?;
        }
        fs::write(&path, xml)?;
        debug!("stored {} bytes at {}", xml.len(), path.display());
        Ok(!xml.is_empty())
    }

    fn load(&self, mapping: &ClassMapping, id: &str) -> Result<Option<String>> {
        let path = self.document_path(mapping, id)?;
        match fs::read_to_string(&path) {
            Ok(xml) => Ok(Some(xml)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, mapping: &ClassMapping, id: &str) -> Result<bool> {
        Ok(self.document_path(mapping, id)?.is_file())
    }

    fn delete(&self, mapping: &ClassMapping, id: &str) -> Result<bool> {
        let path = self.document_path(mapping, id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Rejects identifiers that would escape the class directory.
fn check_id(id: &str) -> Result<()> {
    if id.is_empty()
        || id == "."
        || id.contains("..")
        || id.contains(['/', '\\', '\0'])
    {
        return Err(Error::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshaller::XmlMarshaller;
    use crate::testing::{self, Book};
    use tempfile::TempDir;

    #[test]
    fn test_insert_load_delete() {
        let dir = TempDir::new().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let mapping = testing::book_mapping();

        assert!(!storage.exists(&mapping, "42").unwrap());
        assert_eq!(storage.load(&mapping, "42").unwrap(), None);

        assert!(storage.insert(&mapping, "42", "<book/>").unwrap());
        assert!(storage.exists(&mapping, "42").unwrap());
        assert!(dir.path().join("library/Book/42.xml").is_file());
        assert_eq!(storage.load(&mapping, "42").unwrap().as_deref(), Some("<book/>"));

        assert!(storage.delete(&mapping, "42").unwrap());
        assert!(!storage.exists(&mapping, "42").unwrap());
        assert!(!storage.delete(&mapping, "42").unwrap());
    }

    #[test]
    fn test_path_layout_options() {
        let dir = TempDir::new().unwrap();
        let storage = FileSystemStorage::new(dir.path())
            .with_file_extension("oxm")
            .with_namespace_in_path(false);
        let mapping = testing::author_mapping();

        assert_eq!(
            storage.document_path(&mapping, "7").unwrap(),
            dir.path().join("Author").join("7.oxm")
        );
        storage.insert(&mapping, "7", "<author id=\"7\"/>").unwrap();
        assert!(dir.path().join("Author/7.oxm").is_file());
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        let dir = TempDir::new().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let mapping = testing::book_mapping();

        for id in ["", ".", "..", "../escape", "a/b", "a\\b"] {
            assert!(
                matches!(
                    storage.insert(&mapping, id, "<book/>"),
                    Err(Error::InvalidIdentifier(_))
                ),
                "accepted {:?}",
                id
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_dir_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileSystemStorage::new(dir.path()).with_dir_mode(0o700);
        storage
            .insert(&testing::chapter_mapping(), "1", "<chapter/>")
            .unwrap();

        let mode = fs::metadata(dir.path().join("library/Chapter"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_store_marshalled_document() {
        let dir = TempDir::new().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let oxm = XmlMarshaller::new(testing::registry());
        let mapping = testing::book_mapping();

        let book = testing::sample_book();
        let xml = oxm.marshal_to_string(&book).unwrap();
        storage.insert(&mapping, "978-0-441-01359-3", &xml).unwrap();

        let stored = storage.load(&mapping, "978-0-441-01359-3").unwrap().unwrap();
        let parsed: Book = oxm.unmarshal_str(&stored).unwrap();
        assert_eq!(parsed.isbn, book.isbn);
        assert_eq!(parsed.title, book.title);
    }
}
