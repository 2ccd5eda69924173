use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// A PDF opened read-only for copying its pages.
///
/// The file on disk is never written; the handle is released on drop.
pub struct SourceDocument {
    path: PathBuf,
    doc: Document,
    /// Page object ids in page order
    page_ids: Vec<ObjectId>,
    /// The file on disk carried an encryption dictionary
    was_encrypted: bool,
}

impl SourceDocument {
    /// Open `path`, decrypting with `password` when the file is encrypted.
    pub fn open(path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::Open(format!("{}: file not found", path.display())));
        }

        let mut doc = Document::load(path)
            .map_err(|e| Error::Open(format!("{}: {e}", path.display())))?;

        // lopdf already decrypts on load when the empty password authenticates
        let was_encrypted = doc.is_encrypted() || doc.encryption_state.is_some();
        if doc.is_encrypted() {
            debug!("{} is encrypted, decrypting", path.display());
            doc.decrypt(password)
                .map_err(|e| Error::Password(format!("{}: {e}", path.display())))?;
        }

        let page_ids = doc.get_pages().into_values().collect();

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            page_ids,
            was_encrypted,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// Whether the file was encrypted before it was opened.
    pub const fn was_encrypted(&self) -> bool {
        self.was_encrypted
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub(crate) const fn max_id(&self) -> u32 {
        self.doc.max_id
    }

    /// Document information dictionary reference, if any.
    pub(crate) fn info_id(&self) -> Option<ObjectId> {
        self.doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .ok()
    }

    /// A copy of the page dictionary with inherited attributes made explicit,
    /// so the page keeps its resources and geometry under a new parent.
    pub fn page(&self, id: ObjectId) -> Result<Dictionary> {
        let mut page = self
            .doc
            .get_dictionary(id)
            .map_err(|e| Error::Unexpected(format!("page object {} {}: {e}", id.0, id.1)))?
            .clone();

        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = self.inherited(&page, key) {
                    page.set(key.to_vec(), value);
                }
            }
        }

        Ok(page)
    }

    fn inherited(&self, page: &Dictionary, key: &[u8]) -> Option<Object> {
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

        for _ in 0..MAX_TREE_DEPTH {
            let node = self.doc.get_dictionary(parent?).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }

        None
    }

    /// Objects that carry over to a rebuilt document: everything except the
    /// page tree, outlines and cross-reference machinery. Decryption has
    /// already removed the encryption dictionary.
    pub fn shared_objects(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        let pages: HashSet<ObjectId> = self.page_ids.iter().copied().collect();

        self.doc.objects.iter().filter(move |(id, object)| {
            if pages.contains(*id) {
                return false;
            }
            !matches!(
                object.type_name().unwrap_or(b""),
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" | b"ObjStm" | b"XRef"
            )
        })
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("path", &self.path)
            .field("page_count", &self.page_ids.len())
            .field("was_encrypted", &self.was_encrypted)
            .finish()
    }
}
