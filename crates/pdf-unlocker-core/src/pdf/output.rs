use std::io::Write;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::source::SourceDocument;
use crate::error::{Error, Result};

/// A new, unencrypted document assembled page by page from a source.
///
/// Object ids are kept from the source so that annotations and link
/// destinations that point at pages remain valid; they are renumbered only
/// when the document is saved.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl OutputDocument {
    /// Start an empty document carrying the source's shared objects (fonts,
    /// images, content streams, metadata).
    pub fn new(source: &SourceDocument) -> Self {
        let mut doc = Document::with_version(source.version());

        for (id, object) in source.shared_objects() {
            doc.objects.insert(*id, object.clone());
        }
        doc.max_id = source.max_id();

        if let Some(info_id) = source.info_id() {
            if doc.objects.contains_key(&info_id) {
                doc.trailer.set("Info", Object::Reference(info_id));
            }
        }

        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            kids: Vec::with_capacity(source.page_count()),
        }
    }

    /// Append page `id` of `source` after the pages appended so far.
    pub fn append_page(&mut self, source: &SourceDocument, id: ObjectId) -> Result<()> {
        let mut page = source.page(id)?;
        page.set("Parent", Object::Reference(self.pages_id));

        self.doc.objects.insert(id, Object::Dictionary(page));
        self.kids.push(id);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Finish the page tree and write the document to `path`.
    ///
    /// The bytes go to a temporary file in the destination directory which is
    /// then renamed over `path`, so an existing file is replaced in one step
    /// and a failed save leaves nothing behind.
    pub fn save(self, path: &Path, compress: bool) -> Result<()> {
        let bytes = self.into_bytes(compress)?;
        debug!("Serialised {} bytes for {}", bytes.len(), path.display());
        write_atomically(path, &bytes)
    }

    fn into_bytes(mut self, compress: bool) -> Result<Vec<u8>> {
        let count = i64::try_from(self.kids.len())
            .map_err(|_| Error::Save("too many pages".to_string()))?;
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();

        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        // Drop whatever only the discarded catalog or outlines referred to
        self.doc.prune_objects();
        self.doc.renumber_objects();
        if compress {
            self.doc.compress();
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::Save(format!("failed to serialise document: {e}")))?;
        Ok(output)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let save_err = |e: &dyn std::fmt::Display| Error::Save(format!("{}: {e}", path.display()));

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".pdf-unlock-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| save_err(&e))?;

    tmp.write_all(bytes).map_err(|e| save_err(&e))?;
    tmp.as_file().sync_all().map_err(|e| save_err(&e))?;
    tmp.persist(path).map_err(|e| save_err(&e.error))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::testing::{build_pdf, build_pdf_with_inherited_resources, page_texts};

    fn open_fixture(dir: &Path, doc: Document) -> SourceDocument {
        let path = dir.join("source.pdf");
        let mut doc = doc;
        doc.save(&path).unwrap();
        SourceDocument::open(&path, "").unwrap()
    }

    #[test]
    fn test_pages_keep_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_fixture(dir.path(), build_pdf(&["first", "second", "third"]));

        let mut output = OutputDocument::new(&source);
        for &id in source.page_ids() {
            output.append_page(&source, id).unwrap();
        }
        assert_eq!(output.page_count(), 3);

        let out_path = dir.path().join("out.pdf");
        output.save(&out_path, true).unwrap();

        let saved = Document::load(&out_path).unwrap();
        assert_eq!(page_texts(&saved), vec!["first", "second", "third"]);
        assert!(!saved.is_encrypted());
    }

    #[test]
    fn test_empty_document_saves() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_fixture(dir.path(), build_pdf(&[]));

        let output = OutputDocument::new(&source);
        let out_path = dir.path().join("empty.pdf");
        output.save(&out_path, false).unwrap();

        let saved = Document::load(&out_path).unwrap();
        assert!(saved.get_pages().is_empty());
    }

    #[test]
    fn test_inherited_resources_survive() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_fixture(dir.path(), build_pdf_with_inherited_resources(&["x", "y"]));

        let mut output = OutputDocument::new(&source);
        for &id in source.page_ids() {
            output.append_page(&source, id).unwrap();
        }
        let out_path = dir.path().join("out.pdf");
        output.save(&out_path, true).unwrap();

        let saved = Document::load(&out_path).unwrap();
        for id in saved.get_pages().into_values() {
            let page = saved.get_dictionary(id).unwrap();
            assert!(page.has(b"Resources"));
            assert!(page.has(b"MediaBox"));
        }
        assert_eq!(page_texts(&saved), vec!["x", "y"]);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_fixture(dir.path(), build_pdf(&["only"]));
        let out_path = dir.path().join("out.pdf");
        std::fs::write(&out_path, b"stale").unwrap();

        let mut output = OutputDocument::new(&source);
        output.append_page(&source, source.page_ids()[0]).unwrap();
        output.save(&out_path, true).unwrap();

        let saved = Document::load(&out_path).unwrap();
        assert_eq!(saved.get_pages().len(), 1);
    }

    #[test]
    fn test_save_into_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_fixture(dir.path(), build_pdf(&["only"]));
        let blocked = dir.path().join("blocked.pdf");
        std::fs::create_dir(&blocked).unwrap();

        let output = OutputDocument::new(&source);
        let err = output.save(&blocked, true).unwrap_err();
        assert!(matches!(err, Error::Save(_)));
    }
}
