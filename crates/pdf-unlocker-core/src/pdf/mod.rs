mod output;
mod source;

pub use output::OutputDocument;
pub use source::SourceDocument;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    //! Small generated PDFs for unit tests: one text line per page.

    use lopdf::content::{Content, Operation};
    use lopdf::{
        Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions,
        Stream, StringFormat,
    };

    fn font_resources(doc: &mut Document) -> ObjectId {
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));

        doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]))
    }

    fn text_stream(doc: &mut Document, text: &str) -> ObjectId {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let bytes = content.encode().unwrap_or_default();
        doc.add_object(Stream::new(Dictionary::new(), bytes))
    }

    fn media_box() -> Object {
        Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])
    }

    fn finish(doc: &mut Document, pages_id: ObjectId, pages: Dictionary) {
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
    }

    /// A flat page tree, each page carrying its own resources.
    pub fn build_pdf(texts: &[&str]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let resources_id = font_resources(&mut doc);

        let kids: Vec<Object> = texts
            .iter()
            .map(|text| {
                let content_id = text_stream(&mut doc, text);
                let page_id = doc.add_object(Dictionary::from_iter([
                    ("Type", Object::Name(b"Page".to_vec())),
                    ("Parent", Object::Reference(pages_id)),
                    ("Contents", Object::Reference(content_id)),
                    ("Resources", Object::Reference(resources_id)),
                    ("MediaBox", media_box()),
                ]));
                Object::Reference(page_id)
            })
            .collect();

        let count = i64::try_from(kids.len()).unwrap_or_default();
        finish(
            &mut doc,
            pages_id,
            Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ]),
        );
        doc
    }

    /// Pages nested one level below the root, with `Resources` and
    /// `MediaBox` only on the root node.
    pub fn build_pdf_with_inherited_resources(texts: &[&str]) -> Document {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let branch_id = doc.new_object_id();
        let resources_id = font_resources(&mut doc);

        let kids: Vec<Object> = texts
            .iter()
            .map(|text| {
                let content_id = text_stream(&mut doc, text);
                let page_id = doc.add_object(Dictionary::from_iter([
                    ("Type", Object::Name(b"Page".to_vec())),
                    ("Parent", Object::Reference(branch_id)),
                    ("Contents", Object::Reference(content_id)),
                ]));
                Object::Reference(page_id)
            })
            .collect();

        let count = i64::try_from(kids.len()).unwrap_or_default();
        doc.objects.insert(
            branch_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Parent", Object::Reference(root_id)),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );

        finish(
            &mut doc,
            root_id,
            Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(branch_id)])),
                ("Count", Object::Integer(count)),
                ("Resources", Object::Reference(resources_id)),
                ("MediaBox", media_box()),
            ]),
        );
        doc
    }

    /// Encrypt `doc` in place with RC4-128, owner password "owner".
    pub fn encrypt(doc: &mut Document, user_password: &str) {
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(vec![1u8; 16], StringFormat::Literal),
                Object::String(vec![2u8; 16], StringFormat::Literal),
            ]),
        );
        let version = EncryptionVersion::V2 {
            document: &*doc,
            owner_password: "owner",
            user_password,
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        doc.encrypt(&state).unwrap();
    }

    /// The `Tj` string of every page, in page order.
    pub fn page_texts(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let bytes = doc.get_page_content(page_id).unwrap_or_default();
                let content = Content::decode(&bytes).unwrap_or(Content { operations: vec![] });
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| match op.operands.first() {
                        Some(Object::String(text, _)) => Some(String::from_utf8_lossy(text).into_owned()),
                        _ => None,
                    })
                    .collect::<String>()
            })
            .collect()
    }
}
