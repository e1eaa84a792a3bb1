//! Merging per-page overlay PDFs into a single document.

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Combine single-page overlay PDFs into one document, preserving order.
///
/// Overlay pages are self-contained documents produced by
/// [`super::canvas::PdfCanvas`]; their page objects are lifted into a new
/// shared page tree.
pub fn combine_overlay_pages(pages: &[Vec<u8>]) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(Error::OverlayCreate("No pages to combine".to_string()));
    }

    if pages.len() == 1 {
        return Ok(pages[0].clone());
    }

    let mut max_id: u32 = 1;
    let mut documents_pages: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut documents_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut document = Document::with_version("1.5");

    for (i, page_bytes) in pages.iter().enumerate() {
        let mut doc = Document::load_mem(page_bytes)
            .map_err(|e| Error::Lopdf(format!("Failed to load page {}: {}", i + 1, e)))?;

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let source_pages = doc.get_pages();
        for &page_id in source_pages.values() {
            if let Ok(page_obj) = doc.get_object(page_id) {
                documents_pages.insert(page_id, page_obj.clone());
            }
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" => {}
                _ => {
                    documents_objects.insert(object_id, object);
                }
            }
        }
    }

    for (object_id, object) in documents_objects {
        document.objects.insert(object_id, object);
    }

    let pages_id = document.new_object_id();

    for (obj_id, object) in &documents_pages {
        if let Object::Dictionary(dict) = object {
            let mut new_dict = dict.clone();
            new_dict.set("Parent", Object::Reference(pages_id));
            document.objects.insert(*obj_id, Object::Dictionary(new_dict));
        }
    }

    let kids: Vec<Object> = documents_pages
        .keys()
        .map(|&id| Object::Reference(id))
        .collect();

    #[allow(clippy::cast_possible_truncation)]
    let total_pages = documents_pages.len() as u32;

    let pages_dict_obj = lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(i64::from(total_pages))),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict_obj));

    let catalog_id = document.new_object_id();
    let catalog_dict_obj = lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    document.objects.insert(catalog_id, Object::Dictionary(catalog_dict_obj));

    document.trailer.set("Root", Object::Reference(catalog_id));

    #[allow(clippy::cast_possible_truncation)]
    let new_max_id = document.objects.len() as u32;
    document.max_id = new_max_id;

    document.renumber_objects();
    document.compress();

    let mut output = Vec::new();
    document.save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save combined PDF: {e}")))?;

    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layout::PageSize;
    use crate::overlay::canvas::PdfCanvas;

    fn overlay_page(width: f32, height: f32) -> Vec<u8> {
        PdfCanvas::empty_page(PageSize::new(width, height)).unwrap()
    }

    #[test]
    fn test_combine_empty_fails() {
        assert!(combine_overlay_pages(&[]).is_err());
    }

    #[test]
    fn test_combine_single_is_identity() {
        let page = overlay_page(612.0, 792.0);
        let result = combine_overlay_pages(std::slice::from_ref(&page)).unwrap();
        assert_eq!(result, page);
    }

    #[test]
    fn test_combine_multiple_pages() {
        let pages = vec![
            overlay_page(612.0, 792.0),
            overlay_page(612.0, 792.0),
            overlay_page(595.0, 842.0),
        ];

        let combined = combine_overlay_pages(&pages).unwrap();
        let doc = Document::load_mem(&combined).unwrap();
        assert_eq!(doc.get_pages().len(), 3, "Combined PDF should have 3 pages");
    }
}
