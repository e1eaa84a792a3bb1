//! TrueType font discovery and embedding for overlay text.
//!
//! Overlay text is Arabic, so the built-in PDF fonts are useless: shaped
//! presentation forms only exist in fonts with real Arabic coverage. Fonts
//! are discovered from an ordered candidate list at runtime (Amiri first,
//! FreeSans as fallback) and embedded as a CIDFont with Identity-H
//! encoding, which lets any glyph the font carries be addressed directly.
//!
//! # PDF Font Structure
//!
//! - **Type0 font**: the top-level font dictionary that references:
//!   - **CIDFont**: glyph metrics, referencing:
//!     - **FontDescriptor**: font metadata (flags, bounding box, etc.)
//!     - **FontFile2**: the embedded TrueType font program
//!   - **ToUnicode CMap**: maps glyph IDs back to Unicode for copy/paste
//!
//! `ttf_parser::Face` borrows the font bytes, so everything the overlay
//! needs (codepoint map, advances, vertical metrics) is extracted once at
//! load time instead of holding a live `Face`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use lopdf::{Document, Object, ObjectId, Stream};
use ttf_parser::{Face, GlyphId};
use tracing::{debug, warn};

use crate::config::FontConfig;
use crate::error::{Error, Result};

/// Logical resource name the overlay font is registered under.
pub const FONT_RESOURCE_NAME: &str = "FArabic";

/// Character ranges whose widths are written into the CIDFont W array.
/// Latin for mixed-script fragments, Arabic plus both presentation-form
/// blocks for shaped output.
const WIDTH_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007E), // Basic Latin (ASCII printable)
    (0x00A0, 0x00FF), // Latin-1 Supplement
    (0x0600, 0x06FF), // Arabic
    (0x0750, 0x077F), // Arabic Supplement
    (0x2000, 0x206F), // General Punctuation (smart quotes, dashes, etc.)
    (0xFB50, 0xFDFF), // Arabic Presentation Forms-A
    (0xFE70, 0xFEFF), // Arabic Presentation Forms-B
];

/// A loaded overlay font with precomputed tables.
pub struct OverlayFont {
    data: Vec<u8>,
    path: PathBuf,
    base_name: String,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// codepoint -> glyph ID
    glyph_ids: HashMap<u32, u16>,
    /// horizontal advance per glyph ID, in font units
    advances: Vec<u16>,
}

impl OverlayFont {
    /// Load and parse a font file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::FontLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let face = Face::parse(&data, 0).map_err(|e| Error::FontLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut glyph_ids = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(gid) = subtable.glyph_index(cp) {
                        glyph_ids.entry(cp).or_insert(gid.0);
                    }
                });
            }
        }

        let glyph_count = face.number_of_glyphs();
        let advances = (0..glyph_count)
            .map(|gid| face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0))
            .collect();

        let rect = face.global_bounding_box();

        Ok(Self {
            base_name: base_name_for(path),
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height().unwrap_or_else(|| face.ascender()),
            bbox: [rect.x_min, rect.y_min, rect.x_max, rect.y_max],
            glyph_ids,
            advances,
            data,
            path: path.to_path_buf(),
        })
    }

    /// Try the configured candidate paths in order; first parseable font
    /// wins. Total failure is a warning, not an error: the overlay still
    /// renders, glyphs just may come out wrong.
    pub fn discover(config: &FontConfig) -> Option<Self> {
        for path in &config.paths {
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(font) => {
                    debug!("Loaded overlay font: {}", path.display());
                    return Some(font);
                }
                Err(e) => {
                    warn!("Skipping font {}: {}", path.display(), e);
                }
            }
        }

        warn!("No usable Arabic font found; overlay glyphs may render incorrectly");
        None
    }

    /// Path the font was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the glyph ID for a character, falling back to .notdef (0).
    pub fn glyph_id(&self, c: char) -> u16 {
        self.glyph_ids.get(&(c as u32)).copied().unwrap_or(0)
    }

    /// Get the advance width of a glyph in font units.
    pub fn glyph_width(&self, glyph_id: u16) -> u16 {
        self.advances.get(usize::from(glyph_id)).copied().unwrap_or(0)
    }

    pub const fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Calculate the width of a string in page units at the given font size.
    #[allow(clippy::cast_precision_loss)]
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let units_per_em = f32::from(self.units_per_em);
        let total_units: u32 = text
            .chars()
            .map(|c| u32::from(self.glyph_width(self.glyph_id(c))))
            .sum();
        total_units as f32 * font_size / units_per_em
    }

    /// Convert text to a hex string of glyph IDs for PDF content streams.
    /// Returns the hex string without angle brackets.
    pub fn text_to_hex_glyphs(&self, text: &str) -> String {
        use std::fmt::Write;
        text.chars().fold(String::new(), |mut acc, c| {
            let _ = write!(acc, "{:04X}", self.glyph_id(c));
            acc
        })
    }

    /// Embed this font into a PDF document and register it on the page's
    /// resources under [`FONT_RESOURCE_NAME`].
    ///
    /// Registration is idempotent: if the page already carries a font under
    /// that name, nothing is added.
    pub fn embed_in_document(&self, doc: &mut Document, page_id: ObjectId) -> Result<()> {
        let mut resources = resolve_resources(doc, page_id)?;

        let mut fonts = match resources.get(b"Font") {
            Ok(obj) => resolve_dict_object(doc, obj).unwrap_or_default(),
            Err(_) => lopdf::Dictionary::new(),
        };

        if fonts.has(FONT_RESOURCE_NAME.as_bytes()) {
            return Ok(());
        }

        let font_file_id = self.create_font_file(doc);
        let font_descriptor_id = self.create_font_descriptor(doc, font_file_id);
        let cid_font_id = self.create_cid_font(doc, font_descriptor_id);
        let to_unicode_id = create_to_unicode_cmap(doc);
        let type0_font_id = self.create_type0_font(doc, cid_font_id, to_unicode_id);

        fonts.set(FONT_RESOURCE_NAME, Object::Reference(type0_font_id));
        resources.set("Font", Object::Dictionary(fonts));

        let page = doc
            .get_object_mut(page_id)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

        if let Object::Dictionary(page_dict) = page {
            page_dict.set("Resources", Object::Dictionary(resources));
        }

        Ok(())
    }

    /// Create the FontFile2 stream containing the raw TrueType data.
    #[allow(clippy::cast_possible_wrap)] // Font size always fits in i64
    fn create_font_file(&self, doc: &mut Document) -> ObjectId {
        let mut dict = lopdf::Dictionary::new();
        dict.set("Length1", Object::Integer(self.data.len() as i64));

        let stream = Stream::new(dict, self.data.clone()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    /// Create the FontDescriptor dictionary with font metrics.
    fn create_font_descriptor(&self, doc: &mut Document, font_file_id: ObjectId) -> ObjectId {
        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(self.base_name.clone().into_bytes())),
            (
                "FontFamily",
                Object::String(
                    self.base_name.clone().into_bytes(),
                    lopdf::StringFormat::Literal,
                ),
            ),
            ("Flags", Object::Integer(32)), // Nonsymbolic
            (
                "FontBBox",
                Object::Array(vec![
                    Object::Integer(i64::from(self.bbox[0])),
                    Object::Integer(i64::from(self.bbox[1])),
                    Object::Integer(i64::from(self.bbox[2])),
                    Object::Integer(i64::from(self.bbox[3])),
                ]),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(self.ascender))),
            ("Descent", Object::Integer(i64::from(self.descender))),
            ("CapHeight", Object::Integer(i64::from(self.cap_height))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Create the CIDFont dictionary with per-glyph width information.
    fn create_cid_font(&self, doc: &mut Document, font_descriptor_id: ObjectId) -> ObjectId {
        // Build the W (widths) array for proper character spacing
        let widths_array = self.build_widths_array();

        // Default width for any glyph not in the W array (use space width)
        let default_width = self.scale_width(self.glyph_width(self.glyph_id(' ')));

        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.base_name.clone().into_bytes())),
            (
                "CIDSystemInfo",
                Object::Dictionary(lopdf::Dictionary::from_iter([
                    (
                        "Registry",
                        Object::String(b"Adobe".to_vec(), lopdf::StringFormat::Literal),
                    ),
                    (
                        "Ordering",
                        Object::String(b"Identity".to_vec(), lopdf::StringFormat::Literal),
                    ),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(font_descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(widths_array)),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Scale a font-unit width to PDF's 1000-unit system.
    fn scale_width(&self, width: u16) -> i64 {
        let units_per_em = i64::from(self.units_per_em).max(1);
        (i64::from(width) * 1000) / units_per_em
    }

    /// Build the W (widths) array for CIDFont.
    /// The W array format is: [gid [w1 w2 ...]] for consecutive GIDs.
    fn build_widths_array(&self) -> Vec<Object> {
        // Collect (GID -> scaled_width) for all characters we care about
        let mut gid_widths: BTreeMap<u16, i64> = BTreeMap::new();

        for &(start, end) in WIDTH_RANGES {
            for codepoint in start..=end {
                if let Some(&gid) = self.glyph_ids.get(&codepoint)
                    && gid != 0
                {
                    gid_widths.insert(gid, self.scale_width(self.glyph_width(gid)));
                }
            }
        }

        // Build W array from sorted GIDs, grouping consecutive runs
        let mut result = Vec::new();
        let mut iter = gid_widths.iter().peekable();

        while let Some((&first_gid, &first_width)) = iter.next() {
            let mut widths = vec![Object::Integer(first_width)];
            let mut expected_next = first_gid + 1;

            while let Some(&(&gid, &width)) = iter.peek() {
                if gid == expected_next {
                    widths.push(Object::Integer(width));
                    expected_next += 1;
                    iter.next();
                } else {
                    break;
                }
            }

            result.push(Object::Integer(i64::from(first_gid)));
            result.push(Object::Array(widths));
        }

        result
    }

    /// Create the Type0 (composite) font dictionary.
    fn create_type0_font(
        &self,
        doc: &mut Document,
        cid_font_id: ObjectId,
        to_unicode_id: ObjectId,
    ) -> ObjectId {
        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.base_name.clone().into_bytes())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            (
                "DescendantFonts",
                Object::Array(vec![Object::Reference(cid_font_id)]),
            ),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFont")
            .field("path", &self.path)
            .field("base_name", &self.base_name)
            .field("units_per_em", &self.units_per_em)
            .field("glyph_count", &self.advances.len())
            .finish()
    }
}

/// PDF font name derived from the file stem, restricted to name-safe chars.
fn base_name_for(path: &Path) -> String {
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if stem.is_empty() {
        "OverlayFont".to_string()
    } else {
        stem
    }
}

/// Create a ToUnicode CMap for text extraction/copy-paste support.
///
/// A simplified Identity CMap that maps glyph IDs directly to Unicode.
fn create_to_unicode_cmap(doc: &mut Document) -> ObjectId {
    let cmap = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo <<
  /Registry (Adobe)
  /Ordering (UCS)
  /Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0000> <FFFF> <0000>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    let stream = Stream::new(lopdf::Dictionary::new(), cmap.to_vec());
    doc.add_object(Object::Stream(stream))
}

/// Resolve a page's Resources dictionary, handling inline dictionaries and
/// indirect references. Overlay pages are generated by this crate, so there
/// is no parent tree to inherit from; a missing dictionary is just empty.
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<lopdf::Dictionary> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(page_dict) = page
        && let Ok(res_obj) = page_dict.get(b"Resources")
        && let Some(dict) = resolve_dict_object(doc, res_obj)
    {
        return Ok(dict);
    }

    Ok(lopdf::Dictionary::new())
}

/// Resolve an object that should be a Dictionary (handles References).
fn resolve_dict_object(doc: &Document, obj: &Object) -> Option<lopdf::Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(ref_id) => {
            if let Ok(Object::Dictionary(d)) = doc.get_object(*ref_id) {
                Some(d.clone())
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_discover_with_no_candidates() {
        let config = FontConfig {
            size: 14.0,
            paths: vec![PathBuf::from("/nonexistent/font.ttf")],
        };
        assert!(OverlayFont::discover(&config).is_none());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a font").unwrap();
        let result = OverlayFont::from_file(file.path());
        assert!(matches!(result, Err(Error::FontLoad { .. })));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_discover_skips_unparseable_candidate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"garbage").unwrap();
        let config = FontConfig {
            size: 14.0,
            paths: vec![file.path().to_path_buf()],
        };
        assert!(OverlayFont::discover(&config).is_none());
    }

    #[test]
    fn test_base_name_sanitized() {
        assert_eq!(
            base_name_for(Path::new("/fonts/Amiri-Regular.ttf")),
            "AmiriRegular"
        );
        assert_eq!(base_name_for(Path::new("")), "OverlayFont");
    }
}
