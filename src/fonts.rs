use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::OnceLock;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

/// Characters outside WinAnsi that reports commonly print. Their widths are
/// cached up front alongside the WinAnsi range.
const EXTRA_CHARS: &[char] = &['≥', '≤', '–', '—', '±', 'µ', '°', '×', '·', '…'];

enum FaceSource {
    /// One of the 14 standard PDF fonts; never embedded.
    Builtin(&'static str),
    TrueType { data: Vec<u8>, face_index: u32 },
}

/// Metrics of one concrete face. Used both to measure content and, by the
/// PDF printer, to draw it, so what was measured is what gets printed.
pub struct FontFace {
    pub family: String,
    pub bold: bool,
    source: FaceSource,
    char_widths_1000: HashMap<char, f32>,
    line_h_ratio: f32,
    ascender_ratio: f32,
}

impl FontFace {
    pub fn builtin(bold: bool) -> Self {
        let widths = if bold {
            helvetica_bold_widths()
        } else {
            helvetica_widths()
        };
        let char_widths_1000 = (32u8..=255u8)
            .zip(widths)
            .map(|(b, w)| (winansi_to_char(b), w))
            .collect();
        Self {
            family: "Helvetica".to_string(),
            bold,
            source: FaceSource::Builtin(if bold { "Helvetica-Bold" } else { "Helvetica" }),
            char_widths_1000,
            line_h_ratio: 1.2,
            ascender_ratio: 0.75,
        }
    }

    fn from_truetype(family: &str, bold: bool, data: Vec<u8>, face_index: u32) -> Option<Self> {
        let (char_widths_1000, line_h_ratio, ascender_ratio) = {
            let face = Face::parse(&data, face_index).ok()?;
            let units = face.units_per_em() as f32;
            let mut widths = HashMap::new();
            for ch in (32u8..=255u8).map(winansi_to_char).chain(EXTRA_CHARS.iter().copied()) {
                if let Some(adv) = face.glyph_index(ch).and_then(|gid| face.glyph_hor_advance(gid)) {
                    widths.insert(ch, adv as f32 / units * 1000.0);
                }
            }
            let line_gap = face.line_gap() as f32;
            (
                widths,
                (face.ascender() as f32 - face.descender() as f32 + line_gap) / units,
                face.ascender() as f32 / units,
            )
        };

        Some(Self {
            family: family.to_string(),
            bold,
            source: FaceSource::TrueType { data, face_index },
            char_widths_1000,
            line_h_ratio,
            ascender_ratio,
        })
    }

    /// Load the first available family out of `;`-separated candidates,
    /// falling back to the built-in Helvetica metrics.
    pub fn load(families: &str, bold: bool) -> Self {
        let t0 = std::time::Instant::now();
        for candidate in families.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((path, face_index)) = find_font_file(candidate, bold) else {
                continue;
            };
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            if let Some(face) = Self::from_truetype(candidate, bold, data, face_index) {
                log::debug!(
                    "Loaded font {candidate} bold={bold} from {} in {:.1}ms",
                    path.display(),
                    t0.elapsed().as_secs_f64() * 1000.0,
                );
                return face;
            }
        }
        log::warn!("Font not found: {families} bold={bold}, using Helvetica");
        Self::builtin(bold)
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, FaceSource::Builtin(_))
    }

    /// Width of a single character in 1000-units.
    pub fn char_width_1000(&self, ch: char) -> f32 {
        if let Some(&w) = self.char_widths_1000.get(&ch) {
            return w;
        }
        if let FaceSource::TrueType { data, face_index } = &self.source
            && let Ok(face) = Face::parse(data, *face_index)
            && let Some(adv) = face.glyph_index(ch).and_then(|gid| face.glyph_hor_advance(gid))
        {
            return adv as f32 / face.units_per_em() as f32 * 1000.0;
        }
        // Unmapped chars are dropped when drawn with a builtin font
        0.0
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.display_text(text)
            .chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub fn space_width(&self, font_size: f32) -> f32 {
        self.char_width_1000(' ') * font_size / 1000.0
    }

    pub fn line_height(&self, font_size: f32, spacing: f32) -> f32 {
        font_size * self.line_h_ratio * spacing
    }

    pub fn ascent(&self, font_size: f32) -> f32 {
        font_size * self.ascender_ratio
    }

    /// Text as it will actually be drawn. Builtin fonts are limited to
    /// WinAnsi, so comparison signs are spelled out.
    pub fn display_text<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.is_builtin() && text.contains(['≥', '≤']) {
            Cow::Owned(text.replace('≥', ">=").replace('≤', "<="))
        } else {
            Cow::Borrowed(text)
        }
    }
}

/// The regular and bold faces of the report font.
pub struct FontSet {
    pub regular: FontFace,
    pub bold: FontFace,
}

impl FontSet {
    pub fn load(families: &str) -> Self {
        Self {
            regular: FontFace::load(families, false),
            bold: FontFace::load(families, true),
        }
    }

    /// Helvetica metrics only; deterministic regardless of installed fonts.
    pub fn builtin() -> Self {
        Self {
            regular: FontFace::builtin(false),
            bold: FontFace::builtin(true),
        }
    }

    pub fn face(&self, bold: bool) -> &FontFace {
        if bold { &self.bold } else { &self.regular }
    }
}

/// (lowercase family name, bold) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool), (PathBuf, u32)>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_family_name(face: &Face) -> Option<String> {
    // ID 1 (Family), not ID 16, so "Arial Narrow" does not collide with "Arial"
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn read_font_style(data: &[u8], face_index: u32) -> Option<(String, bool)> {
    let face = Face::parse(data, face_index).ok()?;
    if face.is_italic() {
        return None;
    }
    let family = font_family_name(&face)?;
    Some((family, face.is_bold()))
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(val) = std::env::var("LABPRINT_FONTS") {
        dirs.extend(std::env::split_paths(&val).filter(|p| !p.as_os_str().is_empty()));
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(&home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &std::path::Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn scan_font_dirs() -> FontLookup {
    let t0 = std::time::Instant::now();
    let mut index = FontLookup::new();
    let mut files_scanned = 0u32;
    let mut visited: HashSet<PathBuf> = HashSet::new();

    let mut stack = font_directories();
    while let Some(dir) = stack.pop() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            files_scanned += 1;
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            let face_count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
            for face_idx in 0..face_count {
                if let Some((family, bold)) = read_font_style(&data, face_idx) {
                    index
                        .entry((family.to_lowercase(), bold))
                        .or_insert((path.clone(), face_idx));
                }
            }
        }
    }

    log::info!(
        "Font scan: {:.1}ms, {} files parsed → {} entries",
        t0.elapsed().as_secs_f64() * 1000.0,
        files_scanned,
        index.len(),
    );
    index
}

/// Look up a font file by family name. Falls back to the regular face when
/// no bold face is installed.
fn find_font_file(family: &str, bold: bool) -> Option<(PathBuf, u32)> {
    let index = FONT_INDEX.get_or_init(scan_font_dirs);
    let key = family.to_lowercase();
    index
        .get(&(key.clone(), bold))
        .or_else(|| if bold { index.get(&(key, false)) } else { None })
        .cloned()
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Unmappable characters are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match c as u32 {
            0x0020..=0x007E | 0x00A0..=0x00FF => Some(c as u8),
            _ => (0x80u8..=0x9F).find(|&b| winansi_to_char(b) == c),
        })
        .collect()
}

/// Encode UTF-8 text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths, same layout as `helvetica_widths`.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            65..=90 => 722.0,
            91..=96 => 333.0,
            105 | 106 | 108 => 278.0,
            102 | 116 => 333.0,
            109 => 889.0,
            119 => 778.0,
            97..=122 => 611.0,
            _ => 611.0,
        })
        .collect()
}

/// A face registered in a PDF document.
pub(crate) struct PdfFont {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    /// Present for embedded CID fonts; builtin fonts use WinAnsi encoding.
    pub(crate) char_to_gid: Option<HashMap<char, u16>>,
}

impl PdfFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to only include glyphs used in the document.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    ps_name: &str,
    font_data: &[u8],
    face_index: u32,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<HashMap<char, u16>> {
    let face = Face::parse(font_data, face_index).ok()?;
    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut char_to_gid = HashMap::new();
    let mut gid_widths: Vec<(u16, f32)> = Vec::new();
    for &ch in used_chars {
        if let Some(gid) = face.glyph_index(ch) {
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            gid_widths.push((new_gid, w));
        }
    }
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|&mut (gid, _)| gid);

    let subset_data = subsetter::subset(font_data, face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {ps_name}: {e}, embedding full font");
        font_data.to_vec()
    });

    let data_ref = alloc();
    let descriptor_ref = alloc();
    let cid_font_ref = alloc();
    let tounicode_ref = alloc();

    let data_len = i32::try_from(subset_data.len()).ok()?;
    pdf.stream(data_ref, &subset_data).pair(Name(b"Length1"), data_len);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&ch, &new_gid) in &char_to_gid {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Some(char_to_gid)
}

pub(crate) fn register_font(
    pdf: &mut Pdf,
    face: &FontFace,
    pdf_name: String,
    used_chars: &HashSet<char>,
    alloc: &mut impl FnMut() -> Ref,
) -> PdfFont {
    let font_ref = alloc();
    let embedded = match &face.source {
        FaceSource::TrueType { data, face_index } => {
            let ps_name = format!(
                "{}{}",
                face.family.replace(' ', ""),
                if face.bold { "-Bold" } else { "" }
            );
            embed_truetype(pdf, font_ref, &ps_name, data, *face_index, used_chars, alloc)
        }
        FaceSource::Builtin(_) => None,
    };

    let char_to_gid = embedded.or_else(|| {
        let base = match &face.source {
            FaceSource::Builtin(name) => *name,
            FaceSource::TrueType { .. } => {
                log::warn!("Embedding {} failed, drawing with Helvetica", face.family);
                if face.bold { "Helvetica-Bold" } else { "Helvetica" }
            }
        };
        pdf.type1_font(font_ref)
            .base_font(Name(base.as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        None
    });

    PdfFont {
        pdf_name,
        font_ref,
        char_to_gid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_widths() {
        let f = FontFace::builtin(false);
        assert_eq!(f.char_width_1000(' '), 278.0);
        assert!((f.text_width("10", 10.0) - 11.12).abs() < 0.001);
        assert!(FontFace::builtin(true).text_width("abc", 10.0) > f.text_width("abc", 10.0));
    }

    #[test]
    fn builtin_spells_out_comparisons() {
        let f = FontFace::builtin(false);
        assert_eq!(f.display_text("≥ 70"), ">= 70");
        assert!((f.text_width("≤ 5", 9.0) - f.text_width("<= 5", 9.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn winansi_encoding() {
        assert_eq!(to_winansi_bytes("a–b"), vec![b'a', 0x96, b'b']);
        assert_eq!(to_winansi_bytes("µg"), vec![0xB5, b'g']);
        assert_eq!(to_winansi_bytes("≥"), Vec::<u8>::new());
    }
}
