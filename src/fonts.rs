use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;
use crate::measure::{MeasuredText, TextMeasurer, check_args, wrap_text};
use crate::model::{FontWeight, TextStyle};

const BUILTIN_LINE_H_RATIO: f32 = 1.2;
const BUILTIN_ASCENDER_RATIO: f32 = 0.718;

enum FontData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl FontData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            FontData::Mapped(m) => &m[..],
            FontData::Owned(v) => v.as_slice(),
        }
    }
}

enum FaceSource {
    /// One of the standard 14 Type1 fonts, drawn with WinAnsi encoding.
    Builtin { base_font: &'static str },
    TrueType {
        data: FontData,
        index: u32,
        ps_name: String,
    },
}

/// A single font face with the metrics layout needs.
pub struct FontFace {
    source: FaceSource,
    /// WinAnsi advances for bytes 32..=255 in 1000-units.
    widths_1000: Vec<f32>,
    pub(crate) line_h_ratio: f32,
    pub(crate) ascender_ratio: f32,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("name", &self.name())
            .field("line_h_ratio", &self.line_h_ratio)
            .field("ascender_ratio", &self.ascender_ratio)
            .finish()
    }
}

impl FontFace {
    /// Built-in Helvetica (or Helvetica-Bold) with approximate AFM widths.
    pub fn helvetica(bold: bool) -> Self {
        Self {
            source: FaceSource::Builtin {
                base_font: if bold { "Helvetica-Bold" } else { "Helvetica" },
            },
            widths_1000: helvetica_widths(bold),
            line_h_ratio: BUILTIN_LINE_H_RATIO,
            ascender_ratio: BUILTIN_ASCENDER_RATIO,
        }
    }

    pub fn from_file(path: &Path, index: u32) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        // Read-only mapping; the file must not be truncated while in use.
        let data = unsafe { Mmap::map(&file) }?;
        Self::from_data(FontData::Mapped(data), index)
            .map_err(|e| Error::Font(format!("{}: {e}", path.display())))
    }

    pub fn from_bytes(data: Vec<u8>, index: u32) -> Result<Self, Error> {
        Self::from_data(FontData::Owned(data), index).map_err(Error::Font)
    }

    fn from_data(data: FontData, index: u32) -> Result<Self, String> {
        let (widths_1000, line_h_ratio, ascender_ratio, ps_name) = {
            let face = Face::parse(data.as_bytes(), index)
                .map_err(|e| format!("unreadable font face: {e}"))?;
            let units = face.units_per_em() as f32;
            let widths: Vec<f32> = (32u8..=255u8)
                .map(|byte| {
                    face.glyph_index(winansi_to_char(byte))
                        .and_then(|gid| face.glyph_hor_advance(gid))
                        .map(|adv| adv as f32 / units * 1000.0)
                        .unwrap_or(0.0)
                })
                .collect();
            let line_gap = face.line_gap() as f32;
            let line_h_ratio =
                (face.ascender() as f32 - face.descender() as f32 + line_gap) / units;
            let ascender_ratio = face.ascender() as f32 / units;
            let ps_name = font_family_name(&face)
                .unwrap_or_else(|| "EmbeddedFont".to_string())
                .replace(' ', "");
            let ps_name = if face.is_bold() {
                format!("{ps_name}-Bold")
            } else {
                ps_name
            };
            (widths, line_h_ratio, ascender_ratio, ps_name)
        };

        Ok(Self {
            source: FaceSource::TrueType {
                data,
                index,
                ps_name,
            },
            widths_1000,
            line_h_ratio,
            ascender_ratio,
        })
    }

    pub fn name(&self) -> &str {
        match &self.source {
            FaceSource::Builtin { base_font } => *base_font,
            FaceSource::TrueType { ps_name, .. } => ps_name.as_str(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, FaceSource::Builtin { .. })
    }

    fn winansi_width_1000(&self, ch: char) -> Option<f32> {
        let byte = char_to_winansi(ch);
        (byte >= 32).then(|| self.widths_1000[(byte - 32) as usize])
    }

    /// Run `f` with a per-character advance function (1000-units). Embedded
    /// faces resolve characters outside WinAnsi through the font's cmap.
    fn with_advances<R>(&self, f: impl FnOnce(&dyn Fn(char) -> f32) -> R) -> R {
        match &self.source {
            FaceSource::Builtin { .. } => f(&|ch: char| self.winansi_width_1000(ch).unwrap_or(0.0)),
            FaceSource::TrueType { data, index, .. } => {
                let face = Face::parse(data.as_bytes(), *index).ok();
                let units = face.as_ref().map_or(1000.0, |fc| fc.units_per_em() as f32);
                f(&|ch: char| {
                    self.winansi_width_1000(ch)
                        .filter(|w| *w > 0.0)
                        .or_else(|| {
                            let face = face.as_ref()?;
                            let gid = face.glyph_index(ch)?;
                            face.glyph_hor_advance(gid)
                                .map(|adv| adv as f32 / units * 1000.0)
                        })
                        .unwrap_or(0.0)
                })
            }
        }
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.with_advances(|adv| text.chars().map(|ch| adv(ch) * font_size / 1000.0).sum())
    }
}

/// The regular and bold faces a report is set in. This is the production
/// [`TextMeasurer`]; the PDF renderer embeds the same faces.
#[derive(Debug)]
pub struct FontSet {
    pub regular: FontFace,
    pub bold: FontFace,
}

impl Default for FontSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FontSet {
    pub fn builtin() -> Self {
        Self {
            regular: FontFace::helvetica(false),
            bold: FontFace::helvetica(true),
        }
    }

    /// Load regular and bold faces from files. Without a bold file the
    /// regular face is used for bold text as well.
    pub fn from_files(regular: &Path, bold: Option<&Path>) -> Result<Self, Error> {
        let regular_face = FontFace::from_file(regular, 0)?;
        let bold_face = FontFace::from_file(bold.unwrap_or(regular), 0)?;
        Ok(Self {
            regular: regular_face,
            bold: bold_face,
        })
    }

    /// Resolve a family name through the system font index, falling back to
    /// Helvetica for any face that cannot be found.
    pub fn from_family(family: &str) -> Self {
        let load = |bold: bool| -> FontFace {
            let found = find_font_file(family, bold).and_then(|(path, index)| {
                FontFace::from_file(&path, index)
                    .map_err(|e| log::warn!("{e}"))
                    .ok()
            });
            found.unwrap_or_else(|| {
                log::warn!("Font not found: {family} bold={bold}, using Helvetica");
                FontFace::helvetica(bold)
            })
        };
        Self {
            regular: load(false),
            bold: load(true),
        }
    }

    pub fn face(&self, weight: FontWeight) -> &FontFace {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

impl TextMeasurer for FontSet {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f32,
    ) -> Result<MeasuredText, Error> {
        check_args(style, max_width)?;
        let face = self.face(style.weight);
        let size = style.size;
        let lines = face.with_advances(|adv| {
            wrap_text(text, max_width, |ch| adv(ch) * size / 1000.0)
        });
        Ok(MeasuredText {
            lines,
            line_height: size * face.line_h_ratio,
        })
    }
}

/// A face written into a PDF, ready to encode text for content streams.
pub(crate) struct RegisteredFont {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    pub(crate) ascender_ratio: f32,
    char_to_gid: Option<HashMap<char, u16>>,
}

impl RegisteredFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

pub(crate) fn register_font(
    pdf: &mut Pdf,
    face: &FontFace,
    pdf_name: String,
    alloc: &mut impl FnMut() -> Ref,
    used_chars: &HashSet<char>,
) -> Result<RegisteredFont, Error> {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let char_to_gid = match &face.source {
        FaceSource::Builtin { base_font } => {
            pdf.type1_font(font_ref)
                .base_font(Name(base_font.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
            None
        }
        FaceSource::TrueType {
            data,
            index,
            ps_name,
        } => Some(embed_truetype(
            pdf,
            font_ref,
            ps_name,
            data.as_bytes(),
            *index,
            used_chars,
            alloc,
        )?),
    };

    log::debug!(
        "register_font: {} as {pdf_name} ({} chars) → {:.1}ms",
        face.name(),
        used_chars.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );

    Ok(RegisteredFont {
        pdf_name,
        font_ref,
        ascender_ratio: face.ascender_ratio,
        char_to_gid,
    })
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
) -> Result<HashMap<char, u16>, Error> {
    let face = Face::parse(font_data, face_index)
        .map_err(|e| Error::Font(format!("{ps_name}: {e}")))?;
    let descriptor_ref = alloc();
    let data_ref = alloc();

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

    // (char, original gid, subset gid, advance)
    let mut remapper = subsetter::GlyphRemapper::new();
    let mut glyphs: Vec<(char, u16, u16, f32)> = Vec::new();
    let mut chars: Vec<char> = used_chars.iter().copied().collect();
    chars.sort_unstable();
    for ch in chars {
        if let Some(gid) = face.glyph_index(ch) {
            let w = face
                .glyph_hor_advance(gid)
                .map(|adv| adv as f32 / units * 1000.0)
                .unwrap_or(0.0);
            glyphs.push((ch, gid.0, remapper.remap(gid.0), w));
        }
    }

    let (subset_data, subsetted) = match subsetter::subset(font_data, face_index, &remapper) {
        Ok(data) => (data, true),
        Err(e) => {
            log::warn!("Font subsetting failed for {ps_name}: {e}, embedding full font");
            (font_data.to_vec(), false)
        }
    };
    // The full font keeps its own glyph ids.
    let gid_of = |&(_, original, subset, _): &(char, u16, u16, f32)| {
        if subsetted { subset } else { original }
    };
    let char_to_gid: HashMap<char, u16> = glyphs.iter().map(|g| (g.0, gid_of(g))).collect();
    let mut gid_widths: Vec<(u16, f32)> = glyphs.iter().map(|g| (gid_of(g), g.3)).collect();
    gid_widths.sort_by_key(|&(gid, _)| gid);
    gid_widths.dedup_by_key(|(gid, _)| *gid);

    let data_len = i32::try_from(subset_data.len())
        .map_err(|_| Error::Font(format!("{ps_name}: font data too large")))?;
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

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

    let cid_font_ref = alloc();
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

    let tounicode_ref = alloc();
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

    Ok(char_to_gid)
}

fn font_family_name(face: &Face) -> Option<String> {
    // ID 1 (Family) keeps "Noto Sans" and "Noto Sans Display" apart.
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

/// (lowercase family name, bold) -> (file path, face index within TTC)
type FontLookup = HashMap<(String, bool), (PathBuf, u32)>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    // 1. User-configured directories via REPORT_PDF_FONTS
    if let Ok(val) = std::env::var("REPORT_PDF_FONTS") {
        dirs.extend(std::env::split_paths(&val).filter(|p| !p.as_os_str().is_empty()));
    }

    // 2. Platform-specific system font directories
    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
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

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn is_font_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttc"))
}

fn scan_font_dirs() -> FontLookup {
    let t0 = std::time::Instant::now();
    let mut index = FontLookup::new();
    let mut files_scanned = 0u32;
    let mut visited_dirs: HashSet<PathBuf> = HashSet::new();

    let mut stack: Vec<PathBuf> = font_directories();
    while let Some(dir) = stack.pop() {
        if !visited_dirs.insert(dir.clone()) {
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
            let face_count = if is_font_collection(&path) {
                ttf_parser::fonts_in_collection(&data).unwrap_or(1)
            } else {
                1
            };
            for face_idx in 0..face_count {
                let Ok(face) = Face::parse(&data, face_idx) else {
                    continue;
                };
                if face.is_italic() {
                    continue;
                }
                if let Some(family) = font_family_name(&face) {
                    index
                        .entry((family.to_lowercase(), face.is_bold()))
                        .or_insert((path.clone(), face_idx));
                }
            }
        }
    }

    log::info!(
        "Font scan: {:.1}ms, {} dirs, {} files parsed → {} entries",
        t0.elapsed().as_secs_f64() * 1000.0,
        visited_dirs.len(),
        files_scanned,
        index.len(),
    );

    index
}

/// Look up a font file by family name. Falls back to the regular variant if
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

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Characters without a WinAnsi code point are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b >= 32)
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
fn helvetica_widths(bold: bool) -> Vec<f32> {
    // Bold advances run roughly 10% wider for letters.
    let letter = |regular: f32, heavy: f32| if bold { heavy } else { regular };
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                         // space
            33..=47 => 333.0,                    // punctuation
            48..=57 => 556.0,                    // digits
            58..=64 => 333.0,                    // more punctuation
            73 => 278.0,                         // I (narrow uppercase)
            74 => letter(500.0, 556.0),          // J
            77 => 833.0,                         // M (wide)
            87 => 944.0,                         // W (wide)
            65..=90 => letter(667.0, 722.0),     // uppercase A-Z (average)
            91..=96 => 333.0,                    // brackets etc.
            105 | 106 | 108 => letter(222.0, 278.0), // narrow lowercase: i j l
            102 | 116 => letter(278.0, 333.0),   // f t
            114 => letter(333.0, 389.0),         // r
            109 => letter(833.0, 889.0),         // m (wide)
            119 => letter(722.0, 778.0),         // w (wide)
            97..=122 => letter(556.0, 611.0),    // lowercase a-z (average)
            0x85 | 0x97 => 1000.0,               // ellipsis, em dash
            0x95 => 350.0,                       // bullet
            _ => letter(556.0, 611.0),
        })
        .collect()
}
