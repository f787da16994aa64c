//! Per-archive configuration, replacing the global class attributes the
//! original implementation carried on its `ZipInfoRISCOS` class.

use std::collections::HashMap;
use std::sync::Arc;

/// Default filetype applied when nothing else identifies one.
pub const DEFAULT_FILETYPE: i32 = 0xFFD;
/// Filetype applied when the internal "text" flag is set and no other
/// filetype is known.
pub const DEFAULT_FILETYPE_TEXT: i32 = 0xFFF;

/// Character encoding to use for the `riscos_filename` byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiscosEncoding {
    /// ISO-8859-1 (each byte is one Unicode codepoint 0-255).
    Latin1,
}

/// Hooks and lookup tables controlling filetype/attribute/filename inference.
///
/// Constructed once per archive facade and shared (via `Arc`) by every
/// [`crate::metadata::RiscosMetadata`] built from or for that archive, in
/// place of global class-level constants.
#[derive(Debug, Clone)]
pub struct Config {
    pub default_filetype: i32,
    pub default_filetype_text: i32,
    pub filename_encoding: RiscosEncoding,
    pub zip_filename_encoding: RiscosEncoding,
    pub extension_map: Arc<HashMap<String, i32>>,
    pub parentdir_map: Arc<HashMap<String, i32>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_filetype: DEFAULT_FILETYPE,
            default_filetype_text: DEFAULT_FILETYPE_TEXT,
            filename_encoding: RiscosEncoding::Latin1,
            zip_filename_encoding: RiscosEncoding::Latin1,
            extension_map: Arc::new(default_extension_map()),
            parentdir_map: Arc::new(default_parentdir_map()),
        }
    }
}

impl Config {
    /// Resolve a filetype by its extension, via the configured lookup table.
    ///
    /// The MimeMap hook (`filetype_for_extension`) is expected to run before
    /// this; it always returns `None` in this crate since there is no RISC OS
    /// MimeMap module to call out to off-platform.
    pub fn filetype_for_extension(&self, ext: &str) -> Option<i32> {
        self.extension_map.get(&ext.to_ascii_lowercase()).copied()
    }

    /// Resolve a filetype by the lowercased name of a file's parent directory.
    pub fn filetype_for_parentdir(&self, dirname: &str) -> Option<i32> {
        self.parentdir_map
            .get(&dirname.to_ascii_lowercase())
            .copied()
    }
}

fn default_extension_map() -> HashMap<String, i32> {
    [
        ("txt", 0xFFF),
        ("c", 0xFFF),
        ("c++", 0xFFF),
        ("h", 0xFFF),
        ("s", 0xFFF),
        ("zip", 0xA91),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect()
}

fn default_parentdir_map() -> HashMap<String, i32> {
    [
        ("c", 0xFFF),
        ("s", 0xFFF),
        ("c++", 0xFFF),
        ("h", 0xFFF),
        ("hdr", 0xFFF),
        ("cmhg", 0xFFF),
        ("def", 0xFFF),
        ("p", 0xFFF),
        ("imp", 0xFFF),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect()
}

/// The static hex filetype to human name table, used for display and for
/// resolving CLI `--settypes` name arguments; not part of any wire format.
pub const NAMED_TYPES: &[(i32, &str)] = &[
    (0xFFF, "Text"),
    (0xFFE, "Command"),
    (0xFFD, "Data"),
    (0xFFC, "Utility"),
    (0xFFB, "BASIC"),
    (0xFFA, "Module"),
    (0xFF9, "Sprite"),
    (0xFF8, "Absolute"),
    (0xFF7, "BBC font"),
    (0xFF6, "Font"),
    (0xFF5, "PoScript"),
    (0xFF4, "Printout"),
    (0xFF2, "Config"),
    (0xFF0, "TIFF"),
    (0xFD1, "BasicTxt"),
    (0xFED, "Palette"),
    (0xFEC, "Template"),
    (0xFEB, "Obey"),
    (0xFEA, "Desktop"),
    (0xFE6, "Unix Ex"),
    (0xFE5, "EPROM"),
    (0xFDC, "SoftLink"),
    (0xFD3, "DebImage"),
    (0xFCA, "Squash"),
    (0xFC9, "SunRastr"),
    (0xFAF, "HTML"),
    (0xFAE, "Resource"),
    (0xF89, "GZip"),
    (0xD94, "ArtWork"),
    (0xC85, "JPEG"),
    (0xBBC, "BBC ROM"),
    (0xB61, "XBM"),
    (0xB60, "PNG"),
    (0xB2F, "WMF"),
    (0xAFF, "DrawFile"),
    (0xA91, "Zip"),
    (0xA66, "WebP"),
    (0xA65, "JPEG2000"),
    (0x69E, "PNM"),
    (0x69D, "Targa"),
    (0x69C, "BMP"),
    (0x697, "PCX"),
    (0x695, "GIF"),
    (0x690, "Clear"),
    (0x1C9, "DiagData"),
    (0x132, "ICO"),
];

/// Resolve a filetype name (case-insensitive) to its hex value.
pub fn named_type_to_filetype(name: &str) -> Option<i32> {
    NAMED_TYPES
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(ft, _)| *ft)
}

/// Resolve a filetype to its display name, if it has one in the table.
pub fn filetype_to_named_type(filetype: i32) -> Option<&'static str> {
    NAMED_TYPES
        .iter()
        .find(|(ft, _)| *ft == filetype)
        .map(|(_, n)| *n)
}

/// Parse a `--default-filetype`/`--settypes` argument: either a bare hex
/// literal (`fff`, `0xfff`) or a name from [`NAMED_TYPES`].
pub fn parse_filetype_arg(arg: &str) -> Option<i32> {
    let hex = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("&")).unwrap_or(arg);
    if let Ok(value) = i32::from_str_radix(hex, 16) {
        return Some(value);
    }
    named_type_to_filetype(arg)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolves_hex_and_name() {
        assert_eq!(parse_filetype_arg("fff"), Some(0xFFF));
        assert_eq!(parse_filetype_arg("0xfff"), Some(0xFFF));
        assert_eq!(parse_filetype_arg("Text"), Some(0xFFF));
        assert_eq!(parse_filetype_arg("text"), Some(0xFFF));
        assert_eq!(parse_filetype_arg("nonsense"), None);
    }

    #[test]
    fn named_type_roundtrip() {
        assert_eq!(filetype_to_named_type(0xA91), Some("Zip"));
        assert_eq!(named_type_to_filetype("zip"), Some(0xA91));
    }

    #[test]
    fn default_maps_cover_spec_examples() {
        let cfg = Config::default();
        assert_eq!(cfg.filetype_for_extension("zip"), Some(0xA91));
        assert_eq!(cfg.filetype_for_parentdir("c"), Some(0xFFF));
    }
}
