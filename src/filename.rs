//! Path-component sanitisation and character-encoding translation between
//! the POSIX-style ZIP filename layout (`/`-separated) and the RISC OS
//! layout (`.`-separated, `/` literal).

use crate::config::RiscosEncoding;
use crate::cp437::{FromCp437, ToCp437};

/// Sanitise a POSIX-layout name so it never escapes the archive root and
/// never carries redundant separators or relative references.
pub fn sanitise_unix(name: &str) -> String {
    let mut name = name.trim_start_matches('/').to_owned();

    while name.contains("//") {
        name = name.replace("//", "/");
    }

    name = name.replace("/./", "/");
    if let Some(rest) = name.strip_prefix("./") {
        name = rest.to_owned();
    }
    if let Some(rest) = name.strip_suffix("/.") {
        name = rest.to_owned();
    }

    while let Some(rest) = name.strip_prefix("../") {
        name = rest.to_owned();
    }

    loop {
        match strip_one_internal_relative(&name) {
            Some(next) => name = next,
            None => break,
        }
    }

    if name == "." || name == ".." {
        name.clear();
    }

    if name.is_empty() {
        name = "root".to_owned();
    }

    name
}

/// Remove the first occurrence of `<component>/../` and return `None` once
/// no more occurrences remain: repeatedly strip the first `<component>/../`
/// until none are left.
fn strip_one_internal_relative(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut search_from = 0;
    while let Some(rel) = name[search_from..].find("/../") {
        let dotdot_start = search_from + rel + 1;
        // component is the (possibly empty) run of non-'/' bytes immediately
        // before the "/../"; it must be non-empty to match `[^/]+`.
        let mut comp_start = dotdot_start;
        while comp_start > 0 && bytes[comp_start - 1] != b'/' {
            comp_start -= 1;
        }
        if comp_start < dotdot_start {
            let mut out = String::new();
            out.push_str(&name[..comp_start]);
            out.push_str(&name[dotdot_start + 4..]);
            return Some(out);
        }
        search_from = dotdot_start + 1;
    }
    // trailing "/.." at end of string (the `(/|$)` alternative)
    if let Some(idx) = name.rfind("/..") {
        if idx + 3 == name.len() {
            let dotdot_start = idx + 1;
            let mut comp_start = dotdot_start;
            while comp_start > 0 && bytes[comp_start - 1] != b'/' {
                comp_start -= 1;
            }
            if comp_start < dotdot_start {
                let mut out = String::new();
                out.push_str(&name[..comp_start]);
                return Some(out);
            }
        }
    }
    None
}

/// Sanitise a RISC OS-layout name: neutralise anchors, wildcards, and
/// characters that would be invalid or dangerous in a RISC OS filename.
pub fn sanitise_riscos(name: &str) -> String {
    let mut name = name.replace('<', "(").replace('>', ")");

    loop {
        let stripped = ["$.", "@.", "%.", "\\.", "&.", "^."]
            .iter()
            .find_map(|anchor| name.strip_prefix(anchor));
        match stripped {
            Some(rest) => name = rest.to_owned(),
            None => break,
        }
    }

    name = name.replace('*', "(star)").replace('?', "(q)");
    name = name.replace(".^", "");
    name = name.replace(':', "--");
    name = name.replace('"', "'");
    name = name.replace('#', "(h)");

    if let Some(rest) = name.strip_prefix('.') {
        name = rest.to_owned();
    }
    if let Some(rest) = name.strip_suffix('.') {
        name = rest.to_owned();
    }

    name
}

/// Swap `/` and `.` byte-for-byte (the path/extension separator exchange).
fn exchange_dot_slash(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' => '.',
            '.' => '/',
            other => other,
        })
        .collect()
}

/// POSIX layout -> RISC OS layout, for a name already encoded into the RISC
/// OS locale's byte values (represented here as a `String` of Latin-1
/// codepoints, one per byte).
pub fn unix_to_riscos(name: &str) -> String {
    let name = sanitise_unix(name);
    let name = exchange_dot_slash(&name);
    sanitise_riscos(&name)
}

/// RISC OS layout -> POSIX layout.
pub fn riscos_to_unix(name: &str) -> String {
    let name = sanitise_riscos(name);
    exchange_dot_slash(&name)
}

/// Encode a Unicode string into the RISC OS locale, swapping space for a
/// non-breaking space first (RISC OS filenames cannot contain spaces).
pub fn encode_to_riscos(name: &str, encoding: RiscosEncoding) -> Vec<u8> {
    let swapped: String = name.chars().map(|c| if c == ' ' { '\u{a0}' } else { c }).collect();
    match encoding {
        RiscosEncoding::Latin1 => swapped
            .chars()
            .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
            .collect(),
    }
}

/// Decode RISC OS locale bytes into a Unicode string, swapping the
/// non-breaking space back to a regular space.
pub fn decode_from_riscos(bytes: &[u8], encoding: RiscosEncoding) -> String {
    let decoded: String = match encoding {
        RiscosEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
    };
    decoded.replace('\u{a0}', " ")
}

/// Restore the original on-disk bytes of a ZIP member name that a container
/// reader decoded as cp437 (the usual behaviour when the UTF-8 flag bit is
/// clear), then decode those bytes using the configured ZIP filename
/// encoding.
pub fn restore_from_cp437(decoded_as_cp437: &str, zip_filename_encoding: RiscosEncoding) -> String {
    match decoded_as_cp437.to_cp437() {
        Some(raw) => decode_from_riscos(&raw, zip_filename_encoding),
        None => decoded_as_cp437.to_owned(),
    }
}

/// Whether a name must carry the UTF-8 general-purpose flag bit when
/// written, because it cannot round-trip through cp437 losslessly.
pub fn needs_utf8_flag(name: &str) -> bool {
    match name.to_cp437() {
        Some(raw) => raw.as_slice().from_cp437().map(|s| s != name).unwrap_or(true),
        None => true,
    }
}
