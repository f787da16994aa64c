//! The NFS filename-suffix encoding: a fallback for carrying RISC OS
//! filetype and load/exec information when the extra field cannot survive
//! the trip (e.g. when a file is copied through a filesystem that doesn't
//! preserve ZIP extra fields).

const HEXDIGITS: &str = "0123456789abcdef";

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| HEXDIGITS.contains(c))
}

/// The pieces extracted from a leaf name's NFS suffix, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfsExtraction {
    pub name: String,
    pub loadaddr: Option<u32>,
    pub execaddr: Option<u32>,
    pub filetype: Option<i32>,
}

/// Parse at most one trailing NFS suffix off `name`.
///
/// A name with no recognisable suffix is returned unmodified, with all
/// optional fields `None` — this is a silent no-op, never an error.
pub fn extract_nfs_encoding(name: &str) -> NfsExtraction {
    let bytes: Vec<char> = name.chars().collect();
    let len = bytes.len();

    if len > 4 {
        let tail: String = bytes[len - 3..].iter().collect();
        if bytes[len - 4] == ',' && is_lower_hex(&tail) {
            if let Ok(filetype) = i32::from_str_radix(&tail, 16) {
                return NfsExtraction {
                    name: bytes[..len - 4].iter().collect(),
                    loadaddr: None,
                    execaddr: None,
                    filetype: Some(filetype),
                };
            }
        }
    }

    if len > 18 {
        let load_part: String = bytes[len - 17..len - 9].iter().collect();
        let exec_part: String = bytes[len - 8..].iter().collect();
        if bytes[len - 9] == ',' && bytes[len - 18] == ',' && is_lower_hex(&load_part) && is_lower_hex(&exec_part)
        {
            if let (Ok(loadaddr), Ok(execaddr)) = (
                u32::from_str_radix(&load_part, 16),
                u32::from_str_radix(&exec_part, 16),
            ) {
                let filetype = if loadaddr & 0xFFF0_0000 == 0xFFF0_0000 {
                    Some(((loadaddr >> 8) & 0xFFF) as i32)
                } else {
                    None
                };
                return NfsExtraction {
                    name: bytes[..len - 18].iter().collect(),
                    loadaddr: Some(loadaddr),
                    execaddr: Some(execaddr),
                    filetype,
                };
            }
        }
    }

    NfsExtraction {
        name: name.to_owned(),
        loadaddr: None,
        execaddr: None,
        filetype: None,
    }
}

/// Build a name with an NFS suffix attached, after first stripping any
/// existing suffix.
///
/// `default_filetype` is the filetype that should be omitted rather than
/// spelled out (Data normally, or Text when the internal text flag is set);
/// pass [`None`] to never omit.
pub fn build_nfs_encoding(
    name: &str,
    loadaddr: Option<u32>,
    execaddr: Option<u32>,
    filetype: Option<i32>,
    default_filetype: Option<i32>,
) -> String {
    let stripped = extract_nfs_encoding(name).name;

    let filetype = match (loadaddr, execaddr) {
        (Some(load), Some(exec)) => {
            if load & 0xFFF0_0000 == 0xFFF0_0000 {
                Some(((load >> 8) & 0xFFF) as i32)
            } else {
                return format!("{stripped},{load:08x},{exec:08x}");
            }
        }
        _ => filetype,
    };

    match filetype {
        Some(ft) if Some(ft) != default_filetype => format!("{stripped},{ft:03x}"),
        _ => stripped,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filetype_suffix() {
        let e = extract_nfs_encoding("file,ff9");
        assert_eq!(e.name, "file");
        assert_eq!(e.filetype, Some(0xFF9));
        assert_eq!(e.loadaddr, None);
    }

    #[test]
    fn loadexec_suffix_typed() {
        let e = extract_nfs_encoding("c/file,fffff93a,c7524201");
        assert_eq!(e.name, "c/file");
        assert_eq!(e.loadaddr, Some(0xFFFF_F93A));
        assert_eq!(e.execaddr, Some(0xC752_4201));
        assert_eq!(e.filetype, Some(0xFF9));
    }

    #[test]
    fn loadexec_suffix_untyped() {
        let e = extract_nfs_encoding("c/file,12345678,87654321");
        assert_eq!(e.loadaddr, Some(0x1234_5678));
        assert_eq!(e.execaddr, Some(0x8765_4321));
        assert_eq!(e.filetype, None);
    }

    #[test]
    fn non_hex_suffix_kept_as_is() {
        let e = extract_nfs_encoding("file,fft");
        assert_eq!(e.name, "file,fft");
        assert_eq!(e.filetype, None);
    }

    #[test]
    fn build_omits_default_filetype() {
        let built = build_nfs_encoding("file", None, None, Some(0xFFD), Some(0xFFD));
        assert_eq!(built, "file");
        let built = build_nfs_encoding("file", None, None, Some(0xFF9), Some(0xFFD));
        assert_eq!(built, "file,ff9");
    }

    #[test]
    fn build_is_idempotent() {
        let built = build_nfs_encoding("file", None, None, Some(0xFF9), Some(0xFFD));
        let e = extract_nfs_encoding(&built);
        let rebuilt = build_nfs_encoding(&e.name, e.loadaddr, e.execaddr, e.filetype, Some(0xFFD));
        assert_eq!(built, rebuilt);
    }
}
