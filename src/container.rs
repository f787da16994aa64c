//! Abstraction over the underlying ZIP container, so the metadata model in
//! [`crate::metadata`] can be built and tested without any particular
//! container implementation in scope.
//!
//! The shape mirrors the fields a `zip::read::ZipFile` exposes (`name`,
//! `extra_data`, `last_modified`, `unix_mode`, `is_dir`): a provider
//! enumerates member records with that shape, and a writer accepts members
//! with the same shape plus a byte source.

use std::io::{self, Read};

use crate::metadata::DateTime;

/// One member as read from a container, before RISC OS metadata has been
/// layered on top.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub filename: String,
    pub date_time: DateTime,
    pub internal_attr: u16,
    pub external_attr: u32,
    pub extra: Vec<u8>,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub is_utf8: bool,
}

/// Compression method requested when adding a new member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

/// A source providing members for enumeration (the read side of a container).
pub trait ContainerReader {
    type MemberReader<'a>: Read + 'a
    where
        Self: 'a;

    /// Number of members in the container.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only metadata for the member at `index`.
    fn member_at(&mut self, index: usize) -> io::Result<MemberRecord>;

    /// A reader over the (decompressed) body of the member at `index`.
    fn read_member(&mut self, index: usize) -> io::Result<Self::MemberReader<'_>>;
}

/// A sink accepting new members (the write side of a container).
pub trait ContainerWriter {
    /// Start a new member with the given metadata and compression method,
    /// returning a `Write`r for its body.
    ///
    /// `arc0_payload`, when non-empty, is the 20-byte ARC0 chunk payload
    /// (signature/load/exec/attr/reserved, see [`crate::extra`]) to attach as
    /// an extra field entry; other chunk kinds are not round-tripped through
    /// the write path.
    fn start_member(
        &mut self,
        filename: &str,
        date_time: DateTime,
        internal_attr: u16,
        external_attr: u32,
        arc0_payload: &[u8],
        compression: Compression,
        set_utf8_flag: bool,
    ) -> io::Result<()>;

    fn write_member_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Add a directory entry with no body.
    fn add_directory(&mut self, dirname: &str, date_time: DateTime, external_attr: u32) -> io::Result<()>;

    fn finish(self) -> io::Result<()>;
}
