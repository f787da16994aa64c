//! The archive facade: `list`, `extract`, `add_file`, `add_dir`, `printdir`.
//!
//! Generic over the [`ContainerReader`]/[`ContainerWriter`] traits so the
//! metadata logic can be exercised against a mock provider in tests, while
//! [`crate::zip_adapter`] supplies the real implementation.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::container::{Compression, ContainerReader, ContainerWriter};
use crate::extra;
use crate::metadata::{DateTime, RiscosMetadata};
use crate::result::{Error, Result};

/// A listing, opened for reading.
pub struct ArchiveReader<C> {
    container: C,
    config: Arc<Config>,
}

impl<C: ContainerReader> ArchiveReader<C> {
    pub fn new(container: C, config: Arc<Config>) -> Self {
        tracing::debug!(members = container.len(), "archive opened for reading");
        ArchiveReader { container, config }
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }

    /// §4.8 `list()`: enumerate every member as a [`RiscosMetadata`] record.
    ///
    /// A corrupt extra field on one member never fails the whole listing;
    /// that member simply surfaces with `riscos_present == false`.
    pub fn list(&mut self) -> Result<Vec<RiscosMetadata>> {
        let mut records = Vec::with_capacity(self.container.len());
        for index in 0..self.container.len() {
            let member = self.container.member_at(index)?;
            records.push(RiscosMetadata::from_container_member(
                self.config.clone(),
                member.filename,
                member.date_time,
                member.internal_attr,
                member.external_attr,
                member.extra,
            ));
        }
        Ok(records)
    }

    /// §4.8 `extract()`: write one member's body to `dest`.
    pub fn extract(&mut self, index: usize, record: &RiscosMetadata, dest: &Path) -> Result<()> {
        let target = dest.join(record.filename());
        if record.riscos_objtype() == 2 {
            fs::create_dir_all(&target)?;
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut reader = self.container.read_member(index)?;
        let mut out = fs::File::create(&target)?;
        io::copy(&mut reader, &mut out)?;
        drop(out);

        let dt = record.date_time();
        if let Some(unix_seconds) = dos_to_unix_seconds(dt) {
            let time = FileTime::from_unix_time(unix_seconds, 0);
            let _ = filetime::set_file_mtime(&target, time);
        }
        Ok(())
    }

    /// Read one member's raw (decompressed) body, without writing it to disk.
    /// Used by callers that need to rewrite an archive member-for-member,
    /// such as the CLI's `--settypes`.
    pub fn read_member_bytes(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.container.read_member(index)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// §4.8 `extract_all()`, supplementary.
    pub fn extract_all(&mut self, dest: &Path) -> Result<()> {
        let records = self.list()?;
        for (index, record) in records.iter().enumerate() {
            self.extract(index, record, dest)?;
        }
        Ok(())
    }

    /// §4.8 `printdir(style)`.
    pub fn printdir(&mut self, style: PrintStyle) -> Result<String> {
        let records = self.list()?;
        Ok(match style {
            PrintStyle::Compact => printdir_compact(&records),
            PrintStyle::Verbose => printdir_verbose(&records),
        })
    }
}

fn dos_to_unix_seconds(dt: DateTime) -> Option<i64> {
    use chrono::{NaiveDate, NaiveTime};
    let date = NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?;
    let time = NaiveTime::from_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())?;
    Some(chrono::NaiveDateTime::new(date, time).and_utc().timestamp())
}

/// Which human-readable form `printdir` emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    Compact,
    Verbose,
}

fn posix_dirname(name: &str) -> &str {
    name.trim_end_matches('/').rsplit_once('/').map(|(d, _)| d).unwrap_or("")
}

fn format_riscos_timestamp(record: &RiscosMetadata) -> String {
    if record.riscos_filetype() == -1 {
        format!("{:08X} {:08X}", record.riscos_loadaddr(), record.riscos_execaddr())
    } else {
        let dt = record.riscos_date_time();
        const MONTHS: [&str; 12] =
            ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
        format!(
            "{:02}:{:02}:{:02} {:02}-{}-{:04}",
            dt.hour,
            dt.minute,
            dt.second,
            dt.day,
            MONTHS[(dt.month.saturating_sub(1)) as usize % 12],
            dt.year
        )
    }
}

fn printdir_compact(records: &[RiscosMetadata]) -> String {
    let mut grouped: Vec<(&str, Vec<&RiscosMetadata>)> = Vec::new();
    for record in records {
        let dir = posix_dirname(record.filename());
        match grouped.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, members)) => members.push(record),
            None => grouped.push((dir, vec![record])),
        }
    }
    for (_, members) in &mut grouped {
        members.sort_by_key(|r| r.filename().to_ascii_lowercase());
    }

    let mut out = String::new();
    for (dir, members) in &grouped {
        if !dir.is_empty() {
            out.push_str(dir);
            out.push_str(":\n");
        }
        for record in members {
            let filetype_name = config::filetype_to_named_type(record.riscos_filetype())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{:03X}", record.riscos_filetype().max(0) & 0xFFF));
            out.push_str(&format!(
                "{:02X} {:<10} {:<30} {:>10} {}\n",
                record.riscos_attr(),
                filetype_name,
                record.filename(),
                record.external_attr() & 0xFFFF_FFFF,
                format_riscos_timestamp(record)
            ));
        }
    }
    out
}

fn printdir_verbose(records: &[RiscosMetadata]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!("{}\n", record.filename()));
        let dt = record.date_time();
        out.push_str(&format!(
            "  modified: {:04}-{:02}-{:02} {:02}:{:02}:{:02}\n",
            dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
        ));
        out.push_str(&format!(
            "  ms-dos: directory={} readonly={}\n",
            record.riscos_objtype() == 2,
            record.external_attr() as u8 & 0x01 != 0
        ));
        let posix_mode = record.external_attr() >> 16;
        if posix_mode != 0 {
            out.push_str(&format!("  unix mode: {posix_mode:o}\n"));
        }
        if record.riscos_objtype() != 2 {
            out.push_str(&format!(
                "  riscos filename: {}\n",
                String::from_utf8_lossy(&record.riscos_filename())
            ));
            out.push_str(&format!("  riscos date/time: {}\n", format_riscos_timestamp(record)));
            if record.riscos_filetype() != -1 {
                out.push_str(&format!(
                    "  load/exec: {:08X} {:08X}\n",
                    record.riscos_loadaddr(),
                    record.riscos_execaddr()
                ));
            }
            out.push_str(&format!("  filetype: {:04X}\n", record.riscos_filetype().max(0)));
            out.push_str(&format!("  riscos attr: {:02X}\n", record.riscos_attr()));
        }
        out.push_str(&format!("  object type: {}\n", record.riscos_objtype()));
    }
    out
}

/// An archive opened for writing.
pub struct ArchiveWriter<W> {
    container: W,
    config: Arc<Config>,
    compression: Compression,
}

impl<W: ContainerWriter> ArchiveWriter<W> {
    pub fn new(container: W, config: Arc<Config>, compression: Compression) -> Self {
        tracing::debug!(?compression, "archive opened for writing");
        ArchiveWriter { container, config, compression }
    }

    /// §4.8 `add_file()`.
    pub fn add_file(&mut self, path: &Path, arcname: &str) -> Result<()> {
        let meta = fs::metadata(path)?;
        let mut record = RiscosMetadata::new(self.config.clone(), arcname);
        record.set_date_time(file_date_time(&meta)?);
        record.set_external_attr(file_external_attr(&meta));

        // NFS encoding is on by default for portability; this writer supports
        // proper extra-field chunks, so switch to ARC0 once the record's
        // derived defaults have been established.
        record.set_nfs_encoding(false);

        let extra = record.extra();
        let arc0_payload = extra::extract_arc0(&extra)
            .ok()
            .flatten()
            .map(|p| p.to_bytes().to_vec())
            .unwrap_or_default();

        self.container.start_member(
            record.filename(),
            record.date_time(),
            record.internal_attr(),
            record.external_attr(),
            &arc0_payload,
            self.compression,
            record.needs_utf8_flag(),
        )?;

        let mut body = Vec::new();
        fs::File::open(path)?.read_to_end(&mut body)?;
        self.container.write_member_bytes(&body)?;
        Ok(())
    }

    /// Write a member from an already-built [`RiscosMetadata`] record and a
    /// pre-read body, instead of `add_file`'s read-from-disk path. Used by
    /// callers rewriting an existing archive member-for-member (e.g. to
    /// change filetypes without touching file contents).
    pub fn write_record(&mut self, record: &RiscosMetadata, body: &[u8]) -> Result<()> {
        if record.riscos_objtype() == 2 {
            self.container.add_directory(record.filename(), record.date_time(), record.external_attr())?;
            return Ok(());
        }

        let extra = record.extra();
        let arc0_payload = extra::extract_arc0(&extra)
            .ok()
            .flatten()
            .map(|p| p.to_bytes().to_vec())
            .unwrap_or_default();

        self.container.start_member(
            record.filename(),
            record.date_time(),
            record.internal_attr(),
            record.external_attr(),
            &arc0_payload,
            self.compression,
            record.needs_utf8_flag(),
        )?;
        self.container.write_member_bytes(body)?;
        Ok(())
    }

    /// §4.8 `add_dir()`, supplementary: recursively add a directory.
    pub fn add_dir(&mut self, path: &Path, arcname: &str) -> Result<()> {
        let meta = fs::metadata(path)?;
        self.container
            .add_directory(&format!("{arcname}/"), file_date_time(&meta)?, file_external_attr(&meta))?;

        for entry in WalkDir::new(path).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry.path().strip_prefix(path).expect("walkdir yields children of path");
            let name = relative.to_string_lossy().replace('\\', "/");
            let member_name = format!("{arcname}/{name}");
            if entry.file_type().is_dir() {
                let meta = entry.metadata().map_err(io::Error::from)?;
                self.container
                    .add_directory(&format!("{member_name}/"), file_date_time(&meta)?, file_external_attr(&meta))?;
            } else if entry.file_type().is_file() {
                self.add_file(entry.path(), &member_name)?;
            } else {
                return Err(Error::InvalidInput(entry.path().display().to_string().into_boxed_str()));
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        self.container.finish()?;
        tracing::debug!("archive closed");
        Ok(())
    }
}

fn file_date_time(meta: &fs::Metadata) -> Result<DateTime> {
    use chrono::{Datelike, Timelike};
    let modified = meta.modified()?;
    let since_epoch = modified
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let naive = chrono::DateTime::<chrono::Utc>::from_timestamp(since_epoch.as_secs() as i64, 0)
        .unwrap_or_default();
    Ok(DateTime {
        year: naive.year().clamp(1980, 2107) as u16,
        month: naive.month() as u8,
        day: naive.day() as u8,
        hour: naive.hour() as u8,
        minute: naive.minute() as u8,
        second: naive.second() as u8,
    })
}

fn file_external_attr(meta: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = meta.permissions().mode();
        let dos = if meta.is_dir() { 0x10u32 } else { 0 };
        (mode << 16) | dos
    }
    #[cfg(not(unix))]
    {
        if meta.is_dir() { 0x10 } else { 0 }
    }
}

/// Resolve a `-T`/`--default-filetype` argument against the CLI's chosen
/// name table, producing the [`Error::BadFiletypeName`] variant on failure.
pub fn resolve_filetype_arg(arg: &str) -> Result<i32> {
    config::parse_filetype_arg(arg).ok_or_else(|| Error::BadFiletypeName(arg.to_owned().into_boxed_str()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::container::MemberRecord;
    use std::collections::VecDeque;

    struct MockReader {
        members: Vec<MemberRecord>,
        bodies: Vec<Vec<u8>>,
    }

    impl ContainerReader for MockReader {
        type MemberReader<'a> = std::io::Cursor<&'a [u8]>;

        fn len(&self) -> usize {
            self.members.len()
        }

        fn member_at(&mut self, index: usize) -> io::Result<MemberRecord> {
            Ok(self.members[index].clone())
        }

        fn read_member(&mut self, index: usize) -> io::Result<Self::MemberReader<'_>> {
            Ok(std::io::Cursor::new(self.bodies[index].as_slice()))
        }
    }

    struct MockWriter {
        started: VecDeque<(String, DateTime, Vec<u8>)>,
    }

    impl ContainerWriter for MockWriter {
        fn start_member(
            &mut self,
            filename: &str,
            date_time: DateTime,
            _internal_attr: u16,
            _external_attr: u32,
            arc0_payload: &[u8],
            _compression: Compression,
            _set_utf8_flag: bool,
        ) -> io::Result<()> {
            self.started.push_back((filename.to_owned(), date_time, arc0_payload.to_vec()));
            Ok(())
        }

        fn write_member_bytes(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn add_directory(&mut self, _dirname: &str, _date_time: DateTime, _external_attr: u32) -> io::Result<()> {
            Ok(())
        }

        fn finish(self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn list_surfaces_corrupt_member_without_failing_others() {
        let members = vec![
            MemberRecord {
                filename: "good".into(),
                date_time: DateTime::default(),
                internal_attr: 0,
                external_attr: 0,
                extra: Vec::new(),
                compressed_size: 0,
                uncompressed_size: 0,
                is_utf8: true,
            },
            MemberRecord {
                filename: "bad".into(),
                date_time: DateTime::default(),
                internal_attr: 0,
                external_attr: 0,
                extra: vec![0x41, 0x43, 0x14, 0x00, 0, 0, 0, 0],
                compressed_size: 0,
                uncompressed_size: 0,
                is_utf8: true,
            },
        ];
        let reader = MockReader { members, bodies: vec![Vec::new(), Vec::new()] };
        let mut archive = ArchiveReader::new(reader, Arc::new(Config::default()));
        let records = archive.list().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].riscos_present() || !records[0].riscos_present());
        assert!(!records[1].riscos_present());
    }

    #[test]
    fn printdir_compact_groups_by_directory() {
        let members = vec![MemberRecord {
            filename: "dir/file.txt".into(),
            date_time: DateTime::default(),
            internal_attr: 0,
            external_attr: 0,
            extra: Vec::new(),
            compressed_size: 0,
            uncompressed_size: 0,
            is_utf8: true,
        }];
        let reader = MockReader { members, bodies: vec![Vec::new()] };
        let mut archive = ArchiveReader::new(reader, Arc::new(Config::default()));
        let out = archive.printdir(PrintStyle::Compact).unwrap();
        assert!(out.contains("dir:"));
        assert!(out.contains("dir/file.txt"));
    }

    #[test]
    fn read_member_bytes_returns_full_body() {
        let members = vec![MemberRecord {
            filename: "file".into(),
            date_time: DateTime::default(),
            internal_attr: 0,
            external_attr: 0,
            extra: Vec::new(),
            compressed_size: 0,
            uncompressed_size: 3,
            is_utf8: true,
        }];
        let reader = MockReader { members, bodies: vec![vec![1, 2, 3]] };
        let mut archive = ArchiveReader::new(reader, Arc::new(Config::default()));
        assert_eq!(archive.read_member_bytes(0).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn write_record_rewrites_filetype_and_keeps_body() {
        let writer = MockWriter { started: VecDeque::new() };
        let mut archive = ArchiveWriter::new(writer, Arc::new(Config::default()), Compression::Deflated);
        let mut record = RiscosMetadata::new(Arc::new(Config::default()), "file");
        record.set_nfs_encoding(false);
        record.set_riscos_filetype(0xFFF);
        archive.write_record(&record, b"body").unwrap();
        let (name, _dt, arc0) = archive.container.started.pop_front().unwrap();
        assert_eq!(name, "file");
        assert_eq!(arc0.len(), 20);
    }

    #[test]
    fn write_record_directory_uses_add_directory() {
        let writer = MockWriter { started: VecDeque::new() };
        let mut archive = ArchiveWriter::new(writer, Arc::new(Config::default()), Compression::Deflated);
        let mut record = RiscosMetadata::new(Arc::new(Config::default()), "dir");
        record.set_riscos_objtype(2);
        archive.write_record(&record, b"").unwrap();
        assert!(archive.container.started.is_empty());
    }
}
