// Drives `ArchiveWriter`/`ArchiveReader` end to end (list -> extract ->
// verify bytes and RISC OS metadata) against an in-memory mock container,
// the same way the core codecs are tested inside the crate but exercised
// only through the public API.

use std::cell::RefCell;
use std::io::{self, Cursor};
use std::rc::Rc;
use std::sync::Arc;

use riscos_zip::archive::{ArchiveReader, ArchiveWriter, PrintStyle};
use riscos_zip::config::Config;
use riscos_zip::container::{Compression, ContainerReader, ContainerWriter, MemberRecord};
use riscos_zip::metadata::DateTime;

#[derive(Clone)]
struct MockMember {
    record: MemberRecord,
    body: Vec<u8>,
}

#[derive(Default)]
struct Sink {
    members: Vec<MockMember>,
}

struct MockWriter {
    sink: Rc<RefCell<Sink>>,
    current: Option<(MemberRecord, Vec<u8>)>,
}

impl ContainerWriter for MockWriter {
    fn start_member(
        &mut self,
        filename: &str,
        date_time: DateTime,
        internal_attr: u16,
        external_attr: u32,
        arc0_payload: &[u8],
        _compression: Compression,
        _set_utf8_flag: bool,
    ) -> io::Result<()> {
        self.flush_current();
        let mut extra = Vec::new();
        if !arc0_payload.is_empty() {
            extra.extend_from_slice(&riscos_zip::extra::ARC0_HEADER_ID.to_le_bytes());
            extra.extend_from_slice(&(arc0_payload.len() as u16).to_le_bytes());
            extra.extend_from_slice(arc0_payload);
        }
        self.current = Some((
            MemberRecord {
                filename: filename.to_owned(),
                date_time,
                internal_attr,
                external_attr,
                extra,
                compressed_size: 0,
                uncompressed_size: 0,
                is_utf8: true,
            },
            Vec::new(),
        ));
        Ok(())
    }

    fn write_member_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let (record, body) = self.current.as_mut().expect("start_member called first");
        body.extend_from_slice(bytes);
        record.compressed_size = body.len() as u64;
        record.uncompressed_size = body.len() as u64;
        Ok(())
    }

    fn add_directory(&mut self, dirname: &str, date_time: DateTime, external_attr: u32) -> io::Result<()> {
        self.flush_current();
        self.sink.borrow_mut().members.push(MockMember {
            record: MemberRecord {
                filename: dirname.to_owned(),
                date_time,
                internal_attr: 0,
                external_attr,
                extra: Vec::new(),
                compressed_size: 0,
                uncompressed_size: 0,
                is_utf8: true,
            },
            body: Vec::new(),
        });
        Ok(())
    }

    fn finish(mut self) -> io::Result<()> {
        self.flush_current();
        Ok(())
    }
}

impl MockWriter {
    fn flush_current(&mut self) {
        if let Some((record, body)) = self.current.take() {
            self.sink.borrow_mut().members.push(MockMember { record, body });
        }
    }
}

struct MockReader {
    sink: Rc<RefCell<Sink>>,
}

impl ContainerReader for MockReader {
    type MemberReader<'a>
        = Cursor<Vec<u8>>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.sink.borrow().members.len()
    }

    fn member_at(&mut self, index: usize) -> io::Result<MemberRecord> {
        Ok(self.sink.borrow().members[index].record.clone())
    }

    fn read_member(&mut self, index: usize) -> io::Result<Self::MemberReader<'_>> {
        Ok(Cursor::new(self.sink.borrow().members[index].body.clone()))
    }
}

#[test]
fn write_then_list_round_trips_filetype_and_body() {
    let config = Arc::new(Config::default());
    let sink = Rc::new(RefCell::new(Sink::default()));
    let writer = MockWriter { sink: sink.clone(), current: None };
    let mut archive = ArchiveWriter::new(writer, config.clone(), Compression::Stored);

    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("hello,fff");
    std::fs::write(&path, b"hello world").unwrap();
    archive.add_file(&path, "hello,fff").unwrap();
    archive.finish().unwrap();

    let mut reader = ArchiveReader::new(MockReader { sink: sink.clone() }, config);
    let records = reader.list().unwrap();
    assert_eq!(records.len(), 1);
    // The ",fff" NFS suffix on the arcname is consumed and promoted into the
    // ARC0 extra field, rather than carried through as a literal filename.
    assert_eq!(records[0].riscos_filetype(), 0xFFF);
    assert_eq!(records[0].filename(), "hello");

    let out_dir = tempfile::tempdir().unwrap();
    reader.extract(0, &records[0], out_dir.path()).unwrap();
    let extracted = std::fs::read(out_dir.path().join("hello")).unwrap();
    assert_eq!(extracted, b"hello world");
}

#[test]
fn printdir_lists_directory_entries() {
    let config = Arc::new(Config::default());
    let sink = Rc::new(RefCell::new(Sink::default()));
    let writer = MockWriter { sink: sink.clone(), current: None };
    let mut archive = ArchiveWriter::new(writer, config.clone(), Compression::Stored);

    let tmp_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp_dir.path().join("sub")).unwrap();
    std::fs::write(tmp_dir.path().join("sub/a.txt"), b"data").unwrap();
    archive.add_dir(tmp_dir.path(), "project").unwrap();
    archive.finish().unwrap();

    let mut reader = ArchiveReader::new(MockReader { sink }, config);
    let out = reader.printdir(PrintStyle::Compact).unwrap();
    assert!(out.contains("project/sub/a.txt"));
}

#[test]
fn settypes_style_rewrite_changes_filetype_keeps_body() {
    let config = Arc::new(Config::default());
    let sink = Rc::new(RefCell::new(Sink::default()));
    let writer = MockWriter { sink: sink.clone(), current: None };
    let mut archive = ArchiveWriter::new(writer, config.clone(), Compression::Stored);

    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("readme");
    std::fs::write(&path, b"contents").unwrap();
    archive.add_file(&path, "readme").unwrap();
    archive.finish().unwrap();

    let mut reader = ArchiveReader::new(MockReader { sink: sink.clone() }, config.clone());
    let mut records = reader.list().unwrap();
    let body = reader.read_member_bytes(0).unwrap();
    assert_eq!(body, b"contents");

    records[0].set_nfs_encoding(false);
    records[0].set_riscos_filetype(0xFFF);

    let rewrite_sink = Rc::new(RefCell::new(Sink::default()));
    let rewrite_writer = MockWriter { sink: rewrite_sink.clone(), current: None };
    let mut rewriter = ArchiveWriter::new(rewrite_writer, config.clone(), Compression::Stored);
    rewriter.write_record(&records[0], &body).unwrap();
    rewriter.finish().unwrap();

    let mut rewritten_reader = ArchiveReader::new(MockReader { sink: rewrite_sink }, config);
    let rewritten_records = rewritten_reader.list().unwrap();
    assert_eq!(rewritten_records[0].riscos_filetype(), 0xFFF);
    assert_eq!(rewritten_reader.read_member_bytes(0).unwrap(), b"contents");
}
