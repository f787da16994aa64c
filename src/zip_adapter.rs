//! [`ContainerReader`]/[`ContainerWriter`] implementations backed by the
//! published `zip` crate.
//!
//! Unlike this crate's low-level codecs (extra field, filename, NFS suffix,
//! quin), which never need to look past their own byte buffers, this
//! adapter is written directly against `zip`'s public `ZipArchive`/
//! `ZipWriter` surface.

use std::io::{Read, Seek, Write};

use zip::write::{ExtendedFileOptions, FileOptions};
use zip::{CompressionMethod as ZipCompressionMethod, DateTime as ZipDateTime, ZipArchive, ZipWriter};

use crate::container::{Compression, ContainerReader, ContainerWriter, MemberRecord};
use crate::extra::ARC0_HEADER_ID;
use crate::metadata::DateTime;

fn to_zip_datetime(dt: DateTime) -> ZipDateTime {
    ZipDateTime::from_date_and_time(dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second)
        .unwrap_or_default()
}

fn from_zip_datetime(dt: Option<ZipDateTime>) -> DateTime {
    match dt {
        Some(dt) => DateTime {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        },
        None => DateTime::default(),
    }
}

/// Adapter wrapping a [`ZipArchive`] as a [`ContainerReader`].
pub struct ZipContainerReader<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipContainerReader<R> {
    pub fn new(reader: R) -> zip::result::ZipResult<Self> {
        Ok(ZipContainerReader { archive: ZipArchive::new(reader)? })
    }
}

impl<R: Read + Seek> ContainerReader for ZipContainerReader<R> {
    type MemberReader<'a>
        = zip::read::ZipFile<'a>
    where
        R: 'a;

    fn len(&self) -> usize {
        self.archive.len()
    }

    fn member_at(&mut self, index: usize) -> std::io::Result<MemberRecord> {
        let file = self.archive.by_index(index)?;
        Ok(MemberRecord {
            filename: file.name().to_owned(),
            date_time: from_zip_datetime(file.last_modified()),
            internal_attr: 0,
            external_attr: file.unix_mode().map(|m| m << 16).unwrap_or(file.external_attr()),
            extra: file.extra_data().unwrap_or(&[]).to_vec(),
            compressed_size: file.compressed_size(),
            uncompressed_size: file.size(),
            is_utf8: file.name_raw() == file.name().as_bytes(),
        })
    }

    fn read_member(&mut self, index: usize) -> std::io::Result<Self::MemberReader<'_>> {
        Ok(self.archive.by_index(index)?)
    }
}

/// Adapter wrapping a [`ZipWriter`] as a [`ContainerWriter`].
pub struct ZipContainerWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
}

impl<W: Write + Seek> ZipContainerWriter<W> {
    pub fn new(writer: W) -> Self {
        ZipContainerWriter { writer: ZipWriter::new(writer) }
    }
}

impl<W: Write + Seek> ContainerWriter for ZipContainerWriter<W> {
    fn start_member(
        &mut self,
        filename: &str,
        date_time: DateTime,
        _internal_attr: u16,
        external_attr: u32,
        arc0_payload: &[u8],
        compression: Compression,
        _set_utf8_flag: bool,
    ) -> std::io::Result<()> {
        let method = match compression {
            Compression::Stored => ZipCompressionMethod::Stored,
            Compression::Deflated => ZipCompressionMethod::Deflated,
        };
        let options: FileOptions<'_, ExtendedFileOptions> = FileOptions::default()
            .compression_method(method)
            .last_modified_time(to_zip_datetime(date_time))
            .unix_permissions(external_attr >> 16)
            .large_file(false);
        let mut options = options;
        if !arc0_payload.is_empty() {
            options = options.add_extra_data(ARC0_HEADER_ID, arc0_payload.to_vec(), false)?;
        }
        self.writer.start_file(filename.to_owned(), options)?;
        Ok(())
    }

    fn write_member_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn add_directory(&mut self, dirname: &str, date_time: DateTime, external_attr: u32) -> std::io::Result<()> {
        let options: FileOptions<'_, ()> = FileOptions::default()
            .last_modified_time(to_zip_datetime(date_time))
            .unix_permissions(external_attr >> 16);
        self.writer.add_directory(dirname.to_owned(), options)?;
        Ok(())
    }

    fn finish(mut self) -> std::io::Result<()> {
        self.writer.finish()?;
        Ok(())
    }
}
