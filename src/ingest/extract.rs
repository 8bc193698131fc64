// src/ingest/extract.rs

//! Archive extraction into a scratch tree
//!
//! Supports ZIP and tar (optionally gzip-compressed). Every entry name is
//! sanitized before anything is written; an entry that would land outside
//! the extraction directory fails the whole extraction.

use crate::compression::{CompressionError, CompressionFormat, create_decoder};
use crate::error::{Error, Result};
use crate::filesystem::path::safe_join;
use crate::ingest::upload::UploadedPackage;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tar::{Archive, EntryType};
use tracing::{debug, info, warn};

/// Maximum size for a single file during extraction (512 MB)
pub const MAX_EXTRACTION_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Container format of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar(CompressionFormat),
}

impl ArchiveFormat {
    /// Detect from the file name, sniffing magic bytes for a bare `.gz`
    pub fn detect(upload: &UploadedPackage) -> Result<Self> {
        let lower = upload.file_name.to_ascii_lowercase();

        if lower.ends_with(".zip") {
            return Ok(Self::Zip);
        }
        if lower.ends_with(".tar") || lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Ok(Self::Tar(CompressionFormat::from_extension(&lower)));
        }
        if lower.ends_with(".gz") {
            let mut magic = [0u8; 2];
            File::open(&upload.path)
                .and_then(|mut f| f.read_exact(&mut magic))
                .map_err(|e| Error::ExtractionFailed(format!("{}: {}", upload.file_name, e)))?;
            return match CompressionFormat::from_magic_bytes(&magic) {
                CompressionFormat::Gzip => Ok(Self::Tar(CompressionFormat::Gzip)),
                CompressionFormat::None => Err(Error::ExtractionFailed(format!(
                    "{} is not gzip-compressed",
                    upload.file_name
                ))),
            };
        }

        Err(Error::Compression(CompressionError::UnsupportedFormat(
            upload.file_name.clone(),
        )))
    }
}

/// Counts of what an extraction wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Fully unpack `upload` into `dest`
pub fn extract_archive(upload: &UploadedPackage, dest: &Path) -> Result<ExtractionSummary> {
    let format = ArchiveFormat::detect(upload).map_err(|e| match e {
        Error::ExtractionFailed(_) => e,
        other => Error::ExtractionFailed(other.to_string()),
    })?;
    info!("Extracting {} ({:?})", upload.file_name, format);

    let summary = match format {
        ArchiveFormat::Zip => extract_zip(&upload.path, dest),
        ArchiveFormat::Tar(compression) => extract_tar(&upload.path, compression, dest),
    }
    .map_err(|e| match e {
        Error::ExtractionFailed(_) => e,
        other => Error::ExtractionFailed(format!("{}: {}", upload.file_name, other)),
    })?;

    debug!(
        "Extracted {} files, {} directories, {} bytes",
        summary.files, summary.directories, summary.bytes
    );
    Ok(summary)
}

fn extract_zip(path: &Path, dest: &Path) -> Result<ExtractionSummary> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::ExtractionFailed(format!("Failed to read zip archive: {}", e)))?;
    let mut summary = ExtractionSummary::default();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::ExtractionFailed(format!("Failed to read zip entry {}: {}", i, e)))?;
        let target = safe_join(dest, entry.name())?;

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            summary.directories += 1;
            continue;
        }

        check_entry_size(entry.name(), entry.size())?;
        summary.bytes += write_entry(&mut entry, &target)?;
        summary.files += 1;
    }

    Ok(summary)
}

fn extract_tar(path: &Path, compression: CompressionFormat, dest: &Path) -> Result<ExtractionSummary> {
    let file = File::open(path)?;
    let mut archive = Archive::new(create_decoder(file, compression));
    let mut summary = ExtractionSummary::default();

    let entries = archive
        .entries()
        .map_err(|e| Error::ExtractionFailed(format!("Failed to read archive entries: {}", e)))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| Error::ExtractionFailed(format!("Failed to read archive entry: {}", e)))?;
        let entry_path = entry
            .path()
            .map_err(|e| Error::ExtractionFailed(format!("Failed to get entry path: {}", e)))?
            .to_string_lossy()
            .to_string();

        match entry.header().entry_type() {
            EntryType::Directory => {
                // "./" style root entries sanitize to nothing
                if entry_path.trim_matches(|c| c == '.' || c == '/').is_empty() {
                    continue;
                }
                fs::create_dir_all(safe_join(dest, &entry_path)?)?;
                summary.directories += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                let target = safe_join(dest, &entry_path)?;
                check_entry_size(&entry_path, entry.size())?;
                summary.bytes += write_entry(&mut entry, &target)?;
                summary.files += 1;
            }
            EntryType::XGlobalHeader | EntryType::XHeader | EntryType::GNULongName => {}
            other => {
                warn!("Skipping unsupported tar entry {} ({:?})", entry_path, other);
            }
        }
    }

    Ok(summary)
}

fn check_entry_size(name: &str, size: u64) -> Result<()> {
    if size > MAX_EXTRACTION_FILE_SIZE {
        return Err(Error::ExtractionFailed(format!(
            "Entry {} is too large ({} bytes)",
            name, size
        )));
    }
    Ok(())
}

fn write_entry(reader: &mut impl Read, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    let written = io::copy(&mut reader.take(MAX_EXTRACTION_FILE_SIZE + 1), &mut out)?;
    if written > MAX_EXTRACTION_FILE_SIZE {
        return Err(Error::ExtractionFailed(format!(
            "Entry {} exceeds the extraction size limit",
            target.display()
        )));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("theme.zip");
        write_zip(&archive, &[("t/index.html", b"<html></html>"), ("t/css/a.css", b"a{}")]);
        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let upload = UploadedPackage::from_path(&archive).unwrap();
        let summary = extract_archive(&upload, &dest).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(fs::read_to_string(dest.join("t/css/a.css")).unwrap(), "a{}");
    }

    #[test]
    fn test_extract_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("theme.tar.gz");
        write_tar_gz(&archive, &[("site/style.css", b"body{}")]);
        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let upload = UploadedPackage::from_path(&archive).unwrap();
        extract_archive(&upload, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("site/style.css")).unwrap(), "body{}");
    }

    #[test]
    fn test_bare_gz_requires_gzip_magic() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("theme.gz");
        fs::write(&archive, b"not gzip at all").unwrap();

        let upload = UploadedPackage::from_path(&archive).unwrap();
        let err = extract_archive(&upload, temp.path()).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
    }

    #[test]
    fn test_corrupt_zip_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"PK\x03\x04 definitely truncated").unwrap();

        let upload = UploadedPackage::from_path(&archive).unwrap();
        let err = extract_archive(&upload, temp.path()).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
    }

    #[test]
    fn test_zip_traversal_entry_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        write_zip(&archive, &[("../escape.php", b"<?php")]);
        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let upload = UploadedPackage::from_path(&archive).unwrap();
        let err = extract_archive(&upload, &dest).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
        assert!(!temp.path().join("escape.php").exists());
    }
}
