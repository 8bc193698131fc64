// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use cmspack::{IngestConfig, UploadedPackage, db};
use flate2::Compression;
use flate2::write::GzEncoder;
use rusqlite::Connection;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A packages root, scratch directory and catalog database under one temp dir.
///
/// Keep the struct alive for the duration of the test; dropping it removes
/// everything.
pub struct TestSite {
    pub temp: TempDir,
    pub config: IngestConfig,
    pub db_path: String,
}

impl TestSite {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let config = IngestConfig::rooted_at(temp.path());
        let db_path = temp
            .path()
            .join("cmspack.db")
            .to_str()
            .unwrap()
            .to_string();
        db::init(&db_path).unwrap();
        Self {
            temp,
            config,
            db_path,
        }
    }

    pub fn conn(&self) -> Connection {
        db::open(&self.db_path).unwrap()
    }

    /// Write a zip upload into the temp dir
    pub fn zip(&self, name: &str, files: &[(&str, &[u8])]) -> UploadedPackage {
        let path = self.temp.path().join("uploads").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_zip(&path, files);
        UploadedPackage::from_path(&path).unwrap()
    }

    /// Write a .tar.gz upload into the temp dir
    pub fn tar_gz(&self, name: &str, files: &[(&str, &[u8])]) -> UploadedPackage {
        let path = self.temp.path().join("uploads").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_tar_gz(&path, files);
        UploadedPackage::from_path(&path).unwrap()
    }

    /// Number of entries left in the scratch directory (0 if it does not exist)
    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(&self.config.scratch_dir)
            .map(|d| d.count())
            .unwrap_or(0)
    }
}

pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

pub fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, *name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}
