// src/ingest/mod.rs

//! Package ingestion pipeline
//!
//! One upload runs through these states, synchronously, in one call:
//!
//! ```text
//! Uploaded -> Extracted -> RootIdentified -> MetadataRead -> Transformed -> Installed -> Done
//!                                                                     (any) -> Failed
//! ```
//!
//! The scratch tree is removed on the way into `Done` or `Failed`. Nothing is
//! retried; the admin re-submits the upload instead. The catalog insert is the
//! final write, so a failed run never leaves a catalog row behind.

pub mod classify;
pub mod extract;
pub mod install;
pub mod metadata;
pub mod profile;
pub mod scratch;
pub mod transform;
pub mod upload;

pub use classify::{PackageKind, PackageRoot, detect_kind, find_package_root};
pub use extract::{ArchiveFormat, ExtractionSummary, extract_archive};
pub use install::{RegisterOutcome, SlugResolution, slugify};
pub use metadata::PackageMetadata;
pub use profile::{PLUGIN_PROFILE, PackageProfile, THEME_PROFILE, TransformPolicy};
pub use scratch::ScratchTree;
pub use transform::{TransformSummary, TransformationLog, Transformer};
pub use upload::UploadedPackage;

use crate::auth::AuthContext;
use crate::config::IngestConfig;
use crate::db::models::{InstalledPackage, PackageType};
use crate::error::{Error, Result};
use crate::filesystem::remove_tree_best_effort;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Uploaded,
    Extracted,
    RootIdentified,
    MetadataRead,
    Transformed,
    Installed,
    Done,
    Failed,
}

/// Stages that can be forced to fail in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extraction,
    Classification,
    Metadata,
    Transform,
    Install,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Extraction => "extraction",
            PipelineStage::Classification => "classification",
            PipelineStage::Metadata => "metadata",
            PipelineStage::Transform => "transform",
            PipelineStage::Install => "install",
        };
        f.write_str(name)
    }
}

/// How the install step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    Installed,
    /// A catalog row for the slug already existed; nothing was written
    AlreadyInstalled,
}

/// Details of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct InstallDetails {
    pub theme_name: String,
    pub theme_slug: String,
    pub is_wordpress: bool,
    pub files_converted: usize,
    pub conversions: TransformationLog,
    pub package_type: PackageType,
    pub outcome: InstallOutcome,
    #[serde(skip)]
    pub package_id: i64,
}

/// Result handed back to the admin
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Option<InstallDetails>,
    /// Final state, `Done` or `Failed`
    #[serde(skip)]
    pub state: PipelineState,
    /// Last state reached before finishing
    #[serde(skip)]
    pub reached: PipelineState,
    #[serde(skip)]
    pub failure: Option<Error>,
}

impl IngestReport {
    fn success(details: InstallDetails) -> Self {
        let label = match details.package_type {
            PackageType::Theme => "Theme",
            PackageType::Plugin => "Plugin",
        };
        let message = match details.outcome {
            InstallOutcome::Installed => {
                format!("{} '{}' installed successfully!", label, details.theme_name)
            }
            InstallOutcome::AlreadyInstalled => {
                format!("{} '{}' is already installed.", label, details.theme_name)
            }
        };
        Self {
            success: true,
            message: Some(message),
            error: None,
            details: Some(details),
            state: PipelineState::Done,
            reached: PipelineState::Installed,
            failure: None,
        }
    }

    fn failure(error: Error, reached: PipelineState) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
            details: None,
            state: PipelineState::Failed,
            reached,
            failure: Some(error),
        }
    }
}

/// Runs uploads through the pipeline against one catalog connection
pub struct Ingestor<'a> {
    config: &'a IngestConfig,
    conn: &'a Connection,
    fault: Option<PipelineStage>,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a IngestConfig, conn: &'a Connection) -> Self {
        Self {
            config,
            conn,
            fault: None,
        }
    }

    /// Force the run to fail when it reaches `stage`
    #[doc(hidden)]
    pub fn with_fault(mut self, stage: PipelineStage) -> Self {
        self.fault = Some(stage);
        self
    }

    /// Ingest one upload; every failure is reported, never raised
    pub fn ingest(
        &self,
        auth: &AuthContext,
        upload: &UploadedPackage,
        package_type: PackageType,
    ) -> IngestReport {
        let mut reached = PipelineState::Uploaded;
        match self.execute(auth, upload, package_type, &mut reached) {
            Ok(details) => {
                info!(
                    "Ingested {} '{}' ({:?})",
                    package_type, details.theme_slug, details.outcome
                );
                IngestReport::success(details)
            }
            Err(e) => {
                warn!("Ingest of {} failed after {:?}: {}", upload.file_name, reached, e);
                IngestReport::failure(e, reached)
            }
        }
    }

    fn execute(
        &self,
        auth: &AuthContext,
        upload: &UploadedPackage,
        package_type: PackageType,
        reached: &mut PipelineState,
    ) -> Result<InstallDetails> {
        auth.require_admin()?;
        let profile = PackageProfile::for_type(package_type);
        upload.validate(self.config, package_type)?;

        std::fs::create_dir_all(&self.config.scratch_dir)?;
        let mut scratch = ScratchTree::create(&self.config.scratch_dir, profile.scratch_prefix)?;
        let result = self.run_stages(&scratch, upload, profile, reached);
        scratch.cleanup();
        result
    }

    fn inject(&self, stage: PipelineStage) -> Result<()> {
        if self.fault == Some(stage) {
            return Err(Error::Injected(stage.to_string()));
        }
        Ok(())
    }

    fn run_stages(
        &self,
        scratch: &ScratchTree,
        upload: &UploadedPackage,
        profile: &PackageProfile,
        reached: &mut PipelineState,
    ) -> Result<InstallDetails> {
        let extract_dir = scratch.extract_dir();
        let staging = scratch.staging_dir();

        self.inject(PipelineStage::Extraction)?;
        extract_archive(upload, &extract_dir)?;
        *reached = PipelineState::Extracted;

        self.inject(PipelineStage::Classification)?;
        let root = find_package_root(&extract_dir, profile)?;
        let kind = detect_kind(&root, profile);
        info!("Package kind: {:?}", kind);
        *reached = PipelineState::RootIdentified;

        self.inject(PipelineStage::Metadata)?;
        let metadata = PackageMetadata::read(&root, profile);
        info!("Package '{}' version {}", metadata.name, metadata.version);
        *reached = PipelineState::MetadataRead;

        self.inject(PipelineStage::Transform)?;
        let transformer = Transformer::new(kind, profile.transform, &self.config.base_url);
        let mut summary = transformer.transform_tree(&root.path, &staging)?;
        *reached = PipelineState::Transformed;

        self.inject(PipelineStage::Install)?;
        let (slug, outcome, package_id) =
            self.install(&staging, &root, &metadata, profile, &transformer, &mut summary)?;
        *reached = PipelineState::Installed;

        Ok(InstallDetails {
            theme_name: metadata.name,
            theme_slug: slug,
            is_wordpress: kind.is_framework(),
            files_converted: summary.files_converted,
            conversions: summary.log,
            package_type: profile.package_type,
            outcome,
            package_id,
        })
    }

    fn install(
        &self,
        staging: &std::path::Path,
        root: &PackageRoot,
        metadata: &PackageMetadata,
        profile: &PackageProfile,
        transformer: &Transformer,
        summary: &mut TransformSummary,
    ) -> Result<(String, InstallOutcome, i64)> {
        let package_type = profile.package_type;
        let type_dir = self.config.type_dir(package_type);
        let base = slugify(&metadata.name, package_type.slug_fallback());

        let mut resolution = install::resolve_slug(self.conn, &type_dir, package_type, &base)?;
        if let SlugResolution::AlreadyInstalled(existing) = &resolution {
            return Ok((
                existing.slug.clone(),
                InstallOutcome::AlreadyInstalled,
                existing.id.unwrap_or_default(),
            ));
        }

        install::ensure_manifest(staging, metadata, profile)?;
        if let Some(line) =
            install::ensure_entry_file(staging, root, profile, transformer, &self.config.base_url)?
        {
            info!("{}", line);
            summary.log.push(line);
            summary.files_converted += 1;
        }

        let target = match install::install_tree(staging, &type_dir, resolution.slug()) {
            Err(Error::SlugAlreadyInstalled(slug)) => {
                // Another run took the directory between the check and the copy
                warn!("Directory for '{}' appeared during install, resolving again", slug);
                resolution = install::resolve_slug(self.conn, &type_dir, package_type, &base)?;
                if let SlugResolution::AlreadyInstalled(existing) = &resolution {
                    return Ok((
                        existing.slug.clone(),
                        InstallOutcome::AlreadyInstalled,
                        existing.id.unwrap_or_default(),
                    ));
                }
                install::install_tree(staging, &type_dir, resolution.slug())?
            }
            other => other?,
        };

        let mut record = InstalledPackage::new(
            package_type,
            metadata.name.clone(),
            resolution.slug().to_string(),
            install::main_file(profile, root),
        );
        record.description = metadata.description.clone();
        record.version = metadata.version.clone();
        record.author = metadata.author.clone();
        record.config = profile.default_config.to_string();

        match install::register(self.conn, &mut record) {
            Ok(RegisterOutcome::Inserted(id)) => {
                Ok((record.slug, InstallOutcome::Installed, id))
            }
            Ok(RegisterOutcome::AlreadyPresent(id)) => {
                Ok((record.slug, InstallOutcome::AlreadyInstalled, id))
            }
            Err(e) => {
                remove_tree_best_effort(&target);
                Err(e)
            }
        }
    }
}
