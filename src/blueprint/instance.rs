//! The two concrete blueprint forms: project blueprints loaded from
//! standalone recipe files, and instance blueprints embedded in
//! snapshots together with their capture metadata.

use crate::blueprint::{xml, Blueprint};
use crate::error::{BlueprintError, EngineError};
use crate::snapshot::{SnapshotReader, BLUEPRINT_ENTRY};
use crate::types::InstanceMetadata;
use std::path::{Path, PathBuf};

/// A blueprint loaded from a recipe file on disk.
pub struct ProjectBlueprint {
    blueprint: Blueprint,
    source_path: PathBuf,
}

impl ProjectBlueprint {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, BlueprintError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)?;
        Self::load_from_string(&document, path)
    }

    pub fn load_from_string(
        document: &str,
        source_path: impl AsRef<Path>,
    ) -> Result<Self, BlueprintError> {
        Ok(Self {
            blueprint: Blueprint::from_document(document)?,
            source_path: source_path.as_ref().to_path_buf(),
        })
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn into_blueprint(self) -> Blueprint {
        self.blueprint
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), BlueprintError> {
        std::fs::write(path, self.blueprint.to_document()?)?;
        Ok(())
    }
}

/// A blueprint read back out of a snapshot, carrying the metadata of
/// the capture that produced it.
pub struct InstanceBlueprint {
    blueprint: Blueprint,
    snapshot_path: PathBuf,
    metadata: InstanceMetadata,
}

impl InstanceBlueprint {
    /// Load the embedded blueprint from an open snapshot.
    pub fn load_from_archive(reader: &SnapshotReader) -> Result<Self, EngineError> {
        let document = reader.read_text(BLUEPRINT_ENTRY)?;
        Ok(Self::load_from_string(&document, reader.path())?)
    }

    /// Snapshots written before the `<instance>` element existed get
    /// fallback metadata: captured now, on this machine, by this user.
    pub fn load_from_string(
        document: &str,
        snapshot_path: impl AsRef<Path>,
    ) -> Result<Self, BlueprintError> {
        let mut blueprint = Blueprint::default();
        blueprint.populate_builtins();
        let parsed = xml::parse_into(&mut blueprint, document)?;
        blueprint.resolve_user_variables()?;

        let metadata = parsed.unwrap_or_else(|| xml::fallback_instance_metadata(&blueprint));
        Ok(Self {
            blueprint,
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
            metadata,
        })
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn metadata(&self) -> &InstanceMetadata {
        &self.metadata
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn to_document(&self) -> Result<String, BlueprintError> {
        self.blueprint.to_instance_document(&self.metadata)
    }
}
