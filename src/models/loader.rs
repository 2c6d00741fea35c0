//! Artifact file loading and atomic persistence

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ArtifactError;
use crate::models::artifact::{FittedArtifact, ARTIFACT_FORMAT_VERSION, ARTIFACT_MAGIC};
use crate::models::DamageModel;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Load a fitted artifact. Any failure here means the service must not start.
pub fn load_artifact<P: AsRef<Path>>(path: P) -> Result<FittedArtifact, ArtifactError> {
    let path = path.as_ref();

    info!(path = %path.display(), "Loading model artifact");

    if !path.exists() {
        return Err(ArtifactError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = BufReader::new(File::open(path).map_err(io_err(path))?);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic).map_err(|_| ArtifactError::BadMagic {
        path: path.to_path_buf(),
    })?;
    if &magic != ARTIFACT_MAGIC {
        return Err(ArtifactError::BadMagic {
            path: path.to_path_buf(),
        });
    }

    let mut version = [0u8; 4];
    reader.read_exact(&mut version).map_err(io_err(path))?;
    let found = u32::from_le_bytes(version);
    if found != ARTIFACT_FORMAT_VERSION {
        return Err(ArtifactError::VersionMismatch {
            expected: ARTIFACT_FORMAT_VERSION,
            found,
        });
    }

    let artifact: FittedArtifact =
        bincode::deserialize_from(reader).map_err(|source| ArtifactError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    artifact
        .check_consistency()
        .map_err(|reason| ArtifactError::Inconsistent {
            path: path.to_path_buf(),
            reason,
        })?;

    info!(
        artifact_id = %artifact.artifact_id(),
        created_at = %artifact.metadata.created_at,
        features = artifact.transformer.feature_count(),
        outputs = artifact.model.n_outputs(),
        "Artifact loaded successfully"
    );

    Ok(artifact)
}

/// Persist an artifact. The bytes go to a sibling temporary file that is
/// renamed over `path`, so readers never observe a partial artifact.
pub fn save_artifact<P: AsRef<Path>>(artifact: &FittedArtifact, path: P) -> Result<(), ArtifactError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".partial");
    let tmp_path: PathBuf = path.with_file_name(tmp_name);

    {
        let file = File::create(&tmp_path).map_err(io_err(&tmp_path))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(ARTIFACT_MAGIC).map_err(io_err(&tmp_path))?;
        writer
            .write_all(&ARTIFACT_FORMAT_VERSION.to_le_bytes())
            .map_err(io_err(&tmp_path))?;
        bincode::serialize_into(&mut writer, artifact).map_err(ArtifactError::Encode)?;
        writer.flush().map_err(io_err(&tmp_path))?;
        writer.get_ref().sync_all().map_err(io_err(&tmp_path))?;
    }

    fs::rename(&tmp_path, path).map_err(io_err(path))?;

    info!(
        artifact_id = %artifact.artifact_id(),
        path = %path.display(),
        "Artifact saved"
    );

    Ok(())
}
