//! Pre-load checks for the detector and landmark model files.
//!
//! OpenCV reports a bad cascade or LBF model late and vaguely, so both paths
//! are checked here first: the file must exist, be a non-empty regular file,
//! and match a pinned SHA-256 digest when one is configured.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which external capability a model file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Face detector (e.g. a Haar cascade XML).
    Detector,
    /// Landmark fitter (e.g. an LBF model YAML).
    Landmarks,
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRole::Detector => f.write_str("face detector"),
            ModelRole::Landmarks => f.write_str("landmark"),
        }
    }
}

/// A model path plus its optional pinned digest.
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub role: ModelRole,
    pub path: PathBuf,
    pub sha256: Option<String>,
}

impl ModelFile {
    pub fn new(role: ModelRole, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            path: path.into(),
            sha256: None,
        }
    }

    pub fn pinned(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.map(|s| s.trim().to_ascii_lowercase());
        self
    }
}

#[derive(Error, Debug)]
pub enum ModelIntegrityError {
    #[error("{role} model not found: {path}")]
    MissingModel { role: ModelRole, path: PathBuf },

    #[error("{role} model is not a regular file: {path}")]
    NotAFile { role: ModelRole, path: PathBuf },

    #[error("{role} model is empty: {path}")]
    Empty { role: ModelRole, path: PathBuf },

    #[error("failed to open model file: {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read model file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{role} model checksum mismatch ({path})\n  expected: {expected}\n  got:      {got}"
    )]
    ChecksumMismatch {
        role: ModelRole,
        path: PathBuf,
        expected: String,
        got: String,
    },
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file_hex(path: &Path) -> Result<String, ModelIntegrityError> {
    let mut file = fs::File::open(path).map_err(|source| ModelIntegrityError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file
            .read(&mut buf)
            .map_err(|source| ModelIntegrityError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check one model file. Returns its digest.
pub fn verify_model(model: &ModelFile) -> Result<String, ModelIntegrityError> {
    let path = &model.path;
    let meta = fs::metadata(path).map_err(|_| ModelIntegrityError::MissingModel {
        role: model.role,
        path: path.clone(),
    })?;

    if !meta.is_file() {
        return Err(ModelIntegrityError::NotAFile {
            role: model.role,
            path: path.clone(),
        });
    }
    if meta.len() == 0 {
        return Err(ModelIntegrityError::Empty {
            role: model.role,
            path: path.clone(),
        });
    }

    let digest = sha256_file_hex(path)?;
    if let Some(expected) = &model.sha256 {
        if &digest != expected {
            return Err(ModelIntegrityError::ChecksumMismatch {
                role: model.role,
                path: path.clone(),
                expected: expected.clone(),
                got: digest,
            });
        }
    }

    tracing::debug!(
        role = %model.role,
        path = %path.display(),
        bytes = meta.len(),
        sha256 = %digest,
        pinned = model.sha256.is_some(),
        "model file verified"
    );
    Ok(digest)
}

/// Check every model, stopping at the first failure.
pub fn verify_models(models: &[ModelFile]) -> Result<(), ModelIntegrityError> {
    for model in models {
        verify_model(model)?;
    }
    Ok(())
}
