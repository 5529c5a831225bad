//! On-disk calibration artifacts, one JSON file per user

use crate::calibration::CalibrationModel;
use crate::error::MonitorError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const ARTIFACT_SUFFIX: &str = ".calibration.json";

/// Directory of per-user calibration artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationStore {
    root: PathBuf,
}

impl CalibrationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact path for a user.
    ///
    /// Bytes outside `[a-z0-9-]` are written as `_` plus two hex digits, so
    /// distinct ids never share a file, even on case-insensitive filesystems.
    /// The empty id maps to a lone `_`.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        let mut name = encode_user_id(user_id);
        name.push_str(ARTIFACT_SUFFIX);
        self.root.join(name)
    }

    pub fn exists(&self, user_id: &str) -> bool {
        self.path_for(user_id).is_file()
    }

    /// Load a user's model; `Ok(None)` when no artifact exists
    pub fn load(&self, user_id: &str) -> Result<Option<CalibrationModel>, MonitorError> {
        let path = self.path_for(user_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let model: CalibrationModel = serde_json::from_str(&content).map_err(|e| {
            MonitorError::CorruptModel(format!("{}: {}", path.display(), e))
        })?;
        model.validate()?;
        Ok(Some(model))
    }

    /// Write a user's model. Readers see either the old or the new file.
    pub fn save(&self, user_id: &str, model: &CalibrationModel) -> Result<PathBuf, MonitorError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(user_id);
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));

        let json = serde_json::to_vec_pretty(model)?;
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(path)
    }

    /// Remove a user's artifact. Returns whether one existed.
    pub fn delete(&self, user_id: &str) -> Result<bool, MonitorError> {
        match fs::remove_file(self.path_for(user_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_user_id(user_id: &str) -> String {
    if user_id.is_empty() {
        return "_".to_string();
    }
    let mut name = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("_{:02x}", byte));
        }
    }
    name
}
