//! Model artifact encodings.
//!
//! Two serializations of the same [`ModelArtifact`] payload are accepted and told apart by their
//! leading bytes, so callers never name the format:
//!
//! - **legacy binary**: the 8-byte [`LEGACY_MAGIC`] followed by a bincode body (standard config);
//! - **JSON**: a UTF-8 document starting with `{` (after optional whitespace).

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use super::{ModelFamily, Tree};
use crate::error::ModelLoadError;

/// Header of legacy binary artifacts.
pub const LEGACY_MAGIC: &[u8; 8] = b"OLYMDL\0\x01";

/// Serialized model payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// How the trees combine.
    pub family: ModelFamily,
    /// Training-time feature names, when the exporter recorded them.
    pub feature_names: Option<Vec<String>>,
    /// Additive offset (gradient boosting only).
    #[serde(default)]
    pub base_score: f64,
    /// The ensemble.
    pub trees: Vec<Tree>,
}

/// Encoding an artifact was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Magic header + bincode.
    LegacyBinary,
    /// JSON document.
    Json,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactFormat::LegacyBinary => "legacy_binary",
            ArtifactFormat::Json => "json",
        })
    }
}

/// Detect the encoding from the leading bytes.
pub fn detect(bytes: &[u8]) -> Option<ArtifactFormat> {
    if bytes.starts_with(LEGACY_MAGIC) {
        return Some(ArtifactFormat::LegacyBinary);
    }
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Some(ArtifactFormat::Json),
        _ => None,
    }
}

/// Decode an artifact in whichever supported encoding it uses.
pub fn decode(bytes: &[u8]) -> Result<(ModelArtifact, ArtifactFormat), ModelLoadError> {
    match detect(bytes).ok_or(ModelLoadError::UnknownFormat)? {
        ArtifactFormat::LegacyBinary => {
            let body = &bytes[LEGACY_MAGIC.len()..];
            let (artifact, read): (ModelArtifact, usize) =
                bincode::serde::decode_from_slice(body, bincode::config::standard())?;
            if read != body.len() {
                return Err(ModelLoadError::Invalid(format!(
                    "{} trailing bytes after legacy body",
                    body.len() - read
                )));
            }
            Ok((artifact, ArtifactFormat::LegacyBinary))
        }
        ArtifactFormat::Json => Ok((serde_json::from_slice(bytes)?, ArtifactFormat::Json)),
    }
}

/// Read and decode an artifact file.
pub fn read_artifact(path: &Path) -> Result<(ModelArtifact, ArtifactFormat), ModelLoadError> {
    let bytes = fs::read(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes)
}

/// Encode in the legacy binary format.
pub fn encode_legacy(artifact: &ModelArtifact) -> Result<Vec<u8>, bincode::error::EncodeError> {
    let mut out = LEGACY_MAGIC.to_vec();
    out.extend(bincode::serde::encode_to_vec(artifact, bincode::config::standard())?);
    Ok(out)
}

/// Encode as pretty-printed JSON.
pub fn encode_json(artifact: &ModelArtifact) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    fn sample() -> ModelArtifact {
        ModelArtifact {
            family: ModelFamily::RandomForest,
            feature_names: None,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![Node::split(0, 250.5, 1, 2), Node::leaf(4.0), Node::leaf(40.0)],
            }],
        }
    }

    #[test]
    fn detects_both_encodings() {
        let legacy = encode_legacy(&sample()).unwrap();
        assert_eq!(detect(&legacy), Some(ArtifactFormat::LegacyBinary));
        let (decoded, format) = decode(&legacy).unwrap();
        assert_eq!(format, ArtifactFormat::LegacyBinary);
        assert_eq!(decoded, sample());

        let json = b"\n  {\"family\":\"random_forest\",\"trees\":[{\"nodes\":[{\"feature\":0,\"threshold\":0.0,\"left\":0,\"right\":0,\"value\":3.0}]}]}";
        let (decoded, format) = decode(json).unwrap();
        assert_eq!(format, ArtifactFormat::Json);
        assert_eq!(decoded.feature_names, None);
        assert_eq!(decoded.base_score, 0.0);
    }

    #[test]
    fn unknown_and_corrupt_bytes() {
        assert!(matches!(decode(b"\x80\x04pickle"), Err(ModelLoadError::UnknownFormat)));
        assert!(matches!(decode(b""), Err(ModelLoadError::UnknownFormat)));

        let mut truncated = encode_legacy(&sample()).unwrap();
        truncated.truncate(LEGACY_MAGIC.len() + 3);
        assert!(matches!(decode(&truncated), Err(ModelLoadError::LegacyDecode(_))));

        let mut padded = encode_legacy(&sample()).unwrap();
        padded.extend_from_slice(&[0, 0]);
        assert!(matches!(decode(&padded), Err(ModelLoadError::Invalid(_))));

        assert!(matches!(decode(b"{\"family\":"), Err(ModelLoadError::JsonDecode(_))));
    }

    #[test]
    fn json_encoding_is_readable() {
        let json = String::from_utf8(encode_json(&sample()).unwrap()).unwrap();
        assert!(json.contains("\"family\": \"random_forest\""));
        assert!(json.contains("\"threshold\": 250.5"));
    }
}
