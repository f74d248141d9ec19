//! VRM extension metadata, read from the glTF JSON chunk.

use serde::Deserialize;
use std::borrow::Cow;

use crate::model::ModelFormat;

const GLB_MAGIC: &[u8; 4] = b"glTF";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VrmInfo {
    pub format: ModelFormat,
    pub title: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
}

#[derive(Deserialize, Default)]
struct Root {
    #[serde(default)]
    extensions: Extensions,
}

#[derive(Deserialize, Default)]
struct Extensions {
    #[serde(rename = "VRM")]
    vrm0: Option<Vrm0>,
    #[serde(rename = "VRMC_vrm")]
    vrm1: Option<Vrm1>,
}

#[derive(Deserialize)]
struct Vrm0 {
    #[serde(default)]
    meta: Vrm0Meta,
}

#[derive(Deserialize, Default)]
struct Vrm0Meta {
    title: Option<String>,
    author: Option<String>,
    version: Option<String>,
}

#[derive(Deserialize)]
struct Vrm1 {
    #[serde(default)]
    meta: Vrm1Meta,
}

#[derive(Deserialize, Default)]
struct Vrm1Meta {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
}

/// The JSON part of a `.gltf` or `.glb`/`.vrm` file
pub fn json_chunk(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ::gltf::Error> {
    if bytes.starts_with(GLB_MAGIC) {
        Ok(::gltf::Glb::from_slice(bytes)?.json)
    } else {
        Ok(Cow::Borrowed(bytes))
    }
}

/// Detect the VRM version and pull the human-readable metadata.
/// VRM 1.0 wins when a file carries both extensions.
pub fn read_vrm_info(json: &[u8]) -> Result<VrmInfo, serde_json::Error> {
    let root: Root = serde_json::from_slice(json)?;
    let Extensions { vrm0, vrm1 } = root.extensions;

    let info = match (vrm1, vrm0) {
        (Some(vrm1), _) => VrmInfo {
            format: ModelFormat::Vrm1,
            title: vrm1.meta.name,
            author: (!vrm1.meta.authors.is_empty()).then(|| vrm1.meta.authors.join(", ")),
            version: vrm1.meta.version,
        },
        (None, Some(vrm0)) => VrmInfo {
            format: ModelFormat::Vrm0,
            title: vrm0.meta.title,
            author: vrm0.meta.author,
            version: vrm0.meta.version,
        },
        (None, None) => VrmInfo::default(),
    };
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_gltf_has_no_vrm_info() {
        let info = read_vrm_info(br#"{"asset":{"version":"2.0"}}"#).unwrap();
        assert_eq!(info, VrmInfo::default());
        assert_eq!(info.format, ModelFormat::Gltf);
    }

    #[test]
    fn test_vrm0_meta() {
        let json = br#"{"extensions":{"VRM":{"meta":{"title":"Nan","author":"someone","version":"0.1"}}}}"#;
        let info = read_vrm_info(json).unwrap();
        assert_eq!(info.format, ModelFormat::Vrm0);
        assert_eq!(info.title.as_deref(), Some("Nan"));
        assert_eq!(info.author.as_deref(), Some("someone"));
        assert_eq!(info.version.as_deref(), Some("0.1"));
    }

    #[test]
    fn test_vrm1_meta_joins_authors() {
        let json = br#"{"extensions":{"VRMC_vrm":{"specVersion":"1.0","meta":{"name":"Nan","authors":["a","b"]}}}}"#;
        let info = read_vrm_info(json).unwrap();
        assert_eq!(info.format, ModelFormat::Vrm1);
        assert_eq!(info.title.as_deref(), Some("Nan"));
        assert_eq!(info.author.as_deref(), Some("a, b"));
        assert_eq!(info.version, None);
    }

    #[test]
    fn test_vrm1_takes_precedence() {
        let json = br#"{"extensions":{"VRM":{"meta":{"title":"old"}},"VRMC_vrm":{"meta":{"name":"new"}}}}"#;
        let info = read_vrm_info(json).unwrap();
        assert_eq!(info.format, ModelFormat::Vrm1);
        assert_eq!(info.title.as_deref(), Some("new"));
    }

    #[test]
    fn test_other_extensions_are_ignored() {
        let json = br#"{"extensions":{"KHR_lights_punctual":{"lights":[]}}}"#;
        assert_eq!(read_vrm_info(json).unwrap().format, ModelFormat::Gltf);
    }

    #[test]
    fn test_json_chunk_passes_text_through() {
        let text = br#"{"asset":{"version":"2.0"}}"#;
        assert_eq!(json_chunk(text).unwrap().as_ref(), text.as_slice());
    }
}
