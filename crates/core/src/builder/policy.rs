//! Compile policy: base flags, allowed link libraries, per-variant deltas.
//!
//! The policy encapsulates every knob that affects what the compiler is
//! asked to do, so the executor contains no opinions. Profiles can be
//! loaded from YAML or JSON files; the built-in default is the locked
//! linux-x86_64-elf-gcc-c profile.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Variant;

/// Error type for policy loading.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile {path}: {message}")]
    Parse { path: String, message: String },
}

/// Per-variant compile policy delta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantDelta {
    #[serde(default)]
    pub add_cflags: Vec<String>,
    /// Debug variant: assert `.debug_info`/`.debug_line` presence post-link.
    #[serde(default)]
    pub dwarf_presence_check: bool,
    /// Stripped variant: run the strip tool post-link.
    #[serde(default)]
    pub strip: bool,
}

/// Requested compilation policy for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilePolicy {
    /// Stable identifier; changing any parameter should change this.
    pub profile_id: String,
    pub compiler: String,
    pub language: String,
    pub base_cflags: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    /// Allowed link libraries, e.g. `-lm`. Nothing else may be linked.
    #[serde(default)]
    pub link_libs: Vec<String>,
    pub variant_deltas: BTreeMap<String, VariantDelta>,
}

impl CompilePolicy {
    /// The locked default profile: linux-x86_64-elf-gcc-c.
    pub fn default_profile() -> Self {
        let mut variant_deltas = BTreeMap::new();
        variant_deltas.insert(
            Variant::Debug.as_str().to_string(),
            VariantDelta {
                add_cflags: vec!["-g".to_string()],
                dwarf_presence_check: true,
                strip: false,
            },
        );
        variant_deltas.insert(Variant::Release.as_str().to_string(), VariantDelta::default());
        variant_deltas.insert(
            Variant::Stripped.as_str().to_string(),
            VariantDelta { add_cflags: vec![], dwarf_presence_check: false, strip: true },
        );

        Self {
            profile_id: "linux-x86_64-elf-gcc-c".to_string(),
            compiler: "gcc".to_string(),
            language: "c".to_string(),
            base_cflags: vec![
                "-std=c11".to_string(),
                "-fno-omit-frame-pointer".to_string(),
                "-mno-omit-leaf-frame-pointer".to_string(),
            ],
            include_dirs: vec![],
            defines: vec![],
            link_libs: vec!["-lm".to_string()],
            variant_deltas,
        }
    }

    /// Load a policy from a YAML or JSON file (by extension).
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::Io { path: path.display().to_string(), source: e })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if ext == "json" {
            serde_json::from_str(&body).map_err(|e| PolicyError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        } else {
            serde_yaml::from_str(&body).map_err(|e| PolicyError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    }

    /// The delta for a variant; a missing entry behaves as no delta.
    pub fn delta_for(&self, variant: Variant) -> VariantDelta {
        self.variant_deltas.get(variant.as_str()).cloned().unwrap_or_default()
    }

    /// Flags shared by every compile invocation: base cflags, defines,
    /// include dirs.
    pub fn common_flags(&self) -> Vec<String> {
        let mut flags = self.base_cflags.clone();
        for def in &self.defines {
            flags.push(format!("-D{def}"));
        }
        for dir in &self.include_dirs {
            flags.push(format!("-I{dir}"));
        }
        flags
    }

    /// Flags for the preprocess-only invocation: language and include flags,
    /// no optimization, no debug.
    pub fn preprocess_flags(&self) -> Vec<String> {
        let mut flags = vec!["-E".to_string()];
        flags.extend(self.common_flags());
        flags
    }
}
