//! Manifest parsing and batch builds
//!
//! Parses bake.toml and bakes every listed model.

use anyhow::{Context, Result};
use bake_common::BAKED_MODEL_EXT;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bake::bake_to_file;

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub models: BTreeMap<String, ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("baked/")
}

/// A model source: one concatenated file, or a mesh plus an optional separate animation
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModelEntry {
    Simple(PathBuf),
    Detailed {
        mesh: PathBuf,
        #[serde(default)]
        anim: Option<PathBuf>,
    },
}

impl ModelEntry {
    pub fn mesh(&self) -> &Path {
        match self {
            ModelEntry::Simple(p) => p,
            ModelEntry::Detailed { mesh, .. } => mesh,
        }
    }

    pub fn anim(&self) -> Option<&Path> {
        match self {
            ModelEntry::Simple(_) => None,
            ModelEntry::Detailed { anim, .. } => anim.as_deref(),
        }
    }

    /// Source paths resolved against the manifest's directory
    fn resolve(&self, base: &Path) -> (PathBuf, Option<PathBuf>) {
        (base.join(self.mesh()), self.anim().map(|a| base.join(a)))
    }
}

/// A loaded manifest together with the directory relative paths are resolved against
#[derive(Debug)]
pub struct LoadedManifest {
    pub manifest: Manifest,
    pub base_dir: PathBuf,
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<LoadedManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest = parse_manifest(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(LoadedManifest { manifest, base_dir })
}

/// Parse manifest text
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    Ok(toml::from_str(content)?)
}

/// Validate a manifest without building
pub fn validate(loaded: &LoadedManifest) -> Result<()> {
    if loaded.manifest.models.is_empty() {
        tracing::warn!("Manifest lists no models");
    }
    for (name, entry) in &loaded.manifest.models {
        let (mesh, anim) = entry.resolve(&loaded.base_dir);
        if !mesh.exists() {
            anyhow::bail!("Model '{}' source not found: {:?}", name, mesh);
        }
        if let Some(anim) = anim {
            if !anim.exists() {
                anyhow::bail!("Model '{}' animation not found: {:?}", name, anim);
            }
        }
    }
    Ok(())
}

/// Bake every model in a manifest, returning the written files
pub fn build_all(loaded: &LoadedManifest, output_override: Option<&Path>) -> Result<Vec<PathBuf>> {
    let output_dir = match output_override {
        Some(dir) => dir.to_path_buf(),
        None => loaded.base_dir.join(&loaded.manifest.output.dir),
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut written = Vec::with_capacity(loaded.manifest.models.len());
    for (name, entry) in &loaded.manifest.models {
        let (mesh, anim) = entry.resolve(&loaded.base_dir);
        let output = output_dir.join(format!("{}.{}", name, BAKED_MODEL_EXT));
        tracing::info!("Baking model: {} -> {:?}", name, output);
        bake_to_file(&mesh, anim.as_deref(), &output)
            .with_context(|| format!("Failed to bake model '{}'", name))?;
        written.push(output);
    }

    Ok(written)
}
