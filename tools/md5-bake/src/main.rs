//! md5-bake - skeletal model baker
//!
//! Converts MD5 mesh + animation text into baked model files (.bkmd) holding pre-skinned,
//! quantized vertex frames.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use md5_bake::{bake, manifest, BakedModelView, BAKED_MODEL_EXT};

#[derive(Parser)]
#[command(name = "md5-bake")]
#[command(about = "Skeletal model baker for MD5 meshes and animations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake a single model
    Bake {
        /// Input .md5mesh file (may have the .md5anim appended)
        input: PathBuf,

        /// Separate .md5anim file
        #[arg(short, long)]
        anim: Option<PathBuf>,

        /// Output .bkmd file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bake every model in a manifest file
    Build {
        /// Path to bake.toml manifest
        #[arg(default_value = "bake.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to bake.toml manifest
        #[arg(default_value = "bake.toml")]
        manifest: PathBuf,
    },

    /// Print a summary of a baked model file
    Inspect {
        /// Input .bkmd file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bake {
            input,
            anim,
            output,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(BAKED_MODEL_EXT));
            tracing::info!("Baking {:?} -> {:?}", input, output);
            bake::bake_to_file(&input, anim.as_deref(), &output)?;
            tracing::info!("Done!");
        }

        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building models from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            let written = manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete! {} models baked", written.len());
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}

fn inspect(input: &Path) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let view = BakedModelView::parse(&data)
        .with_context(|| format!("Not a valid baked model: {:?}", input))?;
    let header = view.header();

    println!("{}", input.display());
    println!(
        "  meshes: {}  vertices: {}  triangles: {}  frames: {}",
        header.num_meshes, header.num_vertices, header.num_tris, header.num_frames
    );
    println!(
        "  glcmd words: {}  frame size: {} bytes  file size: {} bytes",
        header.num_glcmds,
        header.frame_size,
        data.len()
    );
    for mesh in 0..header.num_meshes as usize {
        println!("  skin {}: {}", mesh, view.skin_name(mesh).unwrap_or("<invalid>"));
    }
    if let Some(frame) = view.frame(0) {
        println!(
            "  frame 0: translate {:?} scale {:?}",
            frame.transform.translate, frame.transform.scale
        );
    }
    Ok(())
}
