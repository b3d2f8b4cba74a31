// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hostlink schema generator
//!
//! Produces the schema artifact that guest-side binding generators consume, from a
//! reflection snapshot exported by the host.
//!
//! # Usage
//!
//! ```bash
//! # Extract to stdout with the default configuration
//! hostlink-gen extract --snapshot host.json
//!
//! # Extract with overrides, compact output to a file
//! hostlink-gen extract --snapshot host.json --config hostlink.toml --output schema.json --compact
//!
//! # Check an existing artifact
//! hostlink-gen validate --schema schema.json
//!
//! # Write the default configuration
//! hostlink-gen gen-config --output hostlink.toml
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hostlink::schema::validate::validate;
use hostlink::{HostSnapshot, HostlinkConfig, Schema, SchemaExtractor};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// hostlink schema generator
#[derive(Parser, Debug)]
#[command(name = "hostlink-gen")]
#[command(about = "Extract and validate host reflection schemas")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the schema artifact from a host snapshot
    Extract {
        /// Reflection snapshot (JSON)
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Configuration file (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Check hierarchy and reference integrity of an artifact
    Validate {
        /// Schema artifact (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Root sentinel the hierarchy hangs from
        #[arg(long, default_value = "object")]
        root: String,
    },

    /// Generate the default configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "hostlink.toml")]
        output: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Extract {
            snapshot,
            config,
            output,
            compact,
        } => cmd_extract(&snapshot, config.as_deref(), output.as_deref(), compact),
        Commands::Validate { schema, root } => cmd_validate(&schema, &root),
        Commands::GenConfig { output } => cmd_gen_config(&output),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HostlinkConfig> {
    match path {
        Some(path) => HostlinkConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(HostlinkConfig::default()),
    }
}

/// Render the artifact for `snapshot`. Nothing is written if extraction fails.
fn render_schema(snapshot: &Path, config: &HostlinkConfig, compact: bool) -> anyhow::Result<String> {
    let host = HostSnapshot::from_file(snapshot)
        .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
    let extraction = SchemaExtractor::new(&host, &config.schema)
        .extract()
        .context("schema extraction failed")?;

    for head in &extraction.detached {
        tracing::debug!(type_name = %head, "type outside the single-inheritance hierarchy");
    }
    eprintln!(
        "[OK] {} classes, {} operator namespaces, {} references redirected to {}",
        extraction.schema.classes.len(),
        extraction.schema.operators.len(),
        extraction.fixup.total_rewritten(),
        config.schema.fallback_type
    );

    let json = if compact {
        extraction.schema.to_json()?
    } else {
        extraction.schema.to_json_pretty()?
    };
    Ok(json)
}

fn cmd_extract(
    snapshot: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    compact: bool,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let json = render_schema(snapshot, &config, compact)?;

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("[OK] Schema written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_validate(path: &Path, root: &str) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let schema = Schema::from_json(&text).with_context(|| format!("parsing {}", path.display()))?;

    let violations = validate(&schema, root);
    if violations.is_empty() {
        println!("Schema valid!");
        println!();
        println!("Classes:             {}", schema.classes.len());
        println!("Operator namespaces: {}", schema.operators.len());
        println!("References:          {}", schema.references().len());
        return Ok(());
    }

    for violation in &violations {
        eprintln!("  - {}", violation);
    }
    bail!("{} violation(s) in {}", violations.len(), path.display())
}

fn cmd_gen_config(output: &Path) -> anyhow::Result<()> {
    let toml_str = HostlinkConfig::default().to_toml()?;

    let content = format!(
        r#"# hostlink configuration
# Generated by hostlink-gen gen-config
#
# [schema]  extraction root, fallback type, skipped members and per-type patches
# [bridge]  guest config key, entry points, failure policy, pointer table sweep

{}
"#,
        toml_str
    );

    std::fs::write(output, content).with_context(|| format!("writing {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(dir: &Path, extra_kind: &str) -> PathBuf {
        let path = dir.join("host.json");
        let value = json!({
            "types": [
                {"identifier": "bpy_struct", "bases": ["object"]},
                {"identifier": "Object", "bases": ["bpy_struct"], "reflection": {"properties": [
                    {"kind": extra_kind, "identifier": "parent", "type": "POINTER", "fixed_type": "Object"}
                ]}}
            ]
        });
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_extract_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(dir.path(), "PointerProperty");
        let out = dir.path().join("schema.json");

        cmd_extract(&snap, None, Some(&out), true).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(!text.contains('\n'));
        cmd_validate(&out, "object").unwrap();
    }

    #[test]
    fn test_unexpected_kind_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(dir.path(), "PythonProperty");
        let out = dir.path().join("schema.json");

        assert!(cmd_extract(&snap, None, Some(&out), false).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_validate_reports_dangling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let broken = json!({"classes": [
            {"name": "Object", "parent": "object", "properties": {
                "data": {"pointer": {"identifier": "data", "name": "data", "description": "",
                    "type": "POINTER", "fixed_type": "Missing"}}
            }}
        ]});
        std::fs::write(&path, broken.to_string()).unwrap();
        assert!(cmd_validate(&path, "object").is_err());
    }

    #[test]
    fn test_gen_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostlink.toml");
        cmd_gen_config(&path).unwrap();
        let loaded = HostlinkConfig::from_file(&path).unwrap();
        assert_eq!(loaded, HostlinkConfig::default());
    }

    #[test]
    fn test_log_level_defaults_to_info() {
        let args = Args::try_parse_from(["hostlink-gen", "gen-config"]).unwrap();
        assert_eq!(args.log_level, "info");

        let args = Args::try_parse_from(["hostlink-gen", "gen-config", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, "debug");
    }
}
