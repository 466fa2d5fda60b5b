// src/config.rs
//! Configuration file parsing
//!
//! TOML with the following sections, all optional:
//! - [copy] - Copier equality metric, retries, buffering
//! - [agent] - Name recorded in PREMIS agents and fixity originators
//! - [stage] - Default stage root
//! - [archive] - Default archive root
//! - [tools.fits] - FITS command template
//! - [tools.converters.*] - Named conversion command templates

use crate::copier::CopySettings;
use crate::error::{Error, Result};
use crate::packager::DEFAULT_AGENT;
use crate::tool::CommandTemplate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file read when no `--config` is given, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ldrstage/config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    #[serde(default)]
    pub copy: CopySettings,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub stage: RootSection,

    #[serde(default)]
    pub archive: RootSection,

    #[serde(default)]
    pub tools: ToolsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_name")]
    pub name: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
        }
    }
}

fn default_agent_name() -> String {
    DEFAULT_AGENT.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RootSection {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsSection {
    pub fits: Option<CommandTemplate>,

    #[serde(default)]
    pub converters: BTreeMap<String, CommandTemplate>,
}

impl StageConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: StageConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `explicit` if given, else [`DEFAULT_CONFIG_PATH`] if present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::load(Path::new(DEFAULT_CONFIG_PATH))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.copy.buffering == 0 {
            return Err(Error::Config("copy.buffering must be greater than 0".to_string()));
        }
        if self.agent.name.trim().is_empty() {
            return Err(Error::Config("agent.name must not be empty".to_string()));
        }
        for (name, template) in &self.tools.converters {
            match template.extension.as_deref() {
                Some(ext) if ext.is_empty() || (ext.len() > 1 && ext.starts_with('.') && !ext[1..].contains(['.', '/', '\\'])) => {}
                Some(ext) => {
                    return Err(Error::Config(format!(
                        "tools.converters.{}.extension {:?} must be empty or a single '.ext'",
                        name, ext
                    )));
                }
                None => {
                    return Err(Error::Config(format!(
                        "tools.converters.{} needs an extension",
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn converter(&self, name: &str) -> Result<&CommandTemplate> {
        self.tools
            .converters
            .get(name)
            .ok_or_else(|| Error::Config(format!("no converter named {} in tools.converters", name)))
    }

    pub fn fits(&self) -> Result<&CommandTemplate> {
        self.tools
            .fits
            .as_ref()
            .ok_or_else(|| Error::Config("tools.fits is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copier::EqDetect;

    #[test]
    fn test_default_config() {
        let config = StageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.name, "ldrstage");
        assert_eq!(config.copy.max_retries, 3);
        assert!(config.fits().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[copy]
eq_detect = "sha256"
max_retries = 5

[agent]
name = "ldr-ingest"

[stage]
root = "/var/ldr/stages"

[tools.fits]
program = "/opt/fits/fits.sh"
args = ["-i", "{input}", "-o", "{output}"]
timeout_secs = 120

[tools.converters.pdf]
program = "soffice"
args = ["--headless", "--convert-to", "pdf", "--outdir", "{outdir}", "{input}"]
output = "{outdir}/{stem}.pdf"
extension = ".pdf"
"#;
        let config = StageConfig::parse(toml_str).unwrap();
        assert_eq!(config.copy.eq_detect, EqDetect::Sha256);
        assert_eq!(config.copy.max_retries, 5);
        assert_eq!(config.copy.buffering, crate::copier::DEFAULT_BUFFERING);
        assert_eq!(config.agent.name, "ldr-ingest");
        assert_eq!(config.stage.root, Some(PathBuf::from("/var/ldr/stages")));
        assert!(config.archive.root.is_none());
        assert_eq!(config.fits().unwrap().timeout_secs, 120);
        assert_eq!(config.converter("pdf").unwrap().extension.as_deref(), Some(".pdf"));
        assert!(config.converter("png").is_err());
    }

    #[test]
    fn test_converter_needs_extension() {
        let toml_str = r#"
[tools.converters.bad]
program = "convert"
"#;
        assert!(matches!(StageConfig::parse(toml_str), Err(Error::Config(_))));

        let toml_str = r#"
[tools.converters.bad]
program = "convert"
extension = ".tar.gz"
"#;
        assert!(StageConfig::parse(toml_str).is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(StageConfig::parse("[server]\nbind = \"x\"\n").is_err());
    }

    #[test]
    fn test_discover_explicit() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nname = \"x\"\n").unwrap();
        assert_eq!(StageConfig::discover(Some(&path)).unwrap().agent.name, "x");
        assert!(StageConfig::discover(Some(&temp_dir.path().join("missing.toml"))).is_err());
    }
}
