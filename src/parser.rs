use std::path::Path;

use crate::error::ConfigError;
use crate::raw::{RawGlobalCfg, RawRepoCfg};
use crate::valid::{GlobalCfg, RepoCfg};

/// Wire format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Picks the format for a file by extension; everything that is not
    /// `.json` parses as YAML.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parses, validates, normalizes and cross-validates a repository document.
///
/// The full pipeline for untrusted input: strict decode, aggregated
/// structural validation, defaulting (including the schema-version-2 shell
/// re-tokenization), then the permission checks against the server policy
/// matched for `repo_id`. Any failure is terminal; nothing is partially
/// applied.
pub fn parse_repo_cfg(
    data: &[u8],
    format: ConfigFormat,
    global: &GlobalCfg,
    repo_id: &str,
) -> Result<RepoCfg, ConfigError> {
    parse_repo_cfg_named(data, format, global, repo_id, "repo config")
}

fn parse_repo_cfg_named(
    data: &[u8],
    format: ConfigFormat,
    global: &GlobalCfg,
    repo_id: &str,
    context: &str,
) -> Result<RepoCfg, ConfigError> {
    let raw: RawRepoCfg = if is_blank(data) && format == ConfigFormat::Yaml {
        // An empty document is well-formed YAML; structural validation
        // reports the missing version.
        RawRepoCfg::default()
    } else {
        decode(data, format, context)?
    };
    raw.validate().into_result()?;
    let cfg = raw.to_valid()?;
    global.validate_repo_cfg(&cfg, repo_id)?;
    Ok(cfg)
}

/// Parses and validates a server policy document, starting from `default`
/// (normally `GlobalCfg::new`) and appending the operator's entries after
/// the baseline catch-all.
pub fn parse_global_cfg(
    data: &[u8],
    format: ConfigFormat,
    default: GlobalCfg,
) -> Result<GlobalCfg, ConfigError> {
    parse_global_cfg_named(data, format, default, "server config")
}

fn parse_global_cfg_named(
    data: &[u8],
    format: ConfigFormat,
    default: GlobalCfg,
    context: &str,
) -> Result<GlobalCfg, ConfigError> {
    if is_blank(data) {
        return Err(ConfigError::parse(context, "file was empty"));
    }
    let raw: RawGlobalCfg = decode(data, format, context)?;
    raw.validate().into_result()?;
    raw.to_valid(default)
}

/// Whether `repo_dir` carries a repository config file named `filename`.
/// Absence is a recognized, non-fatal condition; a `.yml` filename is the
/// one misnaming common enough to get a dedicated hint.
pub fn has_repo_cfg(repo_dir: &Path, filename: &str) -> Result<bool, ConfigError> {
    if let Some(stem) = filename.strip_suffix(".yml") {
        if repo_dir.join(filename).exists() {
            return Err(ConfigError::parse(
                repo_dir.display().to_string(),
                format!(
                    "found \"{stem}.yml\" as config file; rename using the .yaml extension"
                ),
            ));
        }
    }
    Ok(repo_dir.join(filename).exists())
}

/// Reads and fully parses the repository document at
/// `repo_dir/filename`; parse errors are attributed to the file path.
pub fn parse_repo_cfg_file(
    repo_dir: &Path,
    filename: &str,
    global: &GlobalCfg,
    repo_id: &str,
) -> Result<RepoCfg, ConfigError> {
    let path = repo_dir.join(filename);
    let data = std::fs::read(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_repo_cfg_named(
        &data,
        ConfigFormat::for_path(&path),
        global,
        repo_id,
        &path.display().to_string(),
    )
}

/// Reads and fully parses the server policy document at `path`.
pub fn parse_global_cfg_file(path: &Path, default: GlobalCfg) -> Result<GlobalCfg, ConfigError> {
    let data = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_global_cfg_named(
        &data,
        ConfigFormat::for_path(path),
        default,
        &path.display().to_string(),
    )
}

fn decode<T>(data: &[u8], format: ConfigFormat, context: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    match format {
        ConfigFormat::Yaml => serde_yaml::from_slice(data)
            .map_err(|err| ConfigError::parse(context, err)),
        ConfigFormat::Json => serde_json::from_slice(data)
            .map_err(|err| ConfigError::parse(context, err)),
    }
}

fn is_blank(data: &[u8]) -> bool {
    data.iter().all(|byte| byte.is_ascii_whitespace())
}
