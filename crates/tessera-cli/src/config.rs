//! Configuration file loading for the CLI
//!
//! This module handles finding and loading the engine configuration from
//! various locations (explicit path, local directory, system directory).

use std::{fs, path::Path};

use directories::ProjectDirs;
use log::{debug, info};

use tessera::config::EngineConfig;

use crate::error::CliError;

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (tessera/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
/// - Config values are out of range
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<EngineConfig, CliError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("tessera/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "tessera", "tessera") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(EngineConfig::default())
}

/// Load and validate configuration from a TOML file
fn load_config_file(path: impl AsRef<Path>) -> Result<EngineConfig, CliError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CliError::MissingConfig(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let config: EngineConfig =
        toml::from_str(&content).map_err(|err| CliError::new_toml_error(err, content.as_str()))?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use tessera::TesseraError;

    use super::*;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let file = config_file(
            r#"
            [layout]
            min_spacing = 8.0

            [sizes]
            node_width = 120.0
            "#,
        );

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.layout().min_spacing(), 8.0);
        assert_eq!(config.layout().max_iterations(), 100);
        assert_eq!(config.sizes().node_width(), 120.0);
        assert_eq!(config.sizes().node_height(), 60.0);
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let result = load_config(Some(&path));

        assert!(matches!(result, Err(CliError::MissingConfig(missing)) if missing == path));
    }

    #[test]
    fn test_malformed_config_keeps_source() {
        let file = config_file("[layout]\nmin_spacing = \"wide\"\n");

        let Err(CliError::Toml { span, src, .. }) = load_config(Some(file.path())) else {
            panic!("expected a TOML error");
        };
        assert!(src.contains("min_spacing"));
        assert!(span.is_some());
    }

    #[test]
    fn test_out_of_range_config() {
        let file = config_file("[neighborhood]\nspacing = -4.0\n");

        let result = load_config(Some(file.path()));

        assert!(matches!(
            result,
            Err(CliError::Engine(TesseraError::Config(_)))
        ));
    }
}
