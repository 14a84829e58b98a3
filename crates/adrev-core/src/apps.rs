use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// The store platform an application's revenue is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Fireos,
}

impl Platform {
    /// Wire representation, as sent in the `platform` query parameter and
    /// stored in the warehouse.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Fireos => "fireos",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered application: the unit the user-level pipeline iterates over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTarget {
    pub platform: Platform,
    /// Android package name or iOS bundle identifier, as known to MAX.
    pub package: String,
}

#[derive(Debug, Deserialize)]
pub struct AppsFile {
    pub applications: Vec<AppTarget>,
}

/// Load and validate the application registry from a YAML file.
///
/// An empty registry is allowed; callers decide whether to warn. Duplicate
/// (platform, package) pairs and blank package names are rejected.
///
/// # Errors
///
/// Returns `ConfigError` when the file is unreadable, is not valid YAML, or
/// fails validation.
pub fn load_apps(path: &Path) -> Result<Vec<AppTarget>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AppsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let apps_file: AppsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::AppsFileParse)?;

    validate_apps(&apps_file.applications)?;

    Ok(apps_file.applications)
}

fn validate_apps(apps: &[AppTarget]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for app in apps {
        if app.package.trim().is_empty() {
            return Err(ConfigError::Validation(
                "application package must be non-empty".to_string(),
            ));
        }

        if !seen.insert((app.platform, app.package.to_lowercase())) {
            return Err(ConfigError::Validation(format!(
                "duplicate application entry: '{}' ({})",
                app.package, app.platform
            )));
        }
    }

    Ok(())
}
