//! # Host Manifests
//!
//! A native messaging host is registered by dropping a JSON manifest named
//! `<host-name>.json` into one of the browser's well-known directories:
//!
//! ```json
//! {
//!   "name": "io.github.p00ya.cdb",
//!   "description": "Chrome/Discord bridge",
//!   "path": "/usr/local/bin/chrome-discord-bridge",
//!   "allowed_origins": ["chrome-extension://abcdefghijklmnop/"],
//!   "type": "stdio"
//! }
//! ```
//!
//! ## Search Order
//!
//! 1. Extra directories from the config file (in the order given)
//! 2. The per-user directory
//! 3. The system-wide directory
//!
//! Lookup and listing read these directories directly so extra directories
//! from the config work; registering goes through `native_messaging::install`.
//!
//! | Platform | User directory | System directory |
//! |----------|----------------|------------------|
//! | Linux | `~/.config/google-chrome/NativeMessagingHosts` | `/etc/opt/chrome/native-messaging-hosts` |
//! | macOS | `~/Library/Application Support/Google/Chrome/NativeMessagingHosts` | `/Library/Google/Chrome/NativeMessagingHosts` |

pub use native_messaging::Scope;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use walkdir::WalkDir;

/// The only transport type browsers support for native hosts.
pub const MANIFEST_TYPE: &str = "stdio";

/// Browser whose manifest directories `register` writes to.
pub const BROWSER: &str = "chrome";

#[cfg(target_os = "macos")]
const USER_SUB_DIR: &str = "Library/Application Support/Google/Chrome/NativeMessagingHosts";
#[cfg(target_os = "macos")]
const SYSTEM_DIR: &str = "/Library/Google/Chrome/NativeMessagingHosts";

#[cfg(not(target_os = "macos"))]
const USER_SUB_DIR: &str = ".config/google-chrome/NativeMessagingHosts";
#[cfg(not(target_os = "macos"))]
const SYSTEM_DIR: &str = "/etc/opt/chrome/native-messaging-hosts";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid native messaging host name \"{0}\"")]
    InvalidName(String),

    #[error("specified native messaging host not found: {0}")]
    NotFound(String),

    #[error("manifest {} declares name \"{found}\", expected \"{expected}\"", path.display())]
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("manifest {} has unsupported type \"{found}\"", path.display())]
    UnsupportedType { path: PathBuf, found: String },

    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("failed to register {name}: {source}")]
    Register { name: String, source: io::Error },

    #[error("manifest {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("manifest {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The on-disk host manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub path: PathBuf,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
}

fn default_type() -> String {
    MANIFEST_TYPE.to_string()
}

/// A manifest together with the file it was loaded from.
#[derive(Debug, Clone)]
pub struct InstalledManifest {
    pub manifest: Manifest,
    pub file: PathBuf,
}

impl InstalledManifest {
    /// Absolute path to the host executable.
    ///
    /// Relative `path` entries are resolved against the manifest's directory.
    pub fn executable(&self) -> PathBuf {
        if self.manifest.path.is_absolute() {
            return self.manifest.path.clone();
        }
        self.file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.manifest.path)
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.manifest.allowed_origins.iter().any(|o| o == origin)
    }
}

impl Manifest {
    pub fn new(name: &str, description: &str, path: PathBuf, allowed_origins: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            path,
            allowed_origins,
            kind: default_type(),
        }
    }
}

/// Check a host name against the browser's naming rules: dot-separated
/// segments of lowercase letters, digits and underscores.
pub fn validate_host_name(name: &str) -> Result<(), ManifestError> {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9_]+(\.[a-z0-9_]+)*$").expect("host name pattern is valid")
    });

    if re.is_match(name) {
        Ok(())
    } else {
        Err(ManifestError::InvalidName(name.to_string()))
    }
}

/// The per-user manifest directory.
pub fn user_dir() -> Result<PathBuf, ManifestError> {
    let base = directories::BaseDirs::new().ok_or(ManifestError::NoHomeDir)?;
    Ok(base.home_dir().join(USER_SUB_DIR))
}

/// The system-wide manifest directory.
pub fn system_dir() -> PathBuf {
    PathBuf::from(SYSTEM_DIR)
}

/// Directories searched for manifests, in priority order.
pub fn search_dirs(extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = extra.to_vec();
    if let Ok(dir) = user_dir() {
        dirs.push(dir);
    }
    dirs.push(system_dir());
    dirs
}

/// Find and load the manifest registered for `name`.
pub fn find(name: &str, dirs: &[PathBuf]) -> Result<InstalledManifest, ManifestError> {
    validate_host_name(name)?;

    for dir in dirs {
        let file = dir.join(format!("{name}.json"));
        if !file.is_file() {
            continue;
        }

        tracing::debug!(manifest = %file.display(), "found host manifest");
        let manifest = load(&file)?;

        if manifest.name != name {
            return Err(ManifestError::NameMismatch {
                path: file,
                expected: name.to_string(),
                found: manifest.name,
            });
        }
        if manifest.kind != MANIFEST_TYPE {
            return Err(ManifestError::UnsupportedType {
                path: file,
                found: manifest.kind,
            });
        }

        return Ok(InstalledManifest { manifest, file });
    }

    Err(ManifestError::NotFound(name.to_string()))
}

/// Load a manifest from a file.
pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Register `manifest` with the browser in the user or system scope.
pub fn register(manifest: &Manifest, scope: Scope) -> Result<(), ManifestError> {
    validate_host_name(&manifest.name)?;

    native_messaging::install(
        &manifest.name,
        &manifest.description,
        &manifest.path,
        &manifest.allowed_origins,
        &[],
        &[BROWSER],
        scope,
    )
    .map_err(|source| ManifestError::Register {
        name: manifest.name.clone(),
        source,
    })?;

    tracing::info!(host = %manifest.name, "registered host manifest");
    Ok(())
}

/// Remove the manifest registered for `name`.
pub fn unregister(name: &str, scope: Scope) -> Result<(), ManifestError> {
    validate_host_name(name)?;

    native_messaging::remove(name, &[BROWSER], scope).map_err(|source| {
        ManifestError::Register {
            name: name.to_string(),
            source,
        }
    })?;

    tracing::info!(host = name, "removed host manifest");
    Ok(())
}

/// Every readable manifest in `dirs`. Unreadable files are skipped with a warning.
pub fn list(dirs: &[PathBuf]) -> Vec<InstalledManifest> {
    let mut found = Vec::new();

    for dir in dirs.iter().filter(|d| d.is_dir()) {
        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .map(walkdir::DirEntry::into_path)
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        for file in entries {
            match load(&file) {
                Ok(manifest) => found.push(InstalledManifest { manifest, file }),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable manifest"),
            }
        }
    }

    found
}
