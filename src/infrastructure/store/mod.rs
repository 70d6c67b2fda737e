use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::AppError;

mod config;
mod credentials;

pub use config::FileConfigStore;
pub use credentials::FileCredentialStore;

pub const STATE_DIR_ENV: &str = "GH_DISCUSSIONS_HOME";
const STATE_DIR_NAME: &str = ".github-discussions";

/// Directory holding the token, config file and diagnostic logs.
pub fn state_dir() -> Result<PathBuf, AppError> {
    if let Some(dir) = env::var_os(STATE_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::home_dir()
        .map(|home| home.join(STATE_DIR_NAME))
        .ok_or_else(|| {
            AppError::configuration("Could not determine the home directory").with_suggestions([
                format!("Set {} to a writable directory", STATE_DIR_ENV),
            ])
        })
}

/// Creates `dir` (owner-only on unix) if it is missing.
fn ensure_private_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::configuration(format!("Failed to create config directory: {}", e))
            .with_suggestions([
                format!("Check file permissions in {}", dir.display()),
                "Ensure you have write access to your home directory".to_string(),
            ])
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Best effort; a directory we do not own keeps its mode.
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }

    Ok(())
}
