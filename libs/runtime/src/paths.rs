pub mod home_dir {
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum HomeDirError {
        #[error("cannot determine user home directory ({0} is not set)")]
        NoHome(&'static str),
        #[error("failed to resolve current directory: {0}")]
        CurrentDir(#[source] std::io::Error),
        #[error("failed to create home directory '{path}': {source}")]
        Create {
            path: String,
            #[source]
            source: std::io::Error,
        },
    }

    #[cfg(target_os = "windows")]
    const HOME_VAR: &str = "APPDATA";
    #[cfg(not(target_os = "windows"))]
    const HOME_VAR: &str = "HOME";

    fn platform_home() -> Result<PathBuf, HomeDirError> {
        std::env::var_os(HOME_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(HomeDirError::NoHome(HOME_VAR))
    }

    /// Resolve the server home directory into an absolute path.
    ///
    /// - `None` resolves to `<platform home>/<default_subdir>`.
    /// - A leading `~` is expanded to the platform home.
    /// - Relative paths are anchored at the current working directory.
    pub fn resolve_home_dir(
        configured: Option<String>,
        default_subdir: &str,
        create: bool,
    ) -> Result<PathBuf, HomeDirError> {
        let resolved = match configured {
            None => platform_home()?.join(default_subdir),
            Some(raw) => expand(&raw)?,
        };

        if create {
            std::fs::create_dir_all(&resolved).map_err(|source| HomeDirError::Create {
                path: resolved.to_string_lossy().to_string(),
                source,
            })?;
        }
        Ok(resolved)
    }

    fn expand(raw: &str) -> Result<PathBuf, HomeDirError> {
        if raw == "~" {
            return platform_home();
        }
        if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
            return Ok(platform_home()?.join(rest));
        }
        let p = Path::new(raw);
        if p.is_absolute() {
            return Ok(p.to_path_buf());
        }
        let cwd = std::env::current_dir().map_err(HomeDirError::CurrentDir)?;
        Ok(cwd.join(p))
    }

}
