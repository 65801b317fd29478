use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "HELPDESK_ASSET_DIR";

pub fn asset_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var(ASSET_DIR_ENV) {
        let override_dir = override_dir.trim();
        if !override_dir.is_empty() {
            let path = PathBuf::from(override_dir);
            ensure_dir(&path);
            return path;
        }
    }

    let path = if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("com", "example", "helpdesk")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".helpdesk"))
    };

    ensure_dir(&path);
    path
}

fn ensure_dir(path: &PathBuf) {
    if !path.exists()
        && let Err(err) = std::fs::create_dir_all(path)
    {
        tracing::warn!(path = %path.display(), error = %err, "Failed to create asset directory");
    }
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}

pub fn database_path() -> PathBuf {
    asset_dir().join("db.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_the_asset_dir() {
        let root = asset_dir();
        assert_eq!(config_path(), root.join("config.json"));
        assert_eq!(database_path(), root.join("db.sqlite"));
    }
}
