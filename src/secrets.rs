use std::path::{Path, PathBuf};

fn default_state_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".mid")
}

fn state_dir() -> PathBuf {
    if let Ok(path) = std::env::var("MID_CONFIG") {
        let config_path = PathBuf::from(path);
        if let Some(parent) = config_path.parent() {
            return parent.to_path_buf();
        }
    }
    default_state_dir()
}

fn token_file_for(state_dir: &Path) -> PathBuf {
    state_dir.join("credentials").join("backend.token")
}

pub fn write_token_to(state_dir: &Path, token: &str) -> anyhow::Result<PathBuf> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("token cannot be empty");
    }

    let path = token_file_for(state_dir);
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("credentials path has no parent"))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", dir.display()))?;
    set_dir_permissions(dir)?;

    std::fs::write(&path, token)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    set_file_permissions(&path)?;
    Ok(path)
}

pub fn read_token_from(state_dir: &Path) -> Option<String> {
    let value = std::fs::read_to_string(token_file_for(state_dir)).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Store the backend token in ~/.mid/credentials/backend.token.
pub fn store_token(token: &str) -> anyhow::Result<PathBuf> {
    write_token_to(&state_dir(), token)
}

/// Load the backend token from ~/.mid/credentials/backend.token.
pub fn load_token() -> Option<String> {
    read_token_from(&state_dir())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| anyhow::anyhow!("failed to secure {}: {e}", path.display()))
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| anyhow::anyhow!("failed to secure {}: {e}", path.display()))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_token_from, write_token_to};
    use std::path::PathBuf;

    fn tmp_dir() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("mid-secrets-test-{nanos}"));
        std::fs::create_dir_all(&path).expect("create temp dir");
        path
    }

    #[test]
    fn writes_and_reads_token() {
        let dir = tmp_dir();
        let path = write_token_to(&dir, "jwt-test-token").expect("write token");
        assert!(path.exists());
        let loaded = read_token_from(&dir);
        assert_eq!(loaded.as_deref(), Some("jwt-test-token"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn rejects_empty_token() {
        let dir = tmp_dir();
        let err = write_token_to(&dir, "   ").expect_err("should fail");
        assert!(err.to_string().contains("empty"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_token_reads_none() {
        let dir = tmp_dir();
        assert!(read_token_from(&dir).is_none());
        std::fs::remove_dir_all(dir).ok();
    }
}
