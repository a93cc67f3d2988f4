/// Ignore files for the application packaging workflow
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const HELMIGNORE_ENTRY: &str = "kots/";
const HELMIGNORE_CONTENTS: &str = "\nkots/";
const GITIGNORE_CONTENTS: &str = "\ndeps/\nmanifests/*.tgz\n";

/// Make sure the chart's `.helmignore` excludes the `kots/` directory.
///
/// The entry is appended once; existing content is left alone.
pub fn write_helmignore(chart_dir: &Path) -> Result<PathBuf> {
    let path = chart_dir.join(".helmignore");

    let mut options = OpenOptions::new();
    options.read(true).append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut existing = String::new();
    file.read_to_string(&mut existing)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if existing.contains(HELMIGNORE_ENTRY) {
        debug!("{} already ignores {}", path.display(), HELMIGNORE_ENTRY);
    } else {
        file.write_all(HELMIGNORE_CONTENTS.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Updated {}", path.display());
    }

    Ok(path)
}

/// Write the `.gitignore` for the packaging directory, replacing any existing one
pub fn write_gitignore(kots_dir: &Path) -> Result<PathBuf> {
    let path = kots_dir.join(".gitignore");
    std::fs::write(&path, GITIGNORE_CONTENTS)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_helmignore() {
        let dir = tempfile::tempdir().unwrap();

        let path = write_helmignore(dir.path()).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "\nkots/");
    }

    #[test]
    fn test_helmignore_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".helmignore");
        std::fs::write(&path, "*.swp\n").unwrap();

        write_helmignore(dir.path()).unwrap();
        write_helmignore(dir.path()).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "*.swp\n\nkots/");
    }

    #[cfg(unix)]
    #[test]
    fn test_helmignore_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = write_helmignore(dir.path()).unwrap();

        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_gitignore_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitignore");
        std::fs::write(&path, "stale\n").unwrap();

        write_gitignore(dir.path()).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "\ndeps/\nmanifests/*.tgz\n"
        );
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(write_gitignore(&missing).is_err());
        assert!(write_helmignore(&missing).is_err());
    }
}
