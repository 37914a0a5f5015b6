pub mod input;
pub mod output;

use anyhow::Result;
use std::fs;
use std::path::Path;

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)?;
    Ok(())
}

pub fn file_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_written_file_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".formsmap.toml");
        assert!(!file_exists(&path));
        write_file(&path, "[target]\n").unwrap();
        assert!(file_exists(&path));
        assert!(!file_exists(dir.path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[target]\n");
    }
}
