//! Loading a form from disk: program-unit source plus an optional decoded
//! trigger list.

use crate::core::{Error, Result, ResultExt};
use crate::pipeline::FormSource;
use crate::triggers::FormTrigger;
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::file_system("Failed to read source", path, e))
}

/// Decode a trigger list: a JSON array of `{name, code, block?, item?}`.
pub fn parse_trigger_list(contents: &str, path: &Path) -> Result<Vec<FormTrigger>> {
    serde_json::from_str(contents).map_err(|e| Error::TriggerList {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn read_trigger_list(path: &Path) -> Result<Vec<FormTrigger>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::file_system("Failed to read trigger list", path, e))?;
    let triggers = parse_trigger_list(&contents, path)?;
    debug!(count = triggers.len(), path = %path.display(), "Loaded triggers");
    Ok(triggers)
}

/// Form name defaults to the source file stem, uppercased.
pub fn form_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_else(|| "FORM".to_string())
}

pub fn load_form(source: &Path, triggers: Option<&Path>, name: Option<&str>) -> Result<FormSource> {
    let program_units =
        read_source(source).context(format!("Loading form {}", source.display()))?;
    let triggers = match triggers {
        Some(path) => read_trigger_list(path)
            .context(format!("Loading triggers for {}", source.display()))?,
        None => Vec::new(),
    };

    Ok(FormSource {
        name: name.map_or_else(|| form_name(source), str::to_string),
        program_units,
        triggers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_trigger_list_optional_fields() {
        let json = r#"[
            {"name": "WHEN-NEW-FORM-INSTANCE", "code": "init_form;"},
            {"name": "WHEN-BUTTON-PRESSED", "code": "save;", "block": "CTRL", "item": "SAVE"}
        ]"#;
        let triggers = parse_trigger_list(json, Path::new("t.json")).unwrap();
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].block, None);
        assert_eq!(triggers[1].item.as_deref(), Some("SAVE"));
    }

    #[test]
    fn test_malformed_trigger_list() {
        let err = parse_trigger_list("{\"name\": 1}", Path::new("t.json")).unwrap_err();
        assert!(matches!(err, Error::TriggerList { .. }));
        assert!(err.to_string().starts_with("Invalid trigger list t.json"));
    }

    #[test]
    fn test_load_form_defaults_name_to_stem() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("orders.pll");
        fs::write(&source, "PROCEDURE p IS BEGIN NULL; END p;").unwrap();

        let form = load_form(&source, None, None).unwrap();
        assert_eq!(form.name, "ORDERS");
        assert!(form.triggers.is_empty());
    }

    #[test]
    fn test_missing_source_is_file_system_error() {
        let err = read_source(&PathBuf::from("/definitely/not/here.pll")).unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }
}
