use crate::config::{self, FormsmapConfig};
use crate::core::Error;
use crate::io::{self, output};
use crate::pipeline::Engine;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub source: PathBuf,
    pub triggers: Option<PathBuf>,
    pub form: Option<String>,
    pub format: output::OutputFormat,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub top: Option<usize>,
}

fn resolve_config(path: Option<&Path>) -> Result<FormsmapConfig> {
    match path {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(config::load_config()),
    }
}

pub fn handle_analyze(cmd: AnalyzeConfig) -> Result<()> {
    let settings = resolve_config(cmd.config.as_deref())?;
    let form = io::input::load_form(&cmd.source, cmd.triggers.as_deref(), cmd.form.as_deref())?;

    let analysis = Engine::with_config(settings).analyze(&form);
    if analysis.is_empty() {
        return Err(Error::NoUnitsFound {
            path: cmd.source.clone(),
        }
        .into());
    }
    info!(
        units = analysis.units.len(),
        triggers = analysis.triggers.len(),
        "Analysis complete"
    );

    let rendered = output::render(&analysis, cmd.format, cmd.top)?;
    match cmd.output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote report");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
