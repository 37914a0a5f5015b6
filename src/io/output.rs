use crate::core::Severity;
use crate::hierarchy::HierarchyNode;
use crate::pipeline::FormAnalysis;
use crate::readiness::RiskLevel;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Terminal,
}

pub trait OutputWriter {
    fn write_analysis(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_analysis(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(analysis)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
    top: Option<usize>,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, top: None }
    }

    /// Limit the priority plan to the first `top` entries.
    pub fn with_top(mut self, top: Option<usize>) -> Self {
        self.top = top;
        self
    }
}

impl<W: Write> OutputWriter for MarkdownWriter<W> {
    fn write_analysis(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        self.write_summary(analysis)?;
        self.write_units(analysis)?;
        self.write_patterns(analysis)?;
        self.write_triggers(analysis)?;
        self.write_hierarchy(analysis)?;
        self.write_plan(analysis)?;
        Ok(())
    }
}

impl<W: Write> MarkdownWriter<W> {
    fn write_summary(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let readiness = &analysis.readiness;
        writeln!(self.writer, "# Migration Analysis: {}", analysis.form)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Metric | Value |")?;
        writeln!(self.writer, "|--------|-------|")?;
        writeln!(self.writer, "| Program Units | {} |", readiness.total_units)?;
        writeln!(self.writer, "| Triggers | {} |", analysis.triggers.len())?;
        writeln!(
            self.writer,
            "| Overall Complexity | {} / 10 |",
            readiness.overall_complexity
        )?;
        writeln!(
            self.writer,
            "| High / Medium / Low | {} / {} / {} |",
            readiness.high_complexity_count,
            readiness.medium_complexity_count,
            readiness.low_complexity_count
        )?;
        writeln!(self.writer, "| Critical Risks | {} |", readiness.critical_risks.len())?;
        writeln!(self.writer, "| Estimated Effort | {} |", readiness.estimated_effort)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_units(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        if analysis.program_units.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Program Units")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "| Unit | Type | Lines | Classification | Impact | Complexity | Main |"
        )?;
        writeln!(
            self.writer,
            "|------|------|-------|----------------|--------|------------|------|"
        )?;
        for unit in &analysis.program_units {
            writeln!(
                self.writer,
                "| {} | {} | {} | {} | {} | {} | {} |",
                unit.name,
                unit.unit_type,
                unit.line_count,
                unit.classification,
                unit.impact_score,
                unit.complexity,
                if unit.is_main_function { "yes" } else { "" }
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_patterns(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let with_patterns: Vec<_> = analysis
            .units
            .iter()
            .filter_map(|u| u.semantic_patterns.as_ref().map(|p| (u, p)))
            .collect();
        if with_patterns.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Semantic Patterns")?;
        writeln!(self.writer)?;
        for (unit, result) in with_patterns {
            writeln!(self.writer, "### {}", unit.name)?;
            writeln!(self.writer)?;
            for pattern in &result.patterns {
                let lines = pattern
                    .line_numbers
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(
                    self.writer,
                    "- **{}** ({}): {} (lines {})",
                    pattern.label, pattern.severity, pattern.description, lines
                )?;
                writeln!(self.writer, "  - APEX: {}", pattern.apex_consideration)?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_triggers(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        if analysis.triggers.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Triggers")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Trigger | Scope | Category | Target | Point | Support |")?;
        writeln!(self.writer, "|---------|-------|----------|--------|-------|---------|")?;
        for trigger in &analysis.triggers {
            writeln!(
                self.writer,
                "| {} | {} | {} | {} | {} | {} |",
                trigger.name,
                trigger.scope(),
                trigger.category,
                trigger.mapping.construct,
                trigger.mapping.point,
                trigger.mapping.support_level
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_hierarchy(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let hierarchy = &analysis.hierarchy;
        let sections = [
            ("Entry Points", &hierarchy.entry_points),
            ("Core Controllers", &hierarchy.core_controllers),
            ("Supporting Utilities", &hierarchy.supporting_utilities),
            ("UI Glue", &hierarchy.ui_glue),
        ];
        if sections.iter().all(|(_, nodes)| nodes.is_empty()) {
            return Ok(());
        }

        writeln!(self.writer, "## Logic Hierarchy")?;
        writeln!(self.writer)?;
        for (title, nodes) in sections {
            if nodes.is_empty() {
                continue;
            }
            writeln!(self.writer, "### {title}")?;
            writeln!(self.writer)?;
            for node in nodes {
                self.write_node(node, 0)?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &HierarchyNode, indent: usize) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "{}- `{}` ({}, {} impact)",
            "  ".repeat(indent),
            node.name,
            node.classification,
            node.impact_score
        )?;
        for child in &node.children {
            self.write_node(child, indent + 1)?;
        }
        Ok(())
    }

    fn write_plan(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let readiness = &analysis.readiness;
        if readiness.priority_list.is_empty() {
            return Ok(());
        }

        if !readiness.critical_risks.is_empty() {
            writeln!(self.writer, "## Critical Risks")?;
            writeln!(self.writer)?;
            for risk in &readiness.critical_risks {
                writeln!(
                    self.writer,
                    "- [{}] {}: {}",
                    risk.severity, risk.unit, risk.description
                )?;
            }
            writeln!(self.writer)?;
        }

        writeln!(self.writer, "## Migration Plan")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| # | Unit | Classification | Reason | Hours |")?;
        writeln!(self.writer, "|---|------|----------------|--------|-------|")?;
        let limit = self.top.unwrap_or(usize::MAX);
        for item in readiness.priority_list.iter().take(limit) {
            writeln!(
                self.writer,
                "| {} | {} | {} | {} | {:.1} |",
                item.priority, item.name, item.classification, item.reason, item.estimated_hours
            )?;
        }
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Total: {:.1} hours ({})",
            readiness.total_estimated_hours, readiness.estimated_effort
        )?;
        Ok(())
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
    top: Option<usize>,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, top: None }
    }

    pub fn with_top(mut self, top: Option<usize>) -> Self {
        self.top = top;
        self
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_analysis(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        self.print_header(analysis)?;
        self.print_units(analysis)?;
        self.print_triggers(analysis)?;
        self.print_risks(analysis)?;
        self.print_plan(analysis)?;
        Ok(())
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn complexity_colored(score: u8) -> ColoredString {
    match score {
        7.. => score.to_string().red(),
        4..=6 => score.to_string().yellow(),
        _ => score.to_string().green(),
    }
}

fn severity_colored(severity: RiskLevel) -> ColoredString {
    match severity {
        RiskLevel::Critical => "CRITICAL".red().bold(),
        RiskLevel::High => "HIGH".red(),
        RiskLevel::Medium => "MEDIUM".yellow(),
        RiskLevel::Low => "LOW".normal(),
    }
}

impl<W: Write> TerminalWriter<W> {
    fn print_header(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let readiness = &analysis.readiness;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", "═══════════════════════════════════════════".cyan())?;
        writeln!(
            self.writer,
            "{}",
            format!("  FORMSMAP: {}", analysis.form).bold().cyan()
        )?;
        writeln!(self.writer, "{}", "═══════════════════════════════════════════".cyan())?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Units: {}   Triggers: {}   Overall complexity: {}",
            readiness.total_units,
            analysis.triggers.len(),
            complexity_colored(readiness.overall_complexity)
        )?;
        writeln!(
            self.writer,
            "High: {}   Medium: {}   Low: {}",
            readiness.high_complexity_count.to_string().red(),
            readiness.medium_complexity_count.to_string().yellow(),
            readiness.low_complexity_count.to_string().green()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_units(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        if analysis.program_units.is_empty() {
            return Ok(());
        }

        let mut table = new_table(&[
            "Unit",
            "Type",
            "Lines",
            "Classification",
            "Impact",
            "Complexity",
            "Patterns",
        ]);
        for (unit, extracted) in analysis.program_units.iter().zip(&analysis.units) {
            let patterns = extracted.semantic_patterns.as_ref().map_or(0, |p| {
                p.patterns
                    .iter()
                    .filter(|p| p.severity == Severity::Critical)
                    .count()
            });
            let name = if unit.is_main_function {
                format!("{} *", unit.name)
            } else {
                unit.name.clone()
            };
            table.add_row(vec![
                name,
                unit.unit_type.to_string(),
                unit.line_count.to_string(),
                unit.classification.to_string(),
                unit.impact_score.to_string(),
                unit.complexity.to_string(),
                format!("{patterns} critical"),
            ]);
        }
        writeln!(self.writer, "{}", "Program Units".bold())?;
        writeln!(self.writer, "{table}")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_triggers(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        if analysis.triggers.is_empty() {
            return Ok(());
        }

        let mut table = new_table(&["Trigger", "Scope", "Category", "Target", "Support"]);
        for trigger in &analysis.triggers {
            table.add_row(vec![
                trigger.name.clone(),
                trigger.scope(),
                trigger.category.to_string(),
                format!("{} ({})", trigger.mapping.construct, trigger.mapping.point),
                trigger.mapping.support_level.to_string(),
            ]);
        }
        writeln!(self.writer, "{}", "Triggers".bold())?;
        writeln!(self.writer, "{table}")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_risks(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let risks = &analysis.readiness.critical_risks;
        if risks.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "{}", "Critical Risks".bold())?;
        for risk in risks {
            writeln!(
                self.writer,
                "  {} {}: {}",
                severity_colored(risk.severity),
                risk.unit,
                risk.description
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_plan(&mut self, analysis: &FormAnalysis) -> anyhow::Result<()> {
        let readiness = &analysis.readiness;
        if readiness.priority_list.is_empty() {
            return Ok(());
        }

        let mut table = new_table(&["#", "Unit", "Reason", "Hours"]);
        for item in readiness
            .priority_list
            .iter()
            .take(self.top.unwrap_or(usize::MAX))
        {
            table.add_row(vec![
                item.priority.to_string(),
                item.name.clone(),
                item.reason.clone(),
                format!("{:.1}", item.estimated_hours),
            ]);
        }
        writeln!(self.writer, "{}", "Migration Plan".bold())?;
        writeln!(self.writer, "{table}")?;
        writeln!(
            self.writer,
            "Estimated effort: {} ({:.1} hours)",
            readiness.estimated_effort.bold(),
            readiness.total_estimated_hours
        )?;
        Ok(())
    }
}

pub fn create_writer<'a, W: Write + 'a>(
    format: OutputFormat,
    writer: W,
    top: Option<usize>,
) -> Box<dyn OutputWriter + 'a> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Markdown => Box::new(MarkdownWriter::new(writer).with_top(top)),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(writer).with_top(top)),
    }
}

/// Render fully into memory so a failure never leaves partial output.
pub fn render(
    analysis: &FormAnalysis,
    format: OutputFormat,
    top: Option<usize>,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    create_writer(format, &mut buffer, top).write_analysis(analysis)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Engine, FormSource};

    fn analysis() -> FormAnalysis {
        let source = "PROCEDURE save_emp IS\nBEGIN\n  INSERT INTO emp VALUES (1);\n  UPDATE dept SET n = 1;\n  COMMIT;\nEND save_emp;\n";
        Engine::default().analyze(&FormSource {
            name: "EMP".into(),
            program_units: source.into(),
            triggers: vec![],
        })
    }

    #[test]
    fn test_json_round_trips_as_value() {
        let bytes = render(&analysis(), OutputFormat::Json, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["form"], "EMP");
        assert_eq!(value["units"][0]["dependencies"]["tables"][0], "DEPT");
        assert_eq!(value["program_units"][0]["impact_score"], "high");
    }

    #[test]
    fn test_markdown_sections() {
        let text = String::from_utf8(render(&analysis(), OutputFormat::Markdown, None).unwrap())
            .unwrap();
        assert!(text.starts_with("# Migration Analysis: EMP"));
        assert!(text.contains("## Program Units"));
        assert!(text.contains("**Cross-Entity Side Effects** (CRITICAL)"));
        assert!(text.contains("## Migration Plan"));
        assert!(!text.contains("## Triggers"));
    }

    #[test]
    fn test_terminal_lists_units() {
        colored::control::set_override(false);
        let text = String::from_utf8(render(&analysis(), OutputFormat::Terminal, Some(1)).unwrap())
            .unwrap();
        assert!(text.contains("FORMSMAP: EMP"));
        assert!(text.contains("SAVE_EMP"));
        assert!(text.contains("Estimated effort:"));
    }
}
