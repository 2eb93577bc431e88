use crate::model::{
    ArchitectureAnalysisResult, CircularDependency, GraphLevel, NodeKind, NodeMetrics, Severity,
};
use crate::output::OutputFormatter;
use std::io::Write;

const MAX_WARNINGS: usize = 20;

pub struct MarkdownOutput {
    pub model_name: String,
    /// Rows in each ranking table.
    pub top: usize,
}

impl MarkdownOutput {
    pub fn new(model_name: impl Into<String>, top: usize) -> Self {
        Self {
            model_name: model_name.into(),
            top,
        }
    }

    fn ranked<'a>(
        &self,
        result: &'a ArchitectureAnalysisResult,
        kind: NodeKind,
    ) -> Vec<(&'a str, &'a NodeMetrics)> {
        result
            .metrics()
            .iter()
            .filter(|(id, _)| id.kind == kind)
            .map(|(id, m)| (id.name.as_str(), m))
            .collect()
    }
}

impl OutputFormatter for MarkdownOutput {
    fn format<W: Write>(
        &self,
        result: &ArchitectureAnalysisResult,
        writer: &mut W,
    ) -> std::io::Result<()> {
        writeln!(writer, "# Architecture Analysis: {}\n", self.model_name)?;

        if !result.is_complete() {
            let stats = result.stats();
            writeln!(
                writer,
                "> **Incomplete analysis**: {}. {} of {} work units merged; the graphs and metrics below cover only those classes.\n",
                result.status(),
                stats.units_merged,
                stats.units_total
            )?;
        }

        write_summary(result, writer)?;
        write_cycles(result, writer)?;

        // Coupling
        let mut classes = self.ranked(result, NodeKind::Class);
        classes.sort_by(|a, b| {
            (b.1.afferent + b.1.efferent)
                .cmp(&(a.1.afferent + a.1.efferent))
                .then_with(|| a.0.cmp(b.0))
        });
        classes.retain(|(_, m)| m.afferent + m.efferent > 0);
        if !classes.is_empty() {
            writeln!(writer, "## Most Coupled Classes\n")?;
            writeln!(writer, "| Class | Ca | Ce | I | Complexity | LCOM |")?;
            writeln!(writer, "|---|---:|---:|---:|---:|---:|")?;
            for (name, m) in classes.iter().take(self.top) {
                writeln!(
                    writer,
                    "| `{}` | {} | {} | {:.2} | {} | {:.2} |",
                    name, m.afferent, m.efferent, m.instability, m.cyclomatic_complexity, m.lcom
                )?;
            }
            writeln!(writer)?;
        }

        // Instability
        let mut packages = self.ranked(result, NodeKind::Package);
        packages.sort_by(|a, b| {
            b.1.instability
                .total_cmp(&a.1.instability)
                .then_with(|| a.0.cmp(b.0))
        });
        if !packages.is_empty() {
            writeln!(writer, "## Package Instability\n")?;
            writeln!(writer, "| Package | Ca | Ce | I |")?;
            writeln!(writer, "|---|---:|---:|---:|")?;
            for (name, m) in packages.iter().take(self.top) {
                writeln!(
                    writer,
                    "| `{}` | {} | {} | {:.2} |",
                    name, m.afferent, m.efferent, m.instability
                )?;
            }
            writeln!(writer)?;
        }

        // Main sequence, furthest first
        let mut sequence: Vec<_> = packages
            .iter()
            .filter_map(|(name, m)| Some((*name, m, m.abstractness?, m.distance?)))
            .collect();
        sequence.sort_by(|a, b| b.3.total_cmp(&a.3).then_with(|| a.0.cmp(b.0)));
        if !sequence.is_empty() {
            writeln!(writer, "## Main Sequence\n")?;
            writeln!(writer, "| Package | Classes | A | I | D |")?;
            writeln!(writer, "|---|---:|---:|---:|---:|")?;
            for (name, m, abstractness, distance) in sequence {
                let class_count = result
                    .package_graph()
                    .node(name)
                    .map(|n| n.metadata.class_count)
                    .unwrap_or(0);
                writeln!(
                    writer,
                    "| `{}` | {} | {:.2} | {:.2} | {:.2} |",
                    name, class_count, abstractness, m.instability, distance
                )?;
            }
            writeln!(writer)?;
        }

        write_warnings(result, writer)
    }
}

fn write_summary<W: Write>(
    result: &ArchitectureAnalysisResult,
    writer: &mut W,
) -> std::io::Result<()> {
    let stats = result.stats();
    writeln!(writer, "## Summary\n")?;
    writeln!(
        writer,
        "- **Classes analyzed:** {} of {} ({} skipped)",
        stats.classes_analyzed, stats.classes_supplied, stats.classes_skipped
    )?;
    writeln!(
        writer,
        "- **Packages:** {}",
        result
            .package_graph()
            .nodes()
            .filter(|n| !n.metadata.is_external)
            .count()
    )?;
    writeln!(
        writer,
        "- **Class dependencies:** {}",
        result.class_graph().edge_count()
    )?;
    writeln!(
        writer,
        "- **Method invocations:** {}",
        result.method_graph().edge_count()
    )?;
    writeln!(writer, "- **Circular dependencies:** {}", result.cycles().len())?;
    writeln!(writer, "- **Elapsed:** {} ms\n", stats.elapsed.as_millis())
}

fn write_cycles<W: Write>(
    result: &ArchitectureAnalysisResult,
    writer: &mut W,
) -> std::io::Result<()> {
    if result.cycles().is_empty() {
        writeln!(writer, "## No Circular Dependencies\n")?;
        writeln!(writer, "No circular dependencies detected.\n")?;
        return Ok(());
    }

    writeln!(writer, "## Circular Dependencies\n")?;
    for (severity, marker) in [
        (Severity::Critical, "🔴"),
        (Severity::High, "🟠"),
        (Severity::Medium, "🟡"),
        (Severity::Low, "🔵"),
    ] {
        let group: Vec<&CircularDependency> = result
            .cycles()
            .iter()
            .filter(|c| c.severity == severity)
            .collect();
        if group.is_empty() {
            continue;
        }

        writeln!(writer, "### {} {} ({})\n", marker, title(severity), group.len())?;
        for cycle in group {
            let kinds: Vec<String> = cycle.edge_kinds.iter().map(|k| k.to_string()).collect();
            writeln!(
                writer,
                "- {} `{}` ({})",
                level_label(cycle.level),
                cycle.describe(),
                kinds.join(", ")
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_warnings<W: Write>(
    result: &ArchitectureAnalysisResult,
    writer: &mut W,
) -> std::io::Result<()> {
    let warnings = result.warnings();
    if warnings.is_empty() {
        return Ok(());
    }

    writeln!(writer, "## Warnings\n")?;
    for warning in warnings.iter().take(MAX_WARNINGS) {
        writeln!(writer, "- {}", warning)?;
    }
    if warnings.len() > MAX_WARNINGS {
        writeln!(writer, "- ... and {} more", warnings.len() - MAX_WARNINGS)?;
    }
    writeln!(writer)
}

fn title(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical",
        Severity::High => "High",
        Severity::Medium => "Medium",
        Severity::Low => "Low",
    }
}

fn level_label(level: GraphLevel) -> &'static str {
    match level {
        GraphLevel::PackageLevel => "**package**",
        GraphLevel::ClassLevel => "**class**",
        GraphLevel::MethodLevel => "**method**",
    }
}
