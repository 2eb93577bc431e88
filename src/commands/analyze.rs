use crate::api::{analyze_model, load_model_with_fs};
use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::fs::{FileSystem, default_fs};
use crate::model::{ArchitectureAnalysisResult, Severity};
use crate::output::{JsonOutput, MarkdownOutput, OutputFormatter};
use crate::style;
use std::io::{self, Write};

use super::CommandContext;

pub fn cmd_analyze(args: AnalyzeArgs) -> i32 {
    cmd_analyze_with_fs(args, default_fs())
}

pub fn cmd_analyze_with_fs(args: AnalyzeArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args, fs) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let model = match load_model_with_fs(&ctx.model, fs) {
        Ok(model) => model,
        Err(e) => {
            style::error(&e.to_string());
            return 1;
        }
    };

    style::status(&format!(
        "Analyzing {} classes from {}",
        model.classes.len(),
        style::path(&ctx.model)
    ));

    let result = match analyze_model(&model, &ctx.config) {
        Ok(result) => result,
        Err(e) => {
            style::error(&e.to_string());
            return 1;
        }
    };

    // Format output to string first
    let mut buffer = Vec::new();
    let format_result = match args.format {
        OutputFormat::Markdown => {
            MarkdownOutput::new(&model.name, args.top).format(&result, &mut buffer)
        }
        OutputFormat::Json => JsonOutput::new(&model.name).format(&result, &mut buffer),
    };
    if let Err(e) = format_result {
        style::error(&format!("Failed to format output: {}", e));
        return 1;
    }
    let output_str = String::from_utf8_lossy(&buffer);

    let write_result = match &args.output {
        Some(output_path) => fs.write(output_path, &output_str).map(|_| {
            print_summary(&result);
            style::success(&format!("Report written to {}", style::path(output_path)));
        }),
        // Render markdown nicely to terminal, or write plain text to a pipe
        None if args.format == OutputFormat::Markdown => {
            style::render_markdown(&output_str, &mut io::stdout())
        }
        None => write!(io::stdout(), "{}", output_str),
    };
    if let Err(e) = write_result {
        style::error(&format!("Failed to write output: {}", e));
        return 1;
    }

    if !result.is_complete() {
        style::warning(&format!("Analysis is incomplete: {}", result.status()));
        style::hint("raise --timeout-ms or --max-memory-mb to analyze the whole archive");
    }

    // Exit code 1 = inheritance cycles, which should block CI
    if result.has_critical_cycles() { 1 } else { 0 }
}

fn print_summary(result: &ArchitectureAnalysisResult) {
    let stats = result.stats();
    let critical = result
        .cycles()
        .iter()
        .filter(|c| c.severity == Severity::Critical)
        .count();

    style::section("Summary");
    eprintln!("{}", style::metric("status", result.status()));
    eprintln!(
        "{}",
        style::metric(
            "classes",
            format!("{} of {}", stats.classes_analyzed, stats.classes_supplied)
        )
    );
    eprintln!("{}", style::metric("cycles", result.cycles().len()));
    eprintln!("{}", style::metric("critical cycles", critical));
    eprintln!("{}", style::metric("warnings", result.warnings().len()));
}
