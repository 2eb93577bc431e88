mod json;
mod markdown;

pub use json::JsonOutput;
pub use markdown::MarkdownOutput;

use crate::model::ArchitectureAnalysisResult;
use std::io::Write;

pub trait OutputFormatter {
    fn format<W: Write>(
        &self,
        result: &ArchitectureAnalysisResult,
        writer: &mut W,
    ) -> std::io::Result<()>;
}
