use crate::model::ArchitectureAnalysisResult;
use crate::output::OutputFormatter;
use serde::Serialize;
use std::io::Write;

/// The full analysis result as pretty-printed JSON.
pub struct JsonOutput {
    model_name: String,
}

impl JsonOutput {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    model: &'a str,
    tool_version: &'static str,
    #[serde(flatten)]
    result: &'a ArchitectureAnalysisResult,
}

impl OutputFormatter for JsonOutput {
    fn format<W: Write>(
        &self,
        result: &ArchitectureAnalysisResult,
        writer: &mut W,
    ) -> std::io::Result<()> {
        let report = JsonReport {
            model: &self.model_name,
            tool_version: env!("CARGO_PKG_VERSION"),
            result,
        };

        let json = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisBudget, analyze};
    use crate::model::{ClassDescriptor, FieldDescriptor};

    #[test]
    fn test_json_report_shape() {
        let mut order = ClassDescriptor::new("com.shop.Order");
        order.fields.push(FieldDescriptor {
            name: "customer".to_string(),
            type_name: "com.shop.Customer".to_string(),
            ..Default::default()
        });
        let classes = vec![order, ClassDescriptor::new("com.shop.Customer")];
        let result = analyze(&classes, &AnalysisBudget::unlimited().with_parallelism(1)).unwrap();

        let mut buffer = Vec::new();
        JsonOutput::new("shop").format(&result, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["model"], "shop");
        assert_eq!(value["status"], "complete");
        assert_eq!(value["class_graph"]["level"], "class_level");
        assert_eq!(value["class_graph"]["edges"][0]["kind"], "composition");
        assert!(value["metrics"]["class:com.shop.Order"].is_object());
        assert_eq!(value["metrics"]["class:com.shop.Order"]["efferent"], 1);
        assert!(value["cycles"].as_array().unwrap().is_empty());
    }
}
