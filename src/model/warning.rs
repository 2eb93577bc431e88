use serde::{Deserialize, Serialize};

/// Non-fatal problem found while analyzing a single class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnalysisWarning {
    pub kind: WarningKind,
    /// Class the warning is about, when it has a usable name.
    pub class_name: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Descriptor skipped entirely.
    MalformedDescriptor,
    /// A type reference could not be parsed and was ignored.
    MalformedTypeName,
    /// Method code could not be decoded; complexity falls back to handler count.
    InvalidBytecode,
}

impl AnalysisWarning {
    pub fn malformed_descriptor(class_name: &str, reason: &str) -> Self {
        Self {
            kind: WarningKind::MalformedDescriptor,
            class_name: non_empty(class_name),
            message: format!("Skipped malformed class descriptor: {}", reason),
        }
    }

    pub fn malformed_type(class_name: &str, type_name: &str, reason: &str) -> Self {
        Self {
            kind: WarningKind::MalformedTypeName,
            class_name: non_empty(class_name),
            message: format!("Ignored type reference `{}`: {}", type_name, reason),
        }
    }

    pub fn invalid_bytecode(class_name: &str, method: &str, reason: &str) -> Self {
        Self {
            kind: WarningKind::InvalidBytecode,
            class_name: non_empty(class_name),
            message: format!("Could not decode code of {}: {}", method, reason),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl std::fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.class_name {
            Some(class) => write!(f, "{}: {}", class, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
