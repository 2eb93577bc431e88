use serde::{Deserialize, Serialize};

/// Structural descriptor of one compiled class, as produced by the class-file reader.
///
/// Type names may be written in source form (`com.acme.Repo`, `java.util.List<com.acme.Repo>`),
/// JVM internal form (`com/acme/Repo`) or as field descriptors (`Lcom/acme/Repo;`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassDescriptor {
    /// Fully-qualified binary name, e.g. `com.acme.Outer$Inner`.
    pub name: String,
    /// Package name; derived from `name` when left empty.
    pub package: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    /// Type references from the constant pool, annotations and static usages.
    pub referenced_types: Vec<String>,
    pub size: SizeHints,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Annotation,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Modifiers {
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_static: bool,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_name: String,
    pub visibility: Visibility,
    pub is_static: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub return_type: String,
    pub modifiers: Modifiers,
    /// Precomputed conditional branch points (branch opcodes and switch cases).
    pub branch_count: Option<u32>,
    /// Exception handler entries (catch blocks).
    pub handler_count: u32,
    /// Raw `Code` attribute bytes, used when `branch_count` is absent.
    pub code: Option<Vec<u8>>,
    pub invocations: Vec<MethodRef>,
    pub field_accesses: Vec<FieldRef>,
}

/// A method invoked from bytecode (`invoke*` instructions).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(default)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub parameter_types: Vec<String>,
}

/// A field read or written from bytecode (`get*`/`put*` instructions).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(default)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SizeHints {
    pub byte_count: u64,
    pub method_count: Option<usize>,
    pub field_count: Option<usize>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The package this class belongs to, falling back to the name prefix.
    pub fn package_name(&self) -> &str {
        if self.package.is_empty() {
            package_of(&self.name)
        } else {
            &self.package
        }
    }

    /// Abstract classes, interfaces and annotation types count as abstract.
    pub fn is_abstract_type(&self) -> bool {
        self.modifiers.is_abstract
            || matches!(self.kind, ClassKind::Interface | ClassKind::Annotation)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, ClassKind::Interface | ClassKind::Annotation)
    }

    pub fn method_count(&self) -> usize {
        self.size.method_count.unwrap_or(self.methods.len())
    }

    pub fn field_count(&self) -> usize {
        self.size.field_count.unwrap_or(self.fields.len())
    }

    /// Checks the fields every downstream stage relies on.
    /// Returns a description of the first defect found.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("missing class name".to_string());
        }
        if !is_binary_name(name) {
            return Err(format!("invalid class name `{}`", self.name));
        }
        if !self.package.is_empty() && self.package != package_of(name) {
            return Err(format!(
                "package `{}` does not match class name `{}`",
                self.package, self.name
            ));
        }
        if let Some(field) = self.fields.iter().find(|f| f.name.trim().is_empty()) {
            return Err(format!("field of type `{}` has no name", field.type_name));
        }
        if self.methods.iter().any(|m| m.name.trim().is_empty()) {
            return Err("method without a name".to_string());
        }
        Ok(())
    }
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: "void".to_string(),
            ..Default::default()
        }
    }

    /// Stable identifier of this method inside its owner: `name(T1,T2)`.
    pub fn signature(&self) -> String {
        method_signature(&self.name, &self.parameter_types)
    }
}

pub const DEFAULT_PACKAGE: &str = "(default)";

/// Package part of a binary class name; `(default)` for the unnamed package.
pub fn package_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => DEFAULT_PACKAGE,
    }
}

pub fn method_signature(name: &str, parameter_types: &[String]) -> String {
    format!("{}({})", name, parameter_types.join(","))
}

/// Identifier of a method node: `com.acme.Repo#find(long)`.
pub fn method_id(owner: &str, signature: &str) -> String {
    format!("{}#{}", owner, signature)
}

fn is_binary_name(name: &str) -> bool {
    name.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
                chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
            }
            _ => false,
        }
    })
}
