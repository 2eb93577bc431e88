use crate::analysis::{class_name, erased_signature};
use crate::model::{ClassDescriptor, MethodDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The class descriptors of one archive, as handed over by the class-file reader.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuralModel {
    /// Archive or project name, informational only.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ClassDescriptor>,
}

impl StructuralModel {
    pub fn new(name: impl Into<String>, classes: Vec<ClassDescriptor>) -> Self {
        Self {
            name: name.into(),
            classes,
        }
    }

    /// Accepts either `{"name": .., "classes": [..]}` or a bare array of descriptors.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Model(StructuralModel),
            Classes(Vec<ClassDescriptor>),
        }

        Ok(match serde_json::from_str(json)? {
            Raw::Model(model) => model,
            Raw::Classes(classes) => Self::new("", classes),
        })
    }

    pub fn type_index(&self) -> TypeIndex<'_> {
        TypeIndex::new(&self.classes)
    }
}

/// Read-only lookup from qualified name to descriptor, built once per analysis
/// and shared by every worker. Malformed descriptors are left out so that
/// references to them resolve as external.
#[derive(Debug, Clone, Default)]
pub struct TypeIndex<'a> {
    classes: HashMap<&'a str, &'a ClassDescriptor>,
}

const MAX_HIERARCHY_DEPTH: usize = 64;

impl<'a> TypeIndex<'a> {
    pub fn new(classes: &'a [ClassDescriptor]) -> Self {
        let classes = classes
            .iter()
            .filter(|c| c.validate().is_ok())
            .map(|c| (c.name.trim(), c))
            .collect();
        Self { classes }
    }

    pub fn get(&self, name: &str) -> Option<&'a ClassDescriptor> {
        self.classes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Finds the analyzed class that declares `signature` (in erased form), starting
    /// at `owner` and walking superclasses first, then interfaces (default methods).
    pub fn resolve_method(&self, owner: &str, signature: &str) -> Option<&'a str> {
        let mut queue = vec![(owner.to_string(), 0usize)];
        let mut seen: Vec<String> = Vec::new();

        while let Some((current, depth)) = queue.pop() {
            if depth > MAX_HIERARCHY_DEPTH || seen.contains(&current) {
                continue;
            }

            let Some(class) = self.get(&current) else {
                continue;
            };
            seen.push(current);
            if declares(class, signature) {
                return Some(class.name.trim());
            }

            // Interfaces are pushed first so the superclass is popped before them
            for iface in class.interfaces.iter().rev() {
                if let Some(name) = class_name(iface) {
                    queue.push((name, depth + 1));
                }
            }
            if let Some(parent) = class.superclass.as_deref().and_then(class_name) {
                queue.push((parent, depth + 1));
            }
        }

        None
    }
}

fn declares(class: &ClassDescriptor, signature: &str) -> bool {
    class
        .methods
        .iter()
        .any(|m: &MethodDescriptor| erased_signature(&m.name, &m.parameter_types) == signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassKind;

    fn class_with_method(name: &str, superclass: Option<&str>, method: Option<&str>) -> ClassDescriptor {
        let mut class = ClassDescriptor::new(name);
        class.superclass = superclass.map(str::to_string);
        if let Some(m) = method {
            class.methods.push(MethodDescriptor::new(m));
        }
        class
    }

    #[test]
    fn test_index_skips_malformed_descriptors() {
        let classes = vec![ClassDescriptor::new("com.a.Good"), ClassDescriptor::default()];
        let index = TypeIndex::new(&classes);
        assert_eq!(index.len(), 1);
        assert!(index.contains("com.a.Good"));
    }

    #[test]
    fn test_resolves_inherited_method() {
        let classes = vec![
            class_with_method("com.a.Base", None, Some("save")),
            class_with_method("com.a.Mid", Some("com.a.Base"), None),
            class_with_method("com.a.Leaf", Some("com.a.Mid"), None),
        ];
        let index = TypeIndex::new(&classes);
        assert_eq!(index.resolve_method("com.a.Leaf", "save()"), Some("com.a.Base"));
        assert_eq!(index.resolve_method("com.a.Leaf", "load()"), None);
    }

    #[test]
    fn test_resolves_default_interface_method() {
        let mut iface = class_with_method("com.a.Auditable", None, Some("audit"));
        iface.kind = ClassKind::Interface;
        let mut impl_class = class_with_method("com.a.Order", None, None);
        impl_class.interfaces.push("com.a.Auditable".to_string());

        let classes = vec![iface, impl_class];
        let index = TypeIndex::new(&classes);
        assert_eq!(
            index.resolve_method("com.a.Order", "audit()"),
            Some("com.a.Auditable")
        );
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let classes = vec![
            class_with_method("com.a.A", Some("com.a.B"), None),
            class_with_method("com.a.B", Some("com.a.A"), None),
        ];
        let index = TypeIndex::new(&classes);
        assert_eq!(index.resolve_method("com.a.A", "run()"), None);
    }

    #[test]
    fn test_model_accepts_bare_array() {
        let model = StructuralModel::from_json_str(r#"[{"name": "com.a.A"}]"#).unwrap();
        assert_eq!(model.classes.len(), 1);

        let named =
            StructuralModel::from_json_str(r#"{"name": "shop.jar", "classes": []}"#).unwrap();
        assert_eq!(named.name, "shop.jar");
    }
}
