//! Class-level dependency extraction.
//!
//! Each class contributes edges from its own descriptor only, so classes can be
//! processed in any order and in parallel. Target types are looked up in the
//! shared read-only `TypeIndex`; anything not found there is either dropped
//! (primitives, type variables, JDK types) or recorded as an external library.

use crate::analysis::{
    DependencyGraph, GraphFragment, TypeRef, erased_signature, fallback_complexity,
    is_platform_type, method_complexity,
};
use crate::model::{
    AnalysisWarning, ClassDescriptor, DependencyNode, EdgeKey, EdgeKind, NodeKind, NodeMetadata,
    TypeIndex, method_id, package_of,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

const OBJECT: &str = "java.lang.Object";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Kinds emitted into the graph; others are classified but dropped.
    pub edge_kinds: BTreeSet<EdgeKind>,
    /// Ignore `java.*`, `javax.*`, `jdk.*`, `sun.*` and `com.sun.*` references.
    pub skip_platform_types: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            edge_kinds: EdgeKind::ALL.into_iter().collect(),
            skip_platform_types: true,
        }
    }
}

pub struct GraphBuilder<'a> {
    index: TypeIndex<'a>,
    options: BuildOptions,
}

enum Target<'a> {
    Analyzed(&'a ClassDescriptor),
    External(String),
}

/// Per-class bookkeeping while its edges are collected.
struct ClassEdges<'a> {
    source: &'a str,
    structural: BTreeMap<(&'a str, EdgeKind), u32>,
    external: BTreeMap<String, u32>,
    /// Targets of composition or aggregation
    held: BTreeSet<&'a str>,
    /// Targets of any structural relationship
    targeted: BTreeSet<&'a str>,
}

impl<'a> ClassEdges<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            structural: BTreeMap::new(),
            external: BTreeMap::new(),
            held: BTreeSet::new(),
            targeted: BTreeSet::new(),
        }
    }

    fn add(&mut self, target: &'a str, kind: EdgeKind, count: u32) {
        // Only recursive structure may point back at the class itself
        if target == self.source
            && !matches!(kind, EdgeKind::Composition | EdgeKind::Aggregation)
        {
            return;
        }
        *self.structural.entry((target, kind)).or_insert(0) += count;
        self.targeted.insert(target);
        if matches!(kind, EdgeKind::Composition | EdgeKind::Aggregation) {
            self.held.insert(target);
        }
    }

    fn add_external(&mut self, name: String) {
        *self.external.entry(name).or_insert(0) += 1;
    }
}

impl<'a> GraphBuilder<'a> {
    pub fn new(index: TypeIndex<'a>, options: BuildOptions) -> Self {
        Self { index, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn index(&self) -> &TypeIndex<'a> {
        &self.index
    }

    /// Builds the class-level graph of `classes` in one pass.
    pub fn build(&self, classes: &[ClassDescriptor]) -> (DependencyGraph, Vec<AnalysisWarning>) {
        self.build_unit(classes).into_graph()
    }

    /// Extracts the nodes and edges of one work unit.
    pub fn build_unit(&self, classes: &[ClassDescriptor]) -> GraphFragment {
        let mut fragment = GraphFragment::new();
        for class in classes {
            self.add_class(class, &mut fragment);
        }
        fragment
    }

    fn add_class(&self, class: &ClassDescriptor, fragment: &mut GraphFragment) {
        if let Err(reason) = class.validate() {
            warn!(class = %class.name, %reason, "skipping malformed class descriptor");
            fragment.warn(AnalysisWarning::malformed_descriptor(&class.name, &reason));
            fragment.record_skipped();
            return;
        }
        // The index holds the descriptor every reference resolves to
        let Some(class) = self.index.get(class.name.trim()) else {
            fragment.record_skipped();
            return;
        };

        fragment.add_node(class_node(class));
        fragment.record_analyzed();

        let source = class.name.trim();
        let mut edges = ClassEdges::new(source);

        self.collect_hierarchy(class, &mut edges, fragment);
        self.collect_fields(class, &mut edges, fragment);
        self.collect_signatures(class, &mut edges, fragment);
        self.collect_invocations(class, &mut edges, fragment);
        self.collect_field_accesses(class, &mut edges, fragment);
        self.collect_references(class, &mut edges, fragment);
        self.collect_methods(class, fragment);

        self.emit(edges, fragment);
    }

    fn collect_hierarchy(
        &self,
        class: &'a ClassDescriptor,
        edges: &mut ClassEdges<'a>,
        fragment: &mut GraphFragment,
    ) {
        if let Some(parent) = class.superclass.as_deref() {
            if let Some(parsed) = self.parse(class, parent, fragment) {
                if parsed.name != OBJECT {
                    match self.classify(&parsed.name) {
                        Some(Target::Analyzed(target)) => {
                            edges.add(target.name.trim(), EdgeKind::Inheritance, 1)
                        }
                        Some(Target::External(name)) => edges.add_external(name),
                        None => {}
                    }
                }
            }
        }

        let mut seen = BTreeSet::new();
        for iface in &class.interfaces {
            let Some(parsed) = self.parse(class, iface, fragment) else {
                continue;
            };
            if !seen.insert(parsed.name.clone()) {
                continue;
            }
            match self.classify(&parsed.name) {
                Some(Target::Analyzed(target)) => {
                    edges.add(target.name.trim(), EdgeKind::Implementation, 1)
                }
                Some(Target::External(name)) => edges.add_external(name),
                None => {}
            }
        }
    }

    fn collect_fields(
        &self,
        class: &'a ClassDescriptor,
        edges: &mut ClassEdges<'a>,
        fragment: &mut GraphFragment,
    ) {
        let mut generic_arguments = Vec::new();
        for field in &class.fields {
            let Some(parsed) = self.parse(class, &field.type_name, fragment) else {
                continue;
            };

            if parsed.is_collection() {
                if !parsed.is_array() {
                    self.note_external(&parsed.name, edges);
                }
                let mut elements = BTreeSet::new();
                for name in parsed.element_class_names() {
                    match self.classify(name) {
                        Some(Target::Analyzed(target)) => {
                            elements.insert(target.name.trim());
                        }
                        Some(Target::External(name)) => edges.add_external(name),
                        None => {}
                    }
                }
                for target in elements {
                    edges.add(target, EdgeKind::Aggregation, 1);
                }
                continue;
            }

            match self.classify(&parsed.name) {
                Some(Target::Analyzed(target)) => {
                    edges.add(target.name.trim(), EdgeKind::Composition, 1)
                }
                Some(Target::External(name)) => edges.add_external(name),
                None => {}
            }
            generic_arguments.extend(parsed.arguments);
        }

        // Arguments of a non-collection generic, e.g. Optional<Order>, are plain
        // uses. They run after every held type is known, so field order is irrelevant.
        for arg in &generic_arguments {
            for name in arg.class_names() {
                self.note_use(name, EdgeKind::Association, edges);
            }
        }
    }

    fn collect_signatures(
        &self,
        class: &'a ClassDescriptor,
        edges: &mut ClassEdges<'a>,
        fragment: &mut GraphFragment,
    ) {
        for method in &class.methods {
            let types = method
                .parameter_types
                .iter()
                .chain(std::iter::once(&method.return_type))
                .filter(|t| !t.trim().is_empty());
            for raw in types {
                let Some(parsed) = self.parse(class, raw, fragment) else {
                    continue;
                };
                for name in parsed.class_names() {
                    self.note_use(name, EdgeKind::Association, edges);
                }
            }
        }
    }

    fn collect_invocations(
        &self,
        class: &'a ClassDescriptor,
        edges: &mut ClassEdges<'a>,
        fragment: &mut GraphFragment,
    ) {
        let source = class.name.trim();
        let mut invoked: BTreeMap<&'a str, BTreeSet<String>> = BTreeMap::new();

        for method in &class.methods {
            let caller = method_id(source, &erased_signature(&method.name, &method.parameter_types));
            let mut calls = BTreeSet::new();

            for call in &method.invocations {
                let Some(owner) = self.parse(class, &call.owner, fragment) else {
                    continue;
                };
                let signature = erased_signature(&call.name, &call.parameter_types);

                match self.classify(&owner.name) {
                    Some(Target::Analyzed(target)) => {
                        let target_name = target.name.trim();
                        if target_name != source {
                            invoked
                                .entry(target_name)
                                .or_default()
                                .insert(signature.clone());
                        }
                        if let Some(declaring) = self.index.resolve_method(target_name, &signature)
                        {
                            calls.insert(method_id(declaring, &signature));
                        }
                    }
                    Some(Target::External(name)) => edges.add_external(name),
                    None => {}
                }
            }

            for callee in calls {
                fragment.add_invocation(caller.clone(), callee);
            }
        }

        for (target, methods) in invoked {
            edges.add(target, EdgeKind::MethodInvocation, methods.len() as u32);
        }
    }

    fn collect_field_accesses(
        &self,
        class: &'a ClassDescriptor,
        edges: &mut ClassEdges<'a>,
        fragment: &mut GraphFragment,
    ) {
        let source = class.name.trim();
        let mut accessed: BTreeMap<&'a str, BTreeSet<&'a str>> = BTreeMap::new();

        for access in class.methods.iter().flat_map(|m| &m.field_accesses) {
            let Some(owner) = self.parse(class, &access.owner, fragment) else {
                continue;
            };
            match self.classify(&owner.name) {
                Some(Target::Analyzed(target)) if target.name.trim() != source => {
                    accessed
                        .entry(target.name.trim())
                        .or_default()
                        .insert(access.name.trim());
                }
                Some(Target::External(name)) => edges.add_external(name),
                _ => {}
            }
        }

        for (target, fields) in accessed {
            edges.add(target, EdgeKind::FieldAccess, fields.len() as u32);
        }
    }

    fn collect_references(
        &self,
        class: &'a ClassDescriptor,
        edges: &mut ClassEdges<'a>,
        fragment: &mut GraphFragment,
    ) {
        let mut imports = BTreeSet::new();
        for raw in &class.referenced_types {
            let Some(parsed) = self.parse(class, raw, fragment) else {
                continue;
            };
            for name in parsed.class_names() {
                match self.classify(name) {
                    Some(Target::Analyzed(target)) => {
                        let target = target.name.trim();
                        if target != edges.source && !edges.targeted.contains(target) {
                            imports.insert(target);
                        }
                    }
                    Some(Target::External(name)) => edges.add_external(name),
                    None => {}
                }
            }
        }
        for target in imports {
            edges.add(target, EdgeKind::Import, 1);
        }
    }

    fn collect_methods(&self, class: &ClassDescriptor, fragment: &mut GraphFragment) {
        let owner = class.name.trim();
        for method in &class.methods {
            let complexity = match method_complexity(method) {
                Ok(value) => value,
                Err(e) => {
                    fragment.warn(AnalysisWarning::invalid_bytecode(
                        owner,
                        &method.signature(),
                        &e.to_string(),
                    ));
                    fallback_complexity(method)
                }
            };
            let signature = erased_signature(&method.name, &method.parameter_types);
            fragment.add_method(DependencyNode::new(
                method_id(owner, &signature),
                NodeKind::Method,
                NodeMetadata {
                    is_abstract: method.modifiers.is_abstract,
                    owner: Some(owner.to_string()),
                    complexity: Some(complexity),
                    ..Default::default()
                },
            ));
        }
    }

    /// Records a plain use of `name` unless a field already holds that type.
    fn note_use(&self, name: &str, kind: EdgeKind, edges: &mut ClassEdges<'a>) {
        match self.classify(name) {
            Some(Target::Analyzed(target)) => {
                let target = target.name.trim();
                if !edges.held.contains(target) {
                    edges.add(target, kind, 1);
                }
            }
            Some(Target::External(name)) => edges.add_external(name),
            None => {}
        }
    }

    fn note_external(&self, name: &str, edges: &mut ClassEdges<'a>) {
        if let Some(Target::External(name)) = self.classify(name) {
            edges.add_external(name);
        }
    }

    fn classify(&self, name: &str) -> Option<Target<'a>> {
        if let Some(class) = self.index.get(name) {
            return Some(Target::Analyzed(class));
        }
        if self.options.skip_platform_types && is_platform_type(name) {
            return None;
        }
        // Undotted unknown names are type variables or default-package strays
        if !name.contains('.') {
            return None;
        }
        Some(Target::External(name.to_string()))
    }

    fn parse(
        &self,
        class: &ClassDescriptor,
        raw: &str,
        fragment: &mut GraphFragment,
    ) -> Option<TypeRef> {
        match TypeRef::parse(raw) {
            Ok(Some(parsed)) if !parsed.is_primitive() => Some(parsed),
            Ok(_) => None,
            Err(e) => {
                fragment.warn(AnalysisWarning::malformed_type(
                    &class.name,
                    raw,
                    &e.to_string(),
                ));
                None
            }
        }
    }

    fn emit(&self, edges: ClassEdges<'a>, fragment: &mut GraphFragment) {
        let enabled = |kind: EdgeKind| self.options.edge_kinds.contains(&kind);

        for ((target, kind), count) in edges.structural {
            if !enabled(kind) {
                continue;
            }
            // The target's own unit replaces this node once it is merged
            if let Some(class) = self.index.get(target).filter(|_| target != edges.source) {
                fragment.add_node(reference_node(class));
            }
            fragment.add_edge(EdgeKey::new(edges.source, target, kind), count);
        }

        if enabled(EdgeKind::ExternalLibrary) {
            for (name, count) in edges.external {
                fragment.add_node(DependencyNode::external_class(&name, package_of(&name)));
                fragment.add_edge(
                    EdgeKey::new(edges.source, name, EdgeKind::ExternalLibrary),
                    count,
                );
            }
        }
    }
}

/// The class node of an analyzed descriptor.
pub(crate) fn class_node(class: &ClassDescriptor) -> DependencyNode {
    DependencyNode::new(
        class.name.trim(),
        NodeKind::Class,
        NodeMetadata {
            is_external: false,
            is_abstract: class.is_abstract_type(),
            is_interface: class.is_interface(),
            method_count: class.method_count(),
            field_count: class.field_count(),
            owner: Some(class.package_name().to_string()),
            byte_count: class.size.byte_count,
            ..Default::default()
        },
    )
}

/// Class node for an analyzed edge target whose own descriptor has not been
/// processed by this fragment.
fn reference_node(class: &ClassDescriptor) -> DependencyNode {
    let mut node = class_node(class);
    node.metadata.is_reference_only = true;
    node
}

/// Builds the class-level graph of `classes`, keeping only edges of `kinds`.
pub fn build_graph(
    classes: &[ClassDescriptor],
    kinds: &BTreeSet<EdgeKind>,
) -> (DependencyGraph, Vec<AnalysisWarning>) {
    let options = BuildOptions {
        edge_kinds: kinds.clone(),
        ..Default::default()
    };
    GraphBuilder::new(TypeIndex::new(classes), options).build(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ClassKind, FieldDescriptor, FieldRef, GraphLevel, MethodDescriptor, MethodRef,
        WarningKind,
    };

    fn field(name: &str, type_name: &str) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    fn call(owner: &str, name: &str) -> MethodRef {
        MethodRef {
            owner: owner.to_string(),
            name: name.to_string(),
            parameter_types: Vec::new(),
        }
    }

    fn method_with_calls(name: &str, calls: Vec<MethodRef>) -> MethodDescriptor {
        let mut method = MethodDescriptor::new(name);
        method.invocations = calls;
        method
    }

    fn build(classes: &[ClassDescriptor]) -> (DependencyGraph, Vec<AnalysisWarning>) {
        build_graph(classes, &EdgeKind::ALL.into_iter().collect())
    }

    fn count(graph: &DependencyGraph, source: &str, target: &str, kind: EdgeKind) -> Option<u32> {
        graph.edge(source, target, kind).map(|e| e.count)
    }

    #[test]
    fn test_unrelated_classes_have_no_edges() {
        let classes: Vec<_> = ["a.A", "a.B", "b.C"]
            .into_iter()
            .map(ClassDescriptor::new)
            .collect();
        let (graph, warnings) = build(&classes);
        assert_eq!(graph.level(), GraphLevel::ClassLevel);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_hierarchy_edges() {
        let mut repo = ClassDescriptor::new("shop.Repo");
        repo.kind = ClassKind::Interface;
        let base = ClassDescriptor::new("shop.Base");
        let mut impl_class = ClassDescriptor::new("shop.JdbcRepo");
        impl_class.superclass = Some("shop/Base".to_string());
        impl_class.interfaces = vec!["shop.Repo".to_string(), "Lshop/Repo;".to_string()];
        let mut plain = ClassDescriptor::new("shop.Plain");
        plain.superclass = Some("java.lang.Object".to_string());

        let (graph, _) = build(&[repo, base, impl_class, plain]);
        assert_eq!(count(&graph, "shop.JdbcRepo", "shop.Base", EdgeKind::Inheritance), Some(1));
        assert_eq!(
            count(&graph, "shop.JdbcRepo", "shop.Repo", EdgeKind::Implementation),
            Some(1)
        );
        assert_eq!(graph.fan_out("shop.Plain"), 0);
    }

    #[test]
    fn test_fields_split_into_composition_and_aggregation() {
        let mut order = ClassDescriptor::new("shop.Order");
        order.fields = vec![
            field("customer", "shop.Customer"),
            field("billing", "shop.Customer"),
            field("lines", "java.util.List<shop.Line>"),
            field("history", "shop.Line[]"),
            field("parent", "shop.Order"),
            field("total", "long"),
        ];
        let classes = vec![
            order,
            ClassDescriptor::new("shop.Customer"),
            ClassDescriptor::new("shop.Line"),
        ];

        let (graph, _) = build(&classes);
        assert_eq!(
            count(&graph, "shop.Order", "shop.Customer", EdgeKind::Composition),
            Some(2)
        );
        assert_eq!(count(&graph, "shop.Order", "shop.Line", EdgeKind::Aggregation), Some(2));
        // Recursive structure keeps its self edge
        assert_eq!(count(&graph, "shop.Order", "shop.Order", EdgeKind::Composition), Some(1));
        assert!(!graph.contains("java.util.List"));
    }

    #[test]
    fn test_association_skips_held_types() {
        let mut service = ClassDescriptor::new("shop.Service");
        service.fields = vec![field("repo", "shop.Repo")];
        let mut save = MethodDescriptor::new("save");
        save.parameter_types = vec!["shop.Order".to_string(), "shop.Repo".to_string()];
        save.return_type = "shop.Order".to_string();
        service.methods = vec![save];

        let classes = vec![
            service,
            ClassDescriptor::new("shop.Repo"),
            ClassDescriptor::new("shop.Order"),
        ];
        let (graph, _) = build(&classes);
        assert_eq!(
            count(&graph, "shop.Service", "shop.Order", EdgeKind::Association),
            Some(2)
        );
        assert_eq!(count(&graph, "shop.Service", "shop.Repo", EdgeKind::Association), None);
    }

    #[test]
    fn test_generic_field_association_ignores_field_order() {
        let holder = |types: [&str; 2]| {
            let mut holder = ClassDescriptor::new("p.Holder");
            holder.fields = vec![field("maybe", types[0]), field("b", types[1])];
            vec![holder, ClassDescriptor::new("p.B")]
        };
        let (first, _) = build(&holder(["java.util.Optional<p.B>", "p.B"]));
        let (second, _) = build(&holder(["p.B", "java.util.Optional<p.B>"]));

        assert_eq!(first, second);
        assert_eq!(count(&first, "p.Holder", "p.B", EdgeKind::Composition), Some(1));
        assert_eq!(count(&first, "p.Holder", "p.B", EdgeKind::Association), None);
        assert_eq!(first.edge_count(), 1);
    }

    #[test]
    fn test_targets_outside_the_unit_are_reference_only() {
        let mut a = ClassDescriptor::new("p.A");
        a.fields = vec![field("b", "p.B"), field("next", "p.A")];
        let classes = vec![a, ClassDescriptor::new("p.B")];
        let builder = GraphBuilder::new(TypeIndex::new(&classes), BuildOptions::default());

        let (partial, _) = builder.build_unit(&classes[..1]).into_graph();
        assert!(partial.node("p.A").unwrap().is_merged());
        assert!(partial.node("p.B").unwrap().metadata.is_reference_only);

        let (complete, _) = builder.build_unit(&classes).into_graph();
        assert!(complete.nodes().all(|n| n.is_merged()));
    }

    #[test]
    fn test_invocations_count_distinct_methods() {
        let mut client = ClassDescriptor::new("shop.Client");
        client.methods = vec![
            method_with_calls("a", vec![call("shop.Api", "get"), call("shop.Api", "put")]),
            method_with_calls("b", vec![call("shop/Api", "get"), call("shop.Client", "a")]),
        ];
        let mut api = ClassDescriptor::new("shop.Api");
        api.methods = vec![MethodDescriptor::new("get"), MethodDescriptor::new("put")];

        let (graph, _) = build(&[client, api]);
        assert_eq!(
            count(&graph, "shop.Client", "shop.Api", EdgeKind::MethodInvocation),
            Some(2)
        );
        assert_eq!(
            count(&graph, "shop.Client", "shop.Client", EdgeKind::MethodInvocation),
            None
        );

        let methods = graph.to_method_graph();
        assert_eq!(methods.node_count(), 4);
        assert!(
            methods
                .edge("shop.Client#b()", "shop.Client#a()", EdgeKind::MethodInvocation)
                .is_some()
        );
        assert!(
            methods
                .edge("shop.Client#a()", "shop.Api#put()", EdgeKind::MethodInvocation)
                .is_some()
        );
    }

    #[test]
    fn test_inherited_method_links_to_declaring_class() {
        let mut base = ClassDescriptor::new("shop.Base");
        base.methods = vec![MethodDescriptor::new("audit")];
        let mut child = ClassDescriptor::new("shop.Child");
        child.superclass = Some("shop.Base".to_string());
        let mut caller = ClassDescriptor::new("shop.Caller");
        caller.methods = vec![method_with_calls("run", vec![call("shop.Child", "audit")])];

        let (graph, _) = build(&[base, child, caller]);
        assert!(graph.edge("shop.Caller", "shop.Child", EdgeKind::MethodInvocation).is_some());
        let methods = graph.to_method_graph();
        assert!(
            methods
                .edge("shop.Caller#run()", "shop.Base#audit()", EdgeKind::MethodInvocation)
                .is_some()
        );
    }

    #[test]
    fn test_field_access_counts_distinct_fields() {
        let mut reader = ClassDescriptor::new("shop.Reader");
        let mut read = MethodDescriptor::new("read");
        read.field_accesses = ["size", "size", "name"]
            .into_iter()
            .map(|name| FieldRef {
                owner: "shop.Config".to_string(),
                name: name.to_string(),
            })
            .collect();
        reader.methods = vec![read];

        let (graph, _) = build(&[reader, ClassDescriptor::new("shop.Config")]);
        assert_eq!(count(&graph, "shop.Reader", "shop.Config", EdgeKind::FieldAccess), Some(2));
    }

    #[test]
    fn test_imports_only_for_unclassified_references() {
        let mut app = ClassDescriptor::new("shop.App");
        app.fields = vec![field("config", "shop.Config")];
        app.referenced_types = vec![
            "shop.Config".to_string(),
            "shop/Constants".to_string(),
            "shop.Constants".to_string(),
        ];
        let classes = vec![
            app,
            ClassDescriptor::new("shop.Config"),
            ClassDescriptor::new("shop.Constants"),
        ];

        let (graph, _) = build(&classes);
        assert_eq!(count(&graph, "shop.App", "shop.Constants", EdgeKind::Import), Some(1));
        assert_eq!(count(&graph, "shop.App", "shop.Config", EdgeKind::Import), None);
    }

    #[test]
    fn test_external_types_become_library_nodes() {
        let mut client = ClassDescriptor::new("shop.Client");
        client.fields = vec![
            field("mapper", "com.fasterxml.jackson.ObjectMapper"),
            field("name", "java.lang.String"),
            field("cache", "java.util.Map<java.lang.String, com.google.Cache>"),
        ];
        client.referenced_types = vec!["com.fasterxml.jackson.ObjectMapper".to_string()];

        let (graph, _) = build(&[client]);
        assert_eq!(
            count(
                &graph,
                "shop.Client",
                "com.fasterxml.jackson.ObjectMapper",
                EdgeKind::ExternalLibrary
            ),
            Some(2)
        );
        assert!(graph.contains("com.google.Cache"));
        assert!(!graph.contains("java.lang.String"));

        let mapper = graph.node("com.fasterxml.jackson.ObjectMapper").unwrap();
        assert!(mapper.metadata.is_external);
        assert_eq!(graph.fan_out("com.fasterxml.jackson.ObjectMapper"), 0);
    }

    #[test]
    fn test_platform_types_kept_when_not_skipped() {
        let mut client = ClassDescriptor::new("shop.Client");
        client.fields = vec![field("name", "java.lang.String")];
        let classes = vec![client];
        let options = BuildOptions {
            skip_platform_types: false,
            ..Default::default()
        };
        let (graph, _) = GraphBuilder::new(TypeIndex::new(&classes), options).build(&classes);
        assert!(graph.contains("java.lang.String"));
    }

    #[test]
    fn test_edge_kind_filter() {
        let mut a = ClassDescriptor::new("p.A");
        a.superclass = Some("p.B".to_string());
        a.fields = vec![field("b", "p.B")];
        let classes = vec![a, ClassDescriptor::new("p.B")];

        let (graph, _) = build_graph(&classes, &BTreeSet::from([EdgeKind::Composition]));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge("p.A", "p.B", EdgeKind::Composition).is_some());
    }

    #[test]
    fn test_malformed_input_is_skipped_with_warnings() {
        let mut broken_type = ClassDescriptor::new("p.A");
        broken_type.fields = vec![field("x", "java.util.List<p.B"), field("y", "p.B")];
        let mut bad_code = MethodDescriptor::new("run");
        bad_code.code = Some(vec![0x99]);
        broken_type.methods = vec![bad_code];

        let classes = vec![
            ClassDescriptor::default(),
            broken_type,
            ClassDescriptor::new("p.B"),
        ];
        let (graph, warnings) = build(&classes);

        let kinds: BTreeSet<_> = warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            BTreeSet::from([
                WarningKind::MalformedDescriptor,
                WarningKind::MalformedTypeName,
                WarningKind::InvalidBytecode,
            ])
        );
        assert_eq!(graph.node_count(), 2);
        assert!(graph.edge("p.A", "p.B", EdgeKind::Composition).is_some());
    }

    #[test]
    fn test_unit_order_does_not_matter() {
        let mut a = ClassDescriptor::new("p.A");
        a.fields = vec![field("b", "p.B")];
        let mut b = ClassDescriptor::new("p.B");
        b.methods = vec![method_with_calls("go", vec![call("p.A", "run")])];
        let classes = vec![a, b];

        let builder = GraphBuilder::new(TypeIndex::new(&classes), BuildOptions::default());
        let mut forward = builder.build_unit(&classes[..1]);
        forward.merge(builder.build_unit(&classes[1..]));
        let mut backward = builder.build_unit(&classes[1..]);
        backward.merge(builder.build_unit(&classes[..1]));

        assert_eq!(forward.into_graph().0, backward.into_graph().0);
    }
}
