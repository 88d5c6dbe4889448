//! Python AST extractor
//!
//! Parses one source file with tree-sitter and lowers it into the
//! language-neutral `ModuleAst`. A syntax error never aborts a scan: the
//! extractor returns an empty module with `parse_error` set, and the rule
//! engine turns that into a low-severity synthetic violation. Unsupported
//! languages produce the same shape.

use std::collections::BTreeSet;

use tracing::{debug, instrument, warn};
use tree_sitter::{Node, Parser};

use blastshield_core::config::AnalysisConfig;

use crate::domain::{
    ArgumentInfo, CallSite, ClassDef, ContainerKind, ExceptionHandler, ExceptionSummary,
    FunctionDef, ImportStmt, LocalBinding, LoopSummary, ModuleAssignment, ModuleAst, Parameter,
    ReturnSummary, SourceFile, SourceLanguage,
};

/// Extraction errors. Grammar failures are unrecoverable; everything else
/// degrades to `parse_error` on the module.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to load Python grammar: {0}")]
    Grammar(String),
}

/// Reusable Python frontend. One instance per task; tree-sitter parsers
/// are cheap but not `Sync`.
pub struct PythonExtractor {
    parser: Parser,
    config: AnalysisConfig,
}

impl PythonExtractor {
    pub fn new(config: AnalysisConfig) -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| ExtractError::Grammar(e.to_string()))?;
        debug!("Python parser initialized");
        Ok(Self { parser, config })
    }

    /// Extract the module model for one input file. Never fails: syntax
    /// errors and unsupported languages yield an empty module with the
    /// appropriate flags set.
    #[instrument(skip(self, file), fields(path = %file.path, bytes = file.content.len()))]
    pub fn extract(&mut self, file: &SourceFile) -> ModuleAst {
        let language = SourceLanguage::from_path(&file.path);
        let total_lines = file.content.lines().count();

        if !language.is_supported() {
            debug!(language = %language, "Unsupported source language");
            return ModuleAst::empty(&file.path, language, total_lines);
        }

        let tree = match self.parser.parse(&file.content, None) {
            Some(tree) => tree,
            None => {
                warn!("tree-sitter returned no tree");
                let mut module = ModuleAst::empty(&file.path, language, total_lines);
                module.parse_error = true;
                module.parse_error_detail = Some("parser produced no syntax tree".to_string());
                return module;
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            let detail = first_error_line(root)
                .map(|line| format!("syntax error near line {line}"))
                .unwrap_or_else(|| "syntax error".to_string());
            debug!(detail = %detail, "Parse error");
            let mut module = ModuleAst::empty(&file.path, language, total_lines);
            module.parse_error = true;
            module.parse_error_detail = Some(detail);
            return module;
        }

        let source = file.content.as_str();
        let mut module = ModuleAst::empty(&file.path, language, total_lines);

        // Pass 1: module-level names, so function bodies can classify
        // global reads and writes.
        let mut module_names: BTreeSet<String> = BTreeSet::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "function_definition" => {
                    if let Some(name) = field_text(child, "name", source) {
                        module_names.insert(name.to_string());
                    }
                }
                "decorated_definition" => {
                    if let Some(def) = child.child_by_field_name("definition") {
                        if let Some(name) = field_text(def, "name", source) {
                            module_names.insert(name.to_string());
                        }
                    }
                }
                "class_definition" => {
                    if let Some(name) = field_text(child, "name", source) {
                        module_names.insert(name.to_string());
                    }
                }
                "expression_statement" => {
                    for target in assignment_targets(child, source) {
                        module_names.insert(target);
                    }
                }
                _ => {}
            }
        }

        // Pass 2: full lowering.
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "function_definition" => {
                    let func = self.lower_function(child, Vec::new(), None, &module_names, source);
                    module.functions.push(func);
                }
                "decorated_definition" => {
                    let decorators = decorator_names(child, source);
                    if let Some(def) = child.child_by_field_name("definition") {
                        match def.kind() {
                            "function_definition" => {
                                let func =
                                    self.lower_function(def, decorators, None, &module_names, source);
                                module.functions.push(func);
                            }
                            "class_definition" => {
                                let class =
                                    self.lower_class(def, decorators, &module_names, source);
                                module.classes.push(class);
                            }
                            _ => {}
                        }
                    }
                }
                "class_definition" => {
                    let class = self.lower_class(child, Vec::new(), &module_names, source);
                    module.classes.push(class);
                }
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    module.imports.extend(lower_import(child, source));
                }
                "expression_statement" => {
                    module.assignments.extend(lower_module_assignment(child, source));
                }
                _ => {}
            }
        }

        module.module_level_names = module_names.into_iter().collect();
        debug!(
            functions = module.functions.len(),
            classes = module.classes.len(),
            imports = module.imports.len(),
            "Module extracted"
        );
        module
    }

    fn lower_function(
        &self,
        node: Node,
        decorators: Vec<String>,
        class_name: Option<&str>,
        module_names: &BTreeSet<String>,
        source: &str,
    ) -> FunctionDef {
        let name = field_text(node, "name", source).unwrap_or("<anonymous>").to_string();
        let qualified_name = match class_name {
            Some(class) => format!("{class}.{name}"),
            None => name.clone(),
        };
        let is_async = has_keyword_child(node, "async");

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| lower_parameters(p, source))
            .unwrap_or_default();
        let return_annotation = field_text(node, "return_type", source).map(str::to_string);

        let mut facts = BodyFacts::default();
        if let Some(body) = node.child_by_field_name("body") {
            let params: BTreeSet<String> = parameters.iter().map(|p| p.name.clone()).collect();
            let collector = BodyCollector {
                source,
                module_names,
                params,
                mutating_methods: &self.config.mutating_methods,
            };
            collector.collect(body, &mut facts);
            facts.has_top_level_try = direct_children_contain(body, "try_statement");
        }

        FunctionDef {
            name,
            qualified_name,
            line: line_of(node),
            end_line: end_line_of(node),
            is_async,
            decorators,
            parameters,
            return_annotation,
            nested_functions: facts.nested_functions,
            calls: facts.calls,
            loops: facts.loops,
            local_bindings: facts.local_bindings,
            reads_globals: facts.reads.into_iter().collect(),
            writes_globals: facts.writes.into_iter().collect(),
            returns: facts.returns,
            exceptions: ExceptionSummary {
                has_try: facts.has_try,
                has_top_level_try: facts.has_top_level_try,
                handlers: facts.handlers,
            },
        }
    }

    fn lower_class(
        &self,
        node: Node,
        decorators: Vec<String>,
        module_names: &BTreeSet<String>,
        source: &str,
    ) -> ClassDef {
        let name = field_text(node, "name", source).unwrap_or("<anonymous>").to_string();
        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| {
                let mut cursor = args.walk();
                args.named_children(&mut cursor)
                    .map(|b| render_name(b, source))
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut methods = Vec::new();
        let mut class_variables = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                match item.kind() {
                    "function_definition" => {
                        methods.push(self.lower_function(
                            item,
                            Vec::new(),
                            Some(&name),
                            module_names,
                            source,
                        ));
                    }
                    "decorated_definition" => {
                        let method_decorators = decorator_names(item, source);
                        if let Some(def) = item.child_by_field_name("definition") {
                            if def.kind() == "function_definition" {
                                methods.push(self.lower_function(
                                    def,
                                    method_decorators,
                                    Some(&name),
                                    module_names,
                                    source,
                                ));
                            }
                        }
                    }
                    "expression_statement" => {
                        class_variables.extend(assignment_targets(item, source));
                    }
                    _ => {}
                }
            }
        }

        ClassDef {
            name,
            line: line_of(node),
            end_line: end_line_of(node),
            bases,
            decorators,
            methods,
            class_variables,
        }
    }
}

// ---------------------------------------------------------------------------
// Body fact collection
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BodyFacts {
    calls: Vec<CallSite>,
    loops: Vec<LoopSummary>,
    local_bindings: Vec<LocalBinding>,
    nested_functions: Vec<String>,
    reads: BTreeSet<String>,
    writes: BTreeSet<String>,
    returns: ReturnSummary,
    has_try: bool,
    has_top_level_try: bool,
    handlers: Vec<ExceptionHandler>,
    declared_global: BTreeSet<String>,
    write_offsets: BTreeSet<usize>,
}

struct BodyCollector<'a> {
    source: &'a str,
    module_names: &'a BTreeSet<String>,
    params: BTreeSet<String>,
    mutating_methods: &'a [String],
}

impl<'a> BodyCollector<'a> {
    fn collect(&self, body: Node, facts: &mut BodyFacts) {
        // Global declarations first: they widen the tracked name set.
        visit(body, &mut |node| {
            if node.kind() == "global_statement" {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "identifier" {
                        facts.declared_global.insert(text(child, self.source).to_string());
                    }
                }
            }
        });

        visit(body, &mut |node| match node.kind() {
            "call" => {
                facts.calls.push(self.lower_call(node));
                self.classify_mutating_call(node, facts);
            }
            "for_statement" | "while_statement" => {
                let mut loop_calls = Vec::new();
                visit(node, &mut |inner| {
                    if inner.kind() == "call" {
                        loop_calls.push(self.lower_call(inner));
                    }
                });
                facts.loops.push(LoopSummary {
                    line: line_of(node),
                    calls: loop_calls,
                });
            }
            "function_definition" => {
                if let Some(name) = field_text(node, "name", self.source) {
                    facts.nested_functions.push(name.to_string());
                }
            }
            "return_statement" => {
                facts.returns.has_return = true;
                let value = node.named_child(0);
                if value.map(|v| v.kind() == "none").unwrap_or(true) {
                    facts.returns.has_bare_or_none_return = true;
                }
            }
            "try_statement" => {
                facts.has_try = true;
            }
            "except_clause" => {
                facts.handlers.push(self.lower_handler(node));
            }
            "assignment" | "augmented_assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.classify_write_target(left, facts);
                }
                if node.kind() == "assignment" {
                    if let Some(binding) = self.lower_binding(node) {
                        facts.local_bindings.push(binding);
                    }
                }
            }
            _ => {}
        });

        // Reads: identifiers matching tracked names that were not counted
        // as writes and do not shadow a parameter.
        visit(body, &mut |node| {
            if node.kind() != "identifier" {
                return;
            }
            let name = text(node, self.source);
            let tracked =
                self.module_names.contains(name) || facts.declared_global.contains(name);
            if !tracked || facts.write_offsets.contains(&node.start_byte()) {
                return;
            }
            if self.params.contains(name) && !facts.declared_global.contains(name) {
                return;
            }
            facts.reads.insert(name.to_string());
        });
    }

    fn lower_call(&self, node: Node) -> CallSite {
        let function = node.child_by_field_name("function");
        let callee = function
            .map(|f| render_name(f, self.source))
            .unwrap_or_default();
        let receiver = function.and_then(|f| {
            if f.kind() == "attribute" {
                f.child_by_field_name("object")
                    .map(|o| render_name(o, self.source))
                    .filter(|r| !r.is_empty())
            } else {
                None
            }
        });
        let awaited = node.parent().map(|p| p.kind() == "await").unwrap_or(false);

        let mut arguments = Vec::new();
        if let Some(args) = node.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                let expr = if arg.kind() == "keyword_argument" {
                    arg.child_by_field_name("value").unwrap_or(arg)
                } else {
                    arg
                };
                arguments.push(self.lower_argument(expr));
            }
        }

        CallSite {
            callee,
            receiver,
            awaited,
            line: line_of(node),
            arguments,
        }
    }

    fn lower_argument(&self, expr: Node) -> ArgumentInfo {
        let mut identifiers = Vec::new();
        let mut nested_calls = Vec::new();
        visit(expr, &mut |node| match node.kind() {
            "identifier" => identifiers.push(text(node, self.source).to_string()),
            "call" => {
                if let Some(f) = node.child_by_field_name("function") {
                    nested_calls.push(render_name(f, self.source));
                }
            }
            _ => {}
        });
        if expr.kind() == "identifier" {
            identifiers.push(text(expr, self.source).to_string());
        }
        if expr.kind() == "call" {
            if let Some(f) = expr.child_by_field_name("function") {
                nested_calls.push(render_name(f, self.source));
            }
        }
        identifiers.dedup();

        ArgumentInfo {
            expression: text(expr, self.source).to_string(),
            is_string_literal: matches!(expr.kind(), "string" | "concatenated_string"),
            identifiers,
            nested_calls,
        }
    }

    /// `x = y` and `x = f(...)` become reduced bindings for alias tracking.
    fn lower_binding(&self, assignment: Node) -> Option<LocalBinding> {
        let left = assignment.child_by_field_name("left")?;
        if left.kind() != "identifier" {
            return None;
        }
        let right = assignment.child_by_field_name("right")?;
        let name = text(left, self.source).to_string();
        let line = line_of(assignment);

        match right.kind() {
            "identifier" => Some(LocalBinding {
                name,
                source_identifier: Some(text(right, self.source).to_string()),
                via_call: None,
                call_arguments: Vec::new(),
                line,
            }),
            "call" | "await" => {
                let call = if right.kind() == "await" {
                    right.named_child(0).filter(|n| n.kind() == "call")?
                } else {
                    right
                };
                let callee = call
                    .child_by_field_name("function")
                    .map(|f| render_name(f, self.source))?;
                let mut call_arguments = Vec::new();
                if let Some(args) = call.child_by_field_name("arguments") {
                    visit(args, &mut |n| {
                        if n.kind() == "identifier" {
                            call_arguments.push(text(n, self.source).to_string());
                        }
                    });
                }
                Some(LocalBinding {
                    name,
                    source_identifier: None,
                    via_call: Some(callee),
                    call_arguments,
                    line,
                })
            }
            _ => None,
        }
    }

    fn lower_handler(&self, node: Node) -> ExceptionHandler {
        let mut caught_types = Vec::new();
        let mut saw_as = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "as" => saw_as = true,
                "block" => break,
                kind if child.is_named() => {
                    if saw_as {
                        // alias identifier, not a caught type
                        continue;
                    }
                    if kind == "tuple" {
                        let mut inner = child.walk();
                        for element in child.named_children(&mut inner) {
                            let name = render_name(element, self.source);
                            if !name.is_empty() {
                                caught_types.push(name);
                            }
                        }
                    } else {
                        let name = render_name(child, self.source);
                        if !name.is_empty() {
                            caught_types.push(name);
                        }
                    }
                }
                _ => {}
            }
        }

        let mut has_reraise = false;
        visit(node, &mut |inner| {
            if inner.kind() == "raise_statement" && inner.named_child_count() == 0 {
                has_reraise = true;
            }
        });

        ExceptionHandler {
            is_bare: caught_types.is_empty(),
            caught_types,
            has_reraise,
            line: line_of(node),
        }
    }

    /// Record writes to tracked module-level names from assignment targets:
    /// plain identifiers, tuple targets, index assignment, attribute roots.
    fn classify_write_target(&self, target: Node, facts: &mut BodyFacts) {
        match target.kind() {
            "identifier" => {
                let name = text(target, self.source).to_string();
                if self.is_tracked(&name, facts) {
                    facts.write_offsets.insert(target.start_byte());
                    facts.writes.insert(name);
                }
            }
            "pattern_list" | "tuple_pattern" | "tuple" => {
                let mut cursor = target.walk();
                for child in target.named_children(&mut cursor) {
                    self.classify_write_target(child, facts);
                }
            }
            "subscript" => {
                if let Some(value) = target.child_by_field_name("value") {
                    if let Some(root) = root_identifier(value, self.source) {
                        if self.is_tracked(&root.0, facts) {
                            facts.write_offsets.insert(root.1);
                            facts.writes.insert(root.0);
                        }
                    }
                }
            }
            "attribute" => {
                if let Some(object) = target.child_by_field_name("object") {
                    if let Some(root) = root_identifier(object, self.source) {
                        if self.is_tracked(&root.0, facts) {
                            facts.write_offsets.insert(root.1);
                            facts.writes.insert(root.0);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// `state.append(x)` counts as a write to `state` when the method is on
    /// the mutating allow-list.
    fn classify_mutating_call(&self, call: Node, facts: &mut BodyFacts) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        if function.kind() != "attribute" {
            return;
        }
        let Some(method) = function.child_by_field_name("attribute") else {
            return;
        };
        let method_name = text(method, self.source);
        if !self.mutating_methods.iter().any(|m| m == method_name) {
            return;
        }
        let Some(object) = function.child_by_field_name("object") else {
            return;
        };
        if let Some((name, offset)) = root_identifier(object, self.source) {
            if self.is_tracked(&name, facts) {
                facts.write_offsets.insert(offset);
                facts.writes.insert(name);
            }
        }
    }

    fn is_tracked(&self, name: &str, facts: &BodyFacts) -> bool {
        (self.module_names.contains(name) && !self.params.contains(name))
            || facts.declared_global.contains(name)
    }
}

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| text(n, source))
}

fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line_of(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

fn has_keyword_child(node: Node, keyword: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|c| c.kind() == keyword);
    result
}

fn direct_children_contain(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.named_children(&mut cursor).any(|c| c.kind() == kind);
    result
}

/// Depth-first walk calling `f` on every descendant (excluding `node` itself).
fn visit<F: FnMut(Node)>(node: Node, f: &mut F) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        f(child);
        visit(child, f);
    }
}

/// Render a dotted name from an expression: identifiers, attributes,
/// subscripts and calls reduce to the name as written.
fn render_name(node: Node, source: &str) -> String {
    match node.kind() {
        "identifier" => text(node, source).to_string(),
        "attribute" => {
            let object = node
                .child_by_field_name("object")
                .map(|o| render_name(o, source))
                .unwrap_or_default();
            let attribute = field_text(node, "attribute", source).unwrap_or_default();
            if object.is_empty() {
                attribute.to_string()
            } else {
                format!("{object}.{attribute}")
            }
        }
        "call" => node
            .child_by_field_name("function")
            .map(|f| render_name(f, source))
            .unwrap_or_default(),
        "subscript" => node
            .child_by_field_name("value")
            .map(|v| render_name(v, source))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// First identifier at the root of a (possibly dotted/subscripted)
/// expression, with its byte offset.
fn root_identifier(node: Node, source: &str) -> Option<(String, usize)> {
    match node.kind() {
        "identifier" => Some((text(node, source).to_string(), node.start_byte())),
        "attribute" => node
            .child_by_field_name("object")
            .and_then(|o| root_identifier(o, source)),
        "subscript" => node
            .child_by_field_name("value")
            .and_then(|v| root_identifier(v, source)),
        _ => None,
    }
}

fn decorator_names(decorated: Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = decorated.walk();
    for child in decorated.children(&mut cursor) {
        if child.kind() == "decorator" {
            let mut inner = child.walk();
            for expr in child.named_children(&mut inner) {
                let name = render_name(expr, source);
                if !name.is_empty() {
                    names.push(name);
                }
            }
        }
    }
    names
}

fn lower_parameters(params: Node, source: &str) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => out.push(Parameter {
                name: text(param, source).to_string(),
                annotation: None,
                default: None,
            }),
            "typed_parameter" => {
                let name = param
                    .named_child(0)
                    .filter(|n| n.kind() == "identifier")
                    .map(|n| text(n, source).to_string());
                if let Some(name) = name {
                    out.push(Parameter {
                        name,
                        annotation: field_text(param, "type", source).map(str::to_string),
                        default: None,
                    });
                }
            }
            "default_parameter" => {
                if let Some(name) = field_text(param, "name", source) {
                    out.push(Parameter {
                        name: name.to_string(),
                        annotation: None,
                        default: field_text(param, "value", source).map(str::to_string),
                    });
                }
            }
            "typed_default_parameter" => {
                if let Some(name) = field_text(param, "name", source) {
                    out.push(Parameter {
                        name: name.to_string(),
                        annotation: field_text(param, "type", source).map(str::to_string),
                        default: field_text(param, "value", source).map(str::to_string),
                    });
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let name = text(param, source).trim_start_matches('*').to_string();
                if !name.is_empty() {
                    out.push(Parameter {
                        name,
                        annotation: None,
                        default: None,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

fn lower_import(node: Node, source: &str) -> Vec<ImportStmt> {
    let mut imports = Vec::new();
    let line = line_of(node);

    if node.kind() == "import_statement" {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let module = text(child, source).to_string();
                    imports.push(ImportStmt {
                        names: vec![module.clone()],
                        module,
                        alias: None,
                        is_from_import: false,
                        line,
                    });
                }
                "aliased_import" => {
                    let module = field_text(child, "name", source).unwrap_or_default().to_string();
                    let alias = field_text(child, "alias", source).map(str::to_string);
                    imports.push(ImportStmt {
                        names: vec![module.clone()],
                        module,
                        alias,
                        is_from_import: false,
                        line,
                    });
                }
                _ => {}
            }
        }
        return imports;
    }

    // from-import: module_name field, then the imported bindings
    let module = node
        .child_by_field_name("module_name")
        .map(|m| text(m, source).to_string())
        .unwrap_or_default();
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if Some(child) == node.child_by_field_name("module_name") {
            continue;
        }
        match child.kind() {
            "dotted_name" => names.push(text(child, source).to_string()),
            "aliased_import" => {
                // The alias is the effective binding in the importer.
                let binding = field_text(child, "alias", source)
                    .or_else(|| field_text(child, "name", source))
                    .unwrap_or_default();
                names.push(binding.to_string());
            }
            "wildcard_import" => names.push("*".to_string()),
            _ => {}
        }
    }

    imports.push(ImportStmt {
        module,
        names,
        alias: None,
        is_from_import: true,
        line,
    });
    imports
}

fn lower_module_assignment(stmt: Node, source: &str) -> Vec<ModuleAssignment> {
    let Some(assignment) = stmt.named_child(0).filter(|n| n.kind() == "assignment") else {
        return Vec::new();
    };
    let Some(right) = assignment.child_by_field_name("right") else {
        return Vec::new();
    };
    let container = infer_container(right, source);
    let line = line_of(assignment);

    let mut out = Vec::new();
    if let Some(left) = assignment.child_by_field_name("left") {
        match left.kind() {
            "identifier" => out.push(ModuleAssignment {
                name: text(left, source).to_string(),
                line,
                container,
            }),
            "pattern_list" | "tuple_pattern" => {
                let mut cursor = left.walk();
                for target in left.named_children(&mut cursor) {
                    if target.kind() == "identifier" {
                        out.push(ModuleAssignment {
                            name: text(target, source).to_string(),
                            line,
                            container: ContainerKind::Unknown,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn infer_container(right: Node, source: &str) -> ContainerKind {
    match right.kind() {
        "list" | "list_comprehension" => ContainerKind::Sequence,
        "dictionary" | "dictionary_comprehension" => ContainerKind::Mapping,
        "set" | "set_comprehension" => ContainerKind::Set,
        "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none" => {
            ContainerKind::Scalar
        }
        "call" => {
            let name = right
                .child_by_field_name("function")
                .map(|f| render_name(f, source))
                .unwrap_or_default();
            if name.is_empty() {
                ContainerKind::Unknown
            } else {
                ContainerKind::Named(name)
            }
        }
        _ => ContainerKind::Unknown,
    }
}

fn first_error_line(root: Node) -> Option<u32> {
    let mut found = None;
    visit(root, &mut |node| {
        if found.is_none() && (node.is_error() || node.is_missing()) {
            found = Some(node.start_position().row as u32 + 1);
        }
    });
    found.or_else(|| {
        if root.is_error() {
            Some(root.start_position().row as u32 + 1)
        } else {
            None
        }
    })
}

/// Collect plain assignment target names from an expression statement.
fn assignment_targets(stmt: Node, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(assignment) = stmt.named_child(0).filter(|n| n.kind() == "assignment") {
        if let Some(left) = assignment.child_by_field_name("left") {
            match left.kind() {
                "identifier" => out.push(text(left, source).to_string()),
                "pattern_list" | "tuple_pattern" => {
                    let mut cursor = left.walk();
                    for target in left.named_children(&mut cursor) {
                        if target.kind() == "identifier" {
                            out.push(text(target, source).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(path: &str, source: &str) -> ModuleAst {
        let mut extractor = PythonExtractor::new(AnalysisConfig::default()).unwrap();
        extractor.extract(&SourceFile::new(path, source))
    }

    #[test]
    fn test_extracts_function_signature() {
        let module = extract(
            "svc.py",
            "def handle(request: str, retries: int = 3) -> dict:\n    return {}\n",
        );
        assert_eq!(module.functions.len(), 1);
        let func = &module.functions[0];
        assert_eq!(func.name, "handle");
        assert_eq!(func.line, 1);
        assert_eq!(func.parameters.len(), 2);
        assert_eq!(func.parameters[0].annotation.as_deref(), Some("str"));
        assert_eq!(func.parameters[1].default.as_deref(), Some("3"));
        assert_eq!(func.return_annotation.as_deref(), Some("dict"));
        assert!(!func.is_async);
        assert!(func.returns.has_return);
        assert!(!func.returns.has_bare_or_none_return);
    }

    #[test]
    fn test_async_and_awaited_calls() {
        let source = "async def fetch():\n    data = await load()\n    fire()\n";
        let module = extract("a.py", source);
        let func = &module.functions[0];
        assert!(func.is_async);
        let load = func.calls.iter().find(|c| c.callee == "load").unwrap();
        assert!(load.awaited);
        let fire = func.calls.iter().find(|c| c.callee == "fire").unwrap();
        assert!(!fire.awaited);
    }

    #[test]
    fn test_decorators_and_methods() {
        let source = "@app.get\ndef index():\n    pass\n\nclass Store:\n    def save(self, item):\n        pass\n";
        let module = extract("app.py", source);
        assert_eq!(module.functions[0].decorators, vec!["app.get".to_string()]);
        assert_eq!(module.classes.len(), 1);
        assert_eq!(module.classes[0].methods[0].qualified_name, "Store.save");
    }

    #[test]
    fn test_module_assignment_container_inference() {
        let source = "registry = {}\nitems = []\nseen = set()\nlimit = 10\nhandle = open('x')\n";
        let module = extract("state.py", source);
        let kind = |name: &str| {
            module
                .assignments
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.container.clone())
                .unwrap()
        };
        assert_eq!(kind("registry"), ContainerKind::Mapping);
        assert_eq!(kind("items"), ContainerKind::Sequence);
        assert_eq!(kind("seen"), ContainerKind::Named("set".to_string()));
        assert_eq!(kind("limit"), ContainerKind::Scalar);
        assert_eq!(kind("handle"), ContainerKind::Named("open".to_string()));
    }

    #[test]
    fn test_global_reads_and_writes() {
        let source = "state = {}\ncount = 0\n\ndef writer(k):\n    state[k] = 1\n\ndef mutator():\n    state.update({})\n\ndef reader():\n    return len(state)\n\ndef bumper():\n    global count\n    count += 1\n";
        let module = extract("globals.py", source);
        let func = |name: &str| module.functions.iter().find(|f| f.name == name).unwrap();
        assert!(func("writer").writes_globals.contains(&"state".to_string()));
        assert!(func("mutator").writes_globals.contains(&"state".to_string()));
        assert!(func("reader").reads_globals.contains(&"state".to_string()));
        assert!(func("bumper").writes_globals.contains(&"count".to_string()));
    }

    #[test]
    fn test_imports() {
        let source = "import os\nimport numpy as np\nfrom utils import helper, fmt as render\n";
        let module = extract("imp.py", source);
        assert_eq!(module.imports.len(), 3);
        assert_eq!(module.imports[0].module, "os");
        assert!(!module.imports[0].is_from_import);
        assert_eq!(module.imports[1].alias.as_deref(), Some("np"));
        let from_import = &module.imports[2];
        assert!(from_import.is_from_import);
        assert_eq!(from_import.module, "utils");
        assert_eq!(from_import.names, vec!["helper".to_string(), "render".to_string()]);
    }

    #[test]
    fn test_exception_summary() {
        let source = "def guarded():\n    try:\n        work()\n    except ValueError:\n        raise\n    except:\n        pass\n";
        let module = extract("exc.py", source);
        let func = &module.functions[0];
        assert!(func.exceptions.has_try);
        assert!(func.exceptions.has_top_level_try);
        assert_eq!(func.exceptions.handlers.len(), 2);
        assert_eq!(func.exceptions.handlers[0].caught_types, vec!["ValueError".to_string()]);
        assert!(func.exceptions.handlers[0].has_reraise);
        assert!(func.exceptions.handlers[1].is_bare);
        assert!(!func.exceptions.handlers[1].has_reraise);
    }

    #[test]
    fn test_loops_carry_call_sites() {
        let source = "def poll():\n    while True:\n        requests.get(url)\n        time.sleep(1)\n";
        let module = extract("loop.py", source);
        let func = &module.functions[0];
        assert_eq!(func.loops.len(), 1);
        let names: Vec<&str> = func.loops[0].calls.iter().map(|c| c.callee.as_str()).collect();
        assert!(names.contains(&"requests.get"));
        assert!(names.contains(&"time.sleep"));
    }

    #[test]
    fn test_parse_error_yields_empty_module() {
        let module = extract("broken.py", "def broken(:\n");
        assert!(module.parse_error);
        assert!(module.functions.is_empty());
        assert!(module.parse_error_detail.is_some());
    }

    #[test]
    fn test_unsupported_language() {
        let module = extract("web.ts", "const x = 1;\n");
        assert_eq!(module.language, SourceLanguage::TypeScript);
        assert!(!module.parse_error);
        assert!(module.functions.is_empty());
    }

    #[test]
    fn test_call_arguments() {
        let source = "def run(cmd):\n    eval(cmd)\n    eval('1 + 1')\n";
        let module = extract("args.py", source);
        let func = &module.functions[0];
        let calls: Vec<&CallSite> = func.calls.iter().filter(|c| c.callee == "eval").collect();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].arguments[0].is_string_literal);
        assert!(calls[0].arguments[0].identifiers.contains(&"cmd".to_string()));
        assert!(calls[1].arguments[0].is_string_literal);
    }

    #[test]
    fn test_nested_functions_recorded() {
        let source = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let module = extract("nest.py", source);
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].nested_functions, vec!["inner".to_string()]);
    }
}
