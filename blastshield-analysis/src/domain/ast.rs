//! Language-neutral module model produced by the AST extractor
//!
//! One `ModuleAst` per input file. Line ranges are 1-based inclusive.
//! The model carries every fact the rules consume, so no rule ever has to
//! re-read source text.

use serde::{Deserialize, Serialize};

/// A single `(path, content)` pair submitted for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Source language of a module, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Unknown,
}

impl SourceLanguage {
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or("");
        match ext {
            "py" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "go" => Self::Go,
            _ => Self::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Python)
    }
}

impl std::fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::JavaScript => write!(f, "javascript"),
            Self::TypeScript => write!(f, "typescript"),
            Self::Go => write!(f, "go"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Inferred shape of a module-level assignment's right-hand side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Sequence,
    Mapping,
    Set,
    Scalar,
    /// Constructor call, e.g. `defaultdict(list)`
    Named(String),
    #[default]
    Unknown,
}

impl ContainerKind {
    /// Mutable containers are the ones shared-state rules care about.
    pub fn is_mutable_container(&self) -> bool {
        match self {
            Self::Sequence | Self::Mapping | Self::Set => true,
            Self::Named(name) => {
                matches!(name.as_str(), "list" | "dict" | "set" | "defaultdict" | "deque" | "Counter" | "OrderedDict")
            }
            _ => false,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
            Self::Set => "set",
            Self::Scalar => "scalar",
            Self::Named(name) => name,
            Self::Unknown => "unknown",
        }
    }
}

/// A function or method parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
}

/// One argument at a call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentInfo {
    /// Source text of the argument expression
    pub expression: String,
    /// True if the argument is a plain string literal
    pub is_string_literal: bool,
    /// Identifier names referenced anywhere inside the expression
    pub identifiers: Vec<String>,
    /// Callee names of calls nested inside the expression
    pub nested_calls: Vec<String>,
}

impl ArgumentInfo {
    /// True when the expression is a literal of any kind (no identifiers,
    /// no nested calls).
    pub fn is_constant(&self) -> bool {
        self.identifiers.is_empty() && self.nested_calls.is_empty()
    }
}

/// A call site inside a function body. The callee name is recorded as
/// written; resolution happens in the call-graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    /// Dotted receiver for attribute calls (`obj` in `obj.method()`)
    pub receiver: Option<String>,
    pub awaited: bool,
    pub line: u32,
    pub arguments: Vec<ArgumentInfo>,
}

/// A function-local assignment, kept in a reduced form for alias tracking:
/// `x = param` is a direct alias, `x = f(param)` records the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBinding {
    pub name: String,
    /// RHS identifier for `x = y`
    pub source_identifier: Option<String>,
    /// Callee name for `x = f(...)`
    pub via_call: Option<String>,
    /// Identifiers appearing in the RHS call arguments
    pub call_arguments: Vec<String>,
    pub line: u32,
}

/// A `for`/`while` loop and the call sites inside its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSummary {
    pub line: u32,
    pub calls: Vec<CallSite>,
}

/// Summary of a function's return statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnSummary {
    pub has_return: bool,
    /// Any `return` without a value, or `return None`
    pub has_bare_or_none_return: bool,
}

/// One `except` handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub caught_types: Vec<String>,
    pub is_bare: bool,
    pub has_reraise: bool,
    pub line: u32,
}

/// Exception-flow summary for a function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExceptionSummary {
    pub has_try: bool,
    /// True if a `try` statement is a direct child of the function body
    pub has_top_level_try: bool,
    pub handlers: Vec<ExceptionHandler>,
}

/// An extracted function or method definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    /// `Class.method` for methods, otherwise the bare name
    pub qualified_name: String,
    pub line: u32,
    pub end_line: u32,
    pub is_async: bool,
    pub decorators: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub return_annotation: Option<String>,
    /// Names of functions defined inside this one
    pub nested_functions: Vec<String>,
    pub calls: Vec<CallSite>,
    pub loops: Vec<LoopSummary>,
    /// Reduced local assignments for alias tracking
    pub local_bindings: Vec<LocalBinding>,
    /// Module-level names read inside the body
    pub reads_globals: Vec<String>,
    /// Module-level names written inside the body (assignment, index
    /// assignment, mutating method receiver)
    pub writes_globals: Vec<String>,
    pub returns: ReturnSummary,
    pub exceptions: ExceptionSummary,
}

impl FunctionDef {
    /// Names of parameters, excluding the method receiver.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .map(|p| p.name.as_str())
            .filter(|n| *n != "self" && *n != "cls")
            .collect()
    }
}

/// An extracted class definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub line: u32,
    pub end_line: u32,
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub methods: Vec<FunctionDef>,
    pub class_variables: Vec<String>,
}

/// An import statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStmt {
    /// Target module as written
    pub module: String,
    /// Imported names (the module itself for plain imports)
    pub names: Vec<String>,
    pub alias: Option<String>,
    pub is_from_import: bool,
    pub line: u32,
}

/// A module-level assignment with inferred container kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAssignment {
    pub name: String,
    pub line: u32,
    pub container: ContainerKind,
}

/// The language-neutral module model for one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAst {
    /// Module id, derived from the file path
    pub module_id: String,
    pub language: SourceLanguage,
    pub functions: Vec<FunctionDef>,
    pub classes: Vec<ClassDef>,
    pub imports: Vec<ImportStmt>,
    pub assignments: Vec<ModuleAssignment>,
    pub module_level_names: Vec<String>,
    pub total_lines: usize,
    pub parse_error: bool,
    pub parse_error_detail: Option<String>,
}

impl ModuleAst {
    /// Empty shell for unparseable or unsupported files.
    pub fn empty(module_id: impl Into<String>, language: SourceLanguage, total_lines: usize) -> Self {
        Self {
            module_id: module_id.into(),
            language,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            assignments: Vec::new(),
            module_level_names: Vec::new(),
            total_lines,
            parse_error: false,
            parse_error_detail: None,
        }
    }

    /// All functions, including methods, in definition order.
    pub fn all_functions(&self) -> Vec<&FunctionDef> {
        let mut out: Vec<&FunctionDef> = self.functions.iter().collect();
        for class in &self.classes {
            out.extend(class.methods.iter());
        }
        out
    }

    /// Module-level mutable containers: name -> (line, kind).
    pub fn mutable_containers(&self) -> Vec<&ModuleAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.container.is_mutable_container())
            .collect()
    }
}
