//! Parses a component source into an AST once and extracts everything later
//! phases need, per §4.1. Nothing downstream re-parses; the transformer
//! borrows the same arena-allocated tree this module parses.

use crate::error::{codes, CompileError, Severity};
use crate::ir::{
    ComponentMetadata, EffectDecl, ImportDecl, ImportSpecifier, MemoDecl, ParamInfo, SignalDecl,
    SourceLocation,
};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, Expression, FunctionBody, ModuleDeclaration, Program,
    Statement, TSTypeAnnotation,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

/// The component's markup-return subtree, kept as raw source text (the
/// transformer re-parses just this slice as a JSX expression, which keeps
/// the transformer independent of the analyzer's arena lifetime and mirrors
/// the teacher's own pattern of slicing spans out of the original source
/// rather than threading arena references across module boundaries).
#[derive(Debug, Clone)]
pub struct MarkupSource {
    pub raw: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct AnalyzerContext {
    pub file_path: String,
    pub metadata: ComponentMetadata,
    pub markup: Option<MarkupSource>,
    pub errors: Vec<CompileError>,
}

pub struct Analyzer;

impl Analyzer {
    /// Parses `source` and extracts the [`AnalyzerContext`]. Parse errors are
    /// reported as a single `BF-PARSE-001` diagnostic and `markup` is left
    /// `None`, which tells the caller to skip IR construction (§4.1 failure
    /// semantics: "later phases skip IR construction when the markup-return
    /// subtree is missing").
    pub fn analyze(source: &str, file_path: &str) -> AnalyzerContext {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_typescript(true)
            .with_jsx(true)
            .with_module(true);
        let parsed = Parser::new(&allocator, source, source_type).parse();

        let mut errors = Vec::new();
        if !parsed.errors.is_empty() {
            for e in &parsed.errors {
                errors.push(CompileError::new(
                    codes::PARSE_ERROR,
                    Severity::Error,
                    e.to_string(),
                    file_path,
                    SourceLocation { line: 1, column: 0 },
                ));
            }
            return AnalyzerContext {
                file_path: file_path.to_string(),
                metadata: empty_metadata(),
                markup: None,
                errors,
            };
        }

        let program = &parsed.program;
        let is_client_reactive = has_use_client_directive(program);

        let mut collector = TopLevelCollector {
            source,
            signals: Vec::new(),
            memos_raw: Vec::new(),
            effects: Vec::new(),
            on_mounts: Vec::new(),
            imports: Vec::new(),
            local_functions: Vec::new(),
            local_constants: Vec::new(),
            component_name: None,
            props_params: Vec::new(),
            props_binding_name: None,
            rest_props_binding: None,
            markup: None,
            errors: Vec::new(),
        };
        collector.collect(program, file_path);

        let known_reactive_names: Vec<String> = collector
            .signals
            .iter()
            .map(|s| s.getter.clone())
            .chain(collector.memos_raw.iter().map(|(name, _, _)| name.clone()))
            .collect();

        let memos = collector
            .memos_raw
            .into_iter()
            .map(|(name, computation, ty)| {
                let dependencies = called_names_in(&computation, &known_reactive_names);
                MemoDecl {
                    name,
                    computation,
                    dependencies,
                    inferred_type: ty,
                }
            })
            .collect();

        let effects = collector
            .effects
            .into_iter()
            .map(|body| {
                let dependencies = called_names_in(&body, &known_reactive_names);
                EffectDecl { body, dependencies }
            })
            .collect();

        errors.extend(collector.errors);

        if collector.markup.is_none() {
            errors.push(CompileError::new(
                codes::MISSING_MARKUP_RETURN,
                Severity::Error,
                "no exported component returning markup was found",
                file_path,
                SourceLocation { line: 1, column: 0 },
            ));
        }

        AnalyzerContext {
            file_path: file_path.to_string(),
            metadata: ComponentMetadata {
                name: collector
                    .component_name
                    .unwrap_or_else(|| "Anonymous".to_string()),
                is_client_reactive,
                props_params: collector.props_params,
                props_binding_name: collector.props_binding_name,
                rest_props_binding: collector.rest_props_binding,
                signals: collector.signals,
                memos,
                effects,
                on_mounts: collector.on_mounts,
                imports: collector.imports,
                local_functions: collector.local_functions,
                local_constants: collector.local_constants,
            },
            markup: collector.markup,
            errors,
        }
    }
}

fn empty_metadata() -> ComponentMetadata {
    ComponentMetadata {
        name: "Anonymous".to_string(),
        is_client_reactive: false,
        props_params: Vec::new(),
        props_binding_name: None,
        rest_props_binding: None,
        signals: Vec::new(),
        memos: Vec::new(),
        effects: Vec::new(),
        on_mounts: Vec::new(),
        imports: Vec::new(),
        local_functions: Vec::new(),
        local_constants: Vec::new(),
    }
}

/// `"use client"` must be the first non-comment statement, case-sensitive,
/// trimmed of leading whitespace only (§4.1). oxc parses a leading bare
/// string-literal expression statement into `Program::directives` rather
/// than `Program::body`, so that is where we look first; a plain
/// expression-statement fallback covers parsers that don't special-case it.
fn has_use_client_directive(program: &Program) -> bool {
    if let Some(first) = program.directives.first() {
        let text = first.directive.as_str();
        return text == "use client";
    }
    if let Some(Statement::ExpressionStatement(expr_stmt)) = program.body.first() {
        if let Expression::StringLiteral(s) = &expr_stmt.expression {
            return s.value.as_str() == "use client";
        }
    }
    false
}

fn location_of(span: Span, source: &str) -> SourceLocation {
    let mut line = 1u32;
    let mut col = 0u32;
    for (i, ch) in source.char_indices() {
        if i as u32 >= span.start {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    SourceLocation { line, column: col }
}

fn span_text<'a>(span: Span, source: &'a str) -> &'a str {
    let start = span.start as usize;
    let end = (span.end as usize).min(source.len());
    source.get(start..end).unwrap_or("")
}

fn type_annotation_text(ann: &Option<Box<TSTypeAnnotation>>, source: &str) -> Option<String> {
    ann.as_ref()
        .map(|a| span_text(a.type_annotation.span(), source).to_string())
}

struct TopLevelCollector<'s> {
    source: &'s str,
    signals: Vec<SignalDecl>,
    /// (name, computation text, inferred type) deferred so dependency
    /// analysis can see every signal/memo name first.
    memos_raw: Vec<(String, String, Option<String>)>,
    effects: Vec<String>,
    on_mounts: Vec<String>,
    imports: Vec<ImportDecl>,
    local_functions: Vec<String>,
    local_constants: Vec<String>,
    component_name: Option<String>,
    props_params: Vec<ParamInfo>,
    props_binding_name: Option<String>,
    rest_props_binding: Option<String>,
    markup: Option<MarkupSource>,
    errors: Vec<CompileError>,
}

impl<'s> TopLevelCollector<'s> {
    fn collect<'a>(&mut self, program: &Program<'a>, file_path: &str) {
        for stmt in &program.body {
            match stmt {
                Statement::ModuleDeclaration(module_decl) => {
                    self.visit_module_decl(module_decl, file_path);
                }
                Statement::Declaration(Declaration::VariableDeclaration(decl)) => {
                    self.visit_variable_declaration(decl, file_path);
                }
                Statement::Declaration(Declaration::FunctionDeclaration(func)) => {
                    if let Some(id) = &func.id {
                        self.local_functions.push(id.name.to_string());
                    }
                }
                Statement::ExpressionStatement(expr_stmt) => {
                    self.visit_top_level_call(&expr_stmt.expression);
                }
                _ => {}
            }
        }
    }

    fn visit_module_decl<'a>(&mut self, module_decl: &ModuleDeclaration<'a>, file_path: &str) {
        match module_decl {
            ModuleDeclaration::ImportDeclaration(import) => {
                let specifiers = import
                    .specifiers
                    .as_ref()
                    .map(|specs| {
                        specs
                            .iter()
                            .map(|spec| match spec {
                                oxc_ast::ast::ImportDeclarationSpecifier::ImportSpecifier(s) => {
                                    ImportSpecifier {
                                        name: s.imported.name().to_string(),
                                        alias: Some(s.local.name.to_string())
                                            .filter(|a| *a != s.imported.name()),
                                        is_default: false,
                                        is_namespace: false,
                                    }
                                }
                                oxc_ast::ast::ImportDeclarationSpecifier::ImportDefaultSpecifier(
                                    s,
                                ) => ImportSpecifier {
                                    name: s.local.name.to_string(),
                                    alias: None,
                                    is_default: true,
                                    is_namespace: false,
                                },
                                oxc_ast::ast::ImportDeclarationSpecifier::ImportNamespaceSpecifier(
                                    s,
                                ) => ImportSpecifier {
                                    name: s.local.name.to_string(),
                                    alias: None,
                                    is_default: false,
                                    is_namespace: true,
                                },
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                self.imports.push(ImportDecl {
                    source: import.source.value.to_string(),
                    specifiers,
                    type_only: import.import_kind.is_type(),
                });
            }
            ModuleDeclaration::ExportDefaultDeclaration(export) => {
                self.visit_export_default(export, file_path);
            }
            ModuleDeclaration::ExportNamedDeclaration(export) => {
                if let Some(decl) = &export.declaration {
                    if let Declaration::FunctionDeclaration(func) = decl {
                        if let Some(id) = &func.id {
                            self.component_name = Some(id.name.to_string());
                        }
                        self.extract_component_function(
                            func.params.items.first().map(|p| &p.pattern),
                            &func.body,
                            file_path,
                        );
                    } else if let Declaration::VariableDeclaration(decl) = decl {
                        self.visit_variable_declaration(decl, file_path);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_export_default<'a>(
        &mut self,
        export: &oxc_ast::ast::ExportDefaultDeclaration<'a>,
        file_path: &str,
    ) {
        use oxc_ast::ast::ExportDefaultDeclarationKind as K;
        match &export.declaration {
            K::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    self.component_name = Some(id.name.to_string());
                }
                self.extract_component_function(
                    func.params.items.first().map(|p| &p.pattern),
                    &func.body,
                    file_path,
                );
            }
            K::ArrowFunctionExpression(arrow) => {
                self.extract_component_arrow(arrow, file_path);
            }
            _ => {}
        }
    }

    fn visit_variable_declaration<'a>(
        &mut self,
        decl: &oxc_ast::ast::VariableDeclaration<'a>,
        file_path: &str,
    ) {
        for decl in &decl.declarations {
            let Some(init) = &decl.init else {
                if let BindingPatternKind::BindingIdentifier(id) = &decl.id.kind {
                    self.local_constants.push(id.name.to_string());
                }
                continue;
            };

            if let Some((getter, setter)) = array_pattern_pair(&decl.id.kind) {
                if let Some(initial) = call_with_name(init, "createSignal") {
                    self.signals.push(SignalDecl {
                        getter,
                        setter,
                        initial_value: initial
                            .args
                            .first()
                            .map(|a| span_text(a.span(), self.source).to_string())
                            .unwrap_or_else(|| "undefined".to_string()),
                        inferred_type: None,
                    });
                    continue;
                }
            }

            if let BindingPatternKind::BindingIdentifier(id) = &decl.id.kind {
                if let Some(call) = call_with_name(init, "createMemo") {
                    let computation = call
                        .args
                        .first()
                        .map(|a| span_text(a.span(), self.source).to_string())
                        .unwrap_or_default();
                    self.memos_raw.push((
                        id.name.to_string(),
                        computation,
                        type_annotation_text(&decl.id.type_annotation, self.source),
                    ));
                    continue;
                }

                // An arrow/function assigned to a const is the component
                // itself if it was the default export target re-declared,
                // otherwise a local helper.
                match init {
                    Expression::ArrowFunctionExpression(arrow)
                        if self.component_name.as_deref() == Some(id.name.as_str()) =>
                    {
                        self.extract_component_arrow(arrow, file_path);
                    }
                    Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_) => {
                        self.local_functions.push(id.name.to_string());
                    }
                    _ => {
                        self.local_constants.push(id.name.to_string());
                    }
                }
            }
        }
    }

    fn visit_top_level_call<'a>(&mut self, expr: &Expression<'a>) {
        if let Some(call) = call_with_name(expr, "createEffect") {
            if let Some(body) = call.args.first() {
                self.effects
                    .push(span_text(body.span(), self.source).to_string());
            }
        } else if let Some(call) = call_with_name(expr, "onMount") {
            if let Some(body) = call.args.first() {
                self.on_mounts
                    .push(span_text(body.span(), self.source).to_string());
            }
        }
    }

    fn extract_component_arrow<'a>(
        &mut self,
        arrow: &oxc_ast::ast::ArrowFunctionExpression<'a>,
        file_path: &str,
    ) {
        let first_param = arrow.params.items.first().map(|p| &p.pattern);
        self.extract_props(first_param);
        if arrow.expression {
            if let Some(Statement::ExpressionStatement(expr_stmt)) = arrow.body.statements.first()
            {
                self.set_markup_from_expr(&expr_stmt.expression, file_path);
            }
        } else {
            self.find_return_markup(&arrow.body, file_path);
        }
    }

    fn extract_component_function<'a>(
        &mut self,
        first_param: Option<&oxc_ast::ast::BindingPattern<'a>>,
        body: &Option<oxc_allocator::Box<'a, FunctionBody<'a>>>,
        file_path: &str,
    ) {
        self.extract_props(first_param);
        if let Some(body) = body {
            self.find_return_markup(body, file_path);
        }
    }

    fn extract_props<'a>(&mut self, first_param: Option<&oxc_ast::ast::BindingPattern<'a>>) {
        let Some(pattern) = first_param else {
            return;
        };
        match &pattern.kind {
            BindingPatternKind::BindingIdentifier(id) => {
                self.props_binding_name = Some(id.name.to_string());
            }
            BindingPatternKind::ObjectPattern(obj) => {
                for prop in &obj.properties {
                    if let BindingPatternKind::BindingIdentifier(id) = &prop.value.kind {
                        self.props_params.push(ParamInfo {
                            name: id.name.to_string(),
                            type_annotation: type_annotation_text(
                                &prop.value.type_annotation,
                                self.source,
                            ),
                            optional: prop.value.optional,
                            default_value: None,
                        });
                    } else if let BindingPatternKind::AssignmentPattern(assign) = &prop.value.kind
                    {
                        if let BindingPatternKind::BindingIdentifier(id) = &assign.left.kind {
                            self.props_params.push(ParamInfo {
                                name: id.name.to_string(),
                                type_annotation: type_annotation_text(
                                    &assign.left.type_annotation,
                                    self.source,
                                ),
                                optional: true,
                                default_value: Some(
                                    span_text(assign.right.span(), self.source).to_string(),
                                ),
                            });
                        }
                    }
                }
                if let Some(rest) = &obj.rest {
                    if let BindingPatternKind::BindingIdentifier(id) = &rest.argument.kind {
                        self.rest_props_binding = Some(id.name.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fn find_return_markup<'a>(&mut self, body: &FunctionBody<'a>, file_path: &str) {
        for stmt in &body.statements {
            if let Statement::ReturnStatement(ret) = stmt {
                if let Some(expr) = &ret.argument {
                    self.set_markup_from_expr(expr, file_path);
                }
                return;
            }
        }
    }

    fn set_markup_from_expr<'a>(&mut self, expr: &Expression<'a>, file_path: &str) {
        let is_markup = matches!(
            expr,
            Expression::JSXElement(_) | Expression::JSXFragment(_)
        );
        if !is_markup {
            return;
        }
        let span = expr.span();
        self.markup = Some(MarkupSource {
            raw: span_text(span, self.source).to_string(),
            location: location_of(span, self.source),
        });
        let _ = file_path;
    }
}

fn array_pattern_pair(kind: &BindingPatternKind) -> Option<(String, String)> {
    let BindingPatternKind::ArrayPattern(arr) = kind else {
        return None;
    };
    if arr.elements.len() < 2 {
        return None;
    }
    let getter = arr.elements.first()?.as_ref()?;
    let setter = arr.elements.get(1)?.as_ref()?;
    let BindingPatternKind::BindingIdentifier(getter_id) = &getter.kind else {
        return None;
    };
    let BindingPatternKind::BindingIdentifier(setter_id) = &setter.kind else {
        return None;
    };
    Some((getter_id.name.to_string(), setter_id.name.to_string()))
}

fn call_with_name<'a, 'b>(
    expr: &'b Expression<'a>,
    name: &str,
) -> Option<&'b oxc_ast::ast::CallExpression<'a>> {
    let Expression::CallExpression(call) = expr else {
        return None;
    };
    let Expression::Identifier(ident) = &call.callee else {
        return None;
    };
    (ident.name.as_str() == name).then_some(call)
}

/// Names (signal getters / memo names) syntactically referenced as calls
/// inside `text`. Intentionally coarse per §9: a regex-driven, conservative
/// over-approximation rather than a scope-resolved reference count.
fn called_names_in(text: &str, candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|name| {
            let pattern = format!(r"\b{}\s*\(", regex::escape(name));
            regex::Regex::new(&pattern)
                .map(|re| re.is_match(text))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_signal_and_markup() {
        let src = r#"
            export default function Counter() {
              const [count, setCount] = createSignal(0);
              return <div>{count()}</div>;
            }
        "#;
        let ctx = Analyzer::analyze(src, "counter.tsx");
        assert_eq!(ctx.metadata.name, "Counter");
        assert_eq!(ctx.metadata.signals.len(), 1);
        assert_eq!(ctx.metadata.signals[0].getter, "count");
        assert_eq!(ctx.metadata.signals[0].setter, "setCount");
        assert_eq!(ctx.metadata.signals[0].initial_value, "0");
        assert!(ctx.markup.is_some());
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn use_client_directive_sets_the_client_reactive_flag() {
        let src = r#""use client";
            export default function Widget() {
              return <div>hi</div>;
            }
        "#;
        let ctx = Analyzer::analyze(src, "widget.tsx");
        assert!(ctx.metadata.is_client_reactive);
    }

    #[test]
    fn missing_markup_return_is_reported() {
        let ctx = Analyzer::analyze("export const x = 1;", "nothing.tsx");
        assert!(ctx.markup.is_none());
        assert!(ctx.errors.iter().any(|e| e.code == codes::MISSING_MARKUP_RETURN));
    }

    #[test]
    fn memo_dependencies_detect_signal_calls() {
        let src = r#"
            export default function Doubled() {
              const [count, setCount] = createSignal(1);
              const doubled = createMemo(() => count() * 2);
              return <div>{doubled()}</div>;
            }
        "#;
        let ctx = Analyzer::analyze(src, "doubled.tsx");
        assert_eq!(ctx.metadata.memos.len(), 1);
        assert_eq!(ctx.metadata.memos[0].name, "doubled");
        assert_eq!(ctx.metadata.memos[0].dependencies, vec!["count".to_string()]);
    }

    #[test]
    fn destructured_props_are_collected_with_defaults() {
        let src = r#"
            export default function Greeting({ name, loud = false }) {
              return <div>{name}</div>;
            }
        "#;
        let ctx = Analyzer::analyze(src, "greeting.tsx");
        let names: Vec<_> = ctx.metadata.props_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "loud"]);
        assert_eq!(ctx.metadata.props_params[1].default_value.as_deref(), Some("false"));
        assert!(ctx.metadata.props_params[1].optional);
    }

    #[test]
    fn parse_error_is_reported_and_markup_is_skipped() {
        let ctx = Analyzer::analyze("export default function ( {", "broken.tsx");
        assert!(ctx.markup.is_none());
        assert!(ctx.errors.iter().any(|e| e.code == codes::PARSE_ERROR));
    }
}
