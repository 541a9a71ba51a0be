//! The Client-Script Generator (§4.5).
//!
//! Walks the same `ComponentIr` the adapter rendered and emits a single
//! `init<ComponentName>(instanceIndex, parentScope, props)` function that
//! wires reactive effects, event listeners, refs, and child-component
//! bootstraps onto the server-rendered DOM. No teacher counterpart exists
//! (the teacher's runtime model — `zenRoute()`, `TdzValidator` — doesn't
//! carry over); built directly from §4.5's numbered algorithm, in the
//! string-building style `codegen.rs` uses for its own JS emission.

use crate::error::CompileError;
use crate::ir::{
    Attribute, AttributeValue, ChainStep, ComponentIr, ComponentNode, ConditionalNode, ElementNode,
    Event, ExpressionNode, IrNode, LoopNode, BOOLEAN_PROPERTY_ATTRS, CAPTURE_ONLY_EVENTS,
};

/// Emits the client script, or the empty string when the component is
/// purely static (§4.5 "Omission"). Dialect-independent: the hydration
/// script always speaks plain JS in the browser, regardless of which
/// server adapter rendered the SSR template.
pub fn generate_client_js(ir: &ComponentIr) -> (String, Vec<CompileError>) {
    let inventory = Inventory::collect(&ir.root);
    if ir.metadata.is_static() && inventory.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut errors = Vec::new();
    let mut w = String::new();

    w.push_str(&format!(
        "export function init{name}(instanceIndex, parentScope, props) {{\n",
        name = ir.metadata.name
    ));
    w.push_str(&format!(
        "  const scope = findScope(\"{name}\", instanceIndex, parentScope);\n  if (!scope) return;\n",
        name = ir.metadata.name
    ));

    for signal in &ir.metadata.signals {
        let init = if signal.initial_value == "undefined" {
            default_for_type(signal.inferred_type.as_deref())
        } else {
            signal.initial_value.as_str()
        };
        w.push_str(&format!(
            "  const [{getter}, {setter}] = createSignal({init});\n",
            getter = signal.getter,
            setter = signal.setter,
            init = init
        ));
    }
    for memo in &ir.metadata.memos {
        w.push_str(&format!(
            "  const {name} = createMemo({computation});\n",
            name = memo.name,
            computation = memo.computation
        ));
    }
    for effect in &ir.metadata.effects {
        w.push_str(&format!("  createEffect({body});\n", body = effect.body));
    }

    for slot in &inventory.queried_slots {
        w.push_str(&format!(
            "  const _{id} = scope.querySelector('[slot-marker=\"{id}\"]');\n",
            id = slot
        ));
    }

    for expr in &inventory.texts {
        let id = expr.slot_id.as_deref().unwrap_or_default();
        w.push_str(&format!(
            "  createEffect(() => {{ _{id}.textContent = String({raw}); }});\n",
            id = id,
            raw = expr.raw
        ));
    }

    for (el, attr) in &inventory.dynamic_attrs {
        let id = el.slot_id.as_deref().unwrap_or_default();
        w.push_str(&render_attribute_effect(id, attr));
    }

    for cond in &inventory.conditionals {
        let id = cond.slot_id.as_deref().unwrap_or_default();
        let when_true = serialize_branch(&cond.when_true, &mut errors);
        let when_false = serialize_branch(&cond.when_false, &mut errors);
        w.push_str(&format!(
            "  cond(scope, \"{id}\", () => ({cond_expr}), [() => `{t}`, () => `{f}`]);\n",
            id = id,
            cond_expr = cond.condition,
            t = when_true,
            f = when_false
        ));
    }

    for loop_node in &inventory.loops {
        w.push_str(&render_loop_effect(loop_node, &mut errors));
    }

    for (el, event) in &inventory.events {
        let id = el.slot_id.as_deref().unwrap_or_default();
        if CAPTURE_ONLY_EVENTS.contains(&event.name.as_str()) {
            w.push_str(&format!(
                "  _{id}.addEventListener(\"{name}\", {handler}, true);\n",
                id = id,
                name = event.name,
                handler = event.handler
            ));
        } else {
            w.push_str(&format!(
                "  _{id}.on{name} = {handler};\n",
                id = id,
                name = event.name,
                handler = event.handler
            ));
        }
    }

    for (el, ref_expr) in &inventory.refs {
        let id = el.slot_id.as_deref().unwrap_or_default();
        w.push_str(&format!("  ({ref_expr})(_{id});\n", ref_expr = ref_expr, id = id));
    }

    for comp in &inventory.children {
        w.push_str(&format!(
            "  init{name}(instanceIndex, scope, {{ {props} }});\n",
            name = comp.name,
            props = render_child_props(&comp.props)
        ));
    }

    w.push_str("}\n");
    (w, errors)
}

fn render_child_props(props: &[crate::ir::Prop]) -> String {
    props
        .iter()
        .map(|p| match &p.value {
            crate::ir::PropValue::Static(v) => format!("{}: \"{}\"", p.name, v),
            crate::ir::PropValue::Dynamic(v) => format!("{}: ({})", p.name, v),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// §4.5 step 6: dynamic-attribute write, with the class/style/boolean/value
/// special cases called out by name.
fn render_attribute_effect(slot_id: &str, attr: &Attribute) -> String {
    let AttributeValue::Dynamic(expr) = &attr.value else {
        return String::new();
    };
    let target = format!("_{}", slot_id);
    match attr.name.as_str() {
        "class" => format!(
            "  createEffect(() => {{ {target}.setAttribute('class', String({expr})); }});\n",
            target = target,
            expr = expr
        ),
        "style" => {
            if expr.trim_start().starts_with('{') {
                format!(
                    "  createEffect(() => {{ Object.assign({target}.style, ({expr})); }});\n",
                    target = target,
                    expr = expr
                )
            } else {
                format!(
                    "  createEffect(() => {{ {target}.style.cssText = String({expr}); }});\n",
                    target = target,
                    expr = expr
                )
            }
        }
        name if BOOLEAN_PROPERTY_ATTRS.contains(&name) => format!(
            "  createEffect(() => {{ {target}.{name} = Boolean({expr}); }});\n",
            target = target,
            name = name,
            expr = expr
        ),
        "value" => format!(
            "  createEffect(() => {{ const v = ({expr}); if (v !== undefined) {target}.value = v; }});\n",
            target = target,
            expr = expr
        ),
        name => format!(
            "  createEffect(() => {{ const v = ({expr}); if (v !== undefined) {target}.setAttribute(\"{name}\", v); }});\n",
            target = target,
            name = name,
            expr = expr
        ),
    }
}

/// §4.5 step 8: a loop effect, applying the `filter`/`sort` chain (in
/// source order) before handing the array to `reconcileList`.
fn render_loop_effect(loop_node: &LoopNode, errors: &mut Vec<CompileError>) -> String {
    let mut array_expr = loop_node.array_expr.clone();
    for step in &loop_node.chain {
        array_expr = match step {
            ChainStep::Filter => match &loop_node.filter_predicate {
                Some(pred) => format!(
                    "({array}).filter(({item}) => {body})",
                    array = array_expr,
                    item = loop_node.item_var,
                    body = predicate_js(pred)
                ),
                None => array_expr,
            },
            ChainStep::Sort => match &loop_node.sort_comparator {
                Some(cmp) => format!("({array}).slice().sort({cmp})", array = array_expr, cmp = cmp),
                None => array_expr,
            },
            ChainStep::Map => array_expr,
        };
    }

    let key_fn = match &loop_node.key_expr {
        Some(expr) => format!("(({item}) => ({expr}))", item = loop_node.item_var, expr = expr),
        None => "null".to_string(),
    };

    let render_item = serialize_branch(&loop_node.body, errors);
    format!(
        "  createEffect(() => {{ reconcileList(_{id}, ({array}), {key}, ({item}, {idx}) => `{body}`); }});\n",
        id = loop_node.slot_id,
        array = array_expr,
        key = key_fn,
        item = loop_node.item_var,
        idx = loop_node.index_var.clone().unwrap_or_else(|| "_index".to_string()),
        body = render_item
    )
}

fn predicate_js(pred: &crate::ir::Predicate) -> String {
    match pred {
        crate::ir::Predicate::Opaque(raw) => raw.clone(),
        crate::ir::Predicate::Structured { body, .. } => predicate_body_js(body),
    }
}

fn predicate_body_js(body: &crate::ir::PredicateBody) -> String {
    use crate::ir::PredicateBody::*;
    match body {
        Return(expr) => expr.clone(),
        WithAliases { aliases, ret } => {
            let prelude: String = aliases.iter().map(|(n, v)| format!("const {} = {}; ", n, v)).collect();
            format!("(() => {{ {}return {}; }})()", prelude, predicate_body_js(ret))
        }
        EqualityChain { lhs, arms, default } => {
            let mut out = String::new();
            for (literal, result) in arms {
                out.push_str(&format!("({lhs} === \"{literal}\") ? ({result}) : ", lhs = lhs, literal = literal, result = result));
            }
            out.push_str(&format!("({})", default));
            out
        }
    }
}

/// Serializes a branch subtree as a JS template-literal body (§4.5
/// "Conditional branch templates"): static text escaped for both HTML and
/// template-literal syntax, dynamic parts kept as `${...}` interpolations.
fn serialize_branch(node: &IrNode, errors: &mut Vec<CompileError>) -> String {
    match node {
        IrNode::Text(t) => escape_template_literal(&crate::adapter::escape_html(&t.value)),
        IrNode::Expression(x) => {
            let marker = x.slot_id.as_deref().map(|id| format!(" slot-marker=\"{}\"", id)).unwrap_or_default();
            if marker.is_empty() {
                format!("${{String({})}}", x.raw)
            } else {
                format!("<span{marker}>${{String({raw})}}</span>", marker = marker, raw = x.raw)
            }
        }
        IrNode::Element(el) => serialize_element_branch(el, errors),
        IrNode::Fragment(f) => f
            .children
            .iter()
            .map(|c| serialize_branch(c, errors))
            .collect(),
        IrNode::Conditional(_) | IrNode::Loop(_) | IrNode::Component(_) | IrNode::Slot(_) => {
            errors.push(CompileError::new(
                crate::error::codes::UNSUPPORTED_EXPRESSION,
                crate::error::Severity::Info,
                "nested reactive node inside a conditional/loop branch template is re-bound on its own slot, not re-serialized",
                "",
                node.location(),
            ));
            String::new()
        }
    }
}

fn serialize_element_branch(el: &ElementNode, errors: &mut Vec<CompileError>) -> String {
    let mut out = format!("<{}", el.tag);
    for attr in &el.attributes {
        match &attr.value {
            AttributeValue::Static(v) => out.push_str(&format!(" {}=\"{}\"", attr.name, crate::adapter::escape_attr(v))),
            AttributeValue::BooleanPresent => out.push_str(&format!(" {}", attr.name)),
            AttributeValue::Dynamic(expr) => out.push_str(&format!(" {}=\"${{{}}}\"", attr.name, expr)),
        }
    }
    if let Some(id) = &el.slot_id {
        out.push_str(&format!(" slot-marker=\"{}\"", id));
    }
    out.push('>');
    if crate::ir::is_void_element(&el.tag) {
        return out;
    }
    for child in &el.children {
        out.push_str(&serialize_branch(child, errors));
    }
    out.push_str(&format!("</{}>", el.tag));
    out
}

fn escape_template_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('`', "\\`").replace('$', "\\$")
}

/// One ordered pass over the IR collecting every node the generator needs,
/// in the same traversal order slot ids were assigned in.
struct Inventory<'a> {
    queried_slots: Vec<&'a str>,
    texts: Vec<&'a ExpressionNode>,
    dynamic_attrs: Vec<(&'a ElementNode, &'a Attribute)>,
    conditionals: Vec<&'a ConditionalNode>,
    loops: Vec<&'a LoopNode>,
    events: Vec<(&'a ElementNode, &'a Event)>,
    refs: Vec<(&'a ElementNode, &'a str)>,
    children: Vec<&'a ComponentNode>,
}

impl<'a> Inventory<'a> {
    fn is_empty(&self) -> bool {
        self.texts.is_empty()
            && self.dynamic_attrs.is_empty()
            && self.conditionals.is_empty()
            && self.loops.is_empty()
            && self.events.is_empty()
            && self.refs.is_empty()
            && self.children.is_empty()
    }

    fn collect(root: &'a IrNode) -> Self {
        let mut inv = Inventory {
            queried_slots: Vec::new(),
            texts: Vec::new(),
            dynamic_attrs: Vec::new(),
            conditionals: Vec::new(),
            loops: Vec::new(),
            events: Vec::new(),
            refs: Vec::new(),
            children: Vec::new(),
        };
        inv.walk(root);
        inv
    }

    fn walk(&mut self, node: &'a IrNode) {
        match node {
            IrNode::Element(el) => {
                for child in &el.children {
                    self.walk(child);
                }
                let needs_query = !el.events.is_empty() || el.ref_expr.is_some() || el.attributes.iter().any(|a| a.dynamic);
                if needs_query {
                    if let Some(id) = &el.slot_id {
                        self.queried_slots.push(id);
                    }
                }
                for attr in &el.attributes {
                    if attr.dynamic {
                        self.dynamic_attrs.push((el, attr));
                    }
                }
                for event in &el.events {
                    self.events.push((el, event));
                }
                if let Some(ref_expr) = &el.ref_expr {
                    self.refs.push((el, ref_expr));
                }
            }
            IrNode::Expression(expr) => {
                if let Some(id) = &expr.slot_id {
                    self.queried_slots.push(id);
                    self.texts.push(expr);
                }
            }
            IrNode::Conditional(cond) => {
                self.walk(&cond.when_true);
                self.walk(&cond.when_false);
                if let Some(id) = &cond.slot_id {
                    self.queried_slots.push(id);
                    self.conditionals.push(cond);
                }
            }
            IrNode::Loop(loop_node) => {
                self.walk(&loop_node.body);
                self.queried_slots.push(&loop_node.slot_id);
                self.loops.push(loop_node);
            }
            IrNode::Component(comp) => {
                for child in &comp.children {
                    self.walk(child);
                }
                self.children.push(comp);
            }
            IrNode::Fragment(f) => {
                for child in &f.children {
                    self.walk(child);
                }
            }
            IrNode::Text(_) | IrNode::Slot(_) => {}
        }
    }
}

/// §4.5 step 2's "default by type" table, used whenever a declared signal's
/// `createSignal()` call had no initial-value argument.
fn default_for_type(type_annotation: Option<&str>) -> &'static str {
    match type_annotation {
        Some("number") => "0",
        Some("boolean") => "false",
        Some(t) if t.ends_with("[]") => "[]",
        Some("object") => "{}",
        Some("string") => "''",
        _ => "undefined",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::transform;

    fn build(source: &str) -> ComponentIr {
        let ctx = Analyzer::analyze(source, "test.tsx");
        transform::build_ir(&ctx).expect("markup-return subtree expected")
    }

    #[test]
    fn purely_static_component_emits_no_client_script() {
        let ir = build(
            r#"
            export default function Hello() {
              return <div>Hello, world</div>;
            }
            "#,
        );
        let (js, errors) = generate_client_js(&ir);
        assert!(js.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn signal_text_and_click_handler_wire_up_a_query_effect_and_listener() {
        let ir = build(
            r#"
            export default function Counter() {
              const [count, setCount] = createSignal(0);
              return <button onClick={increment}>{count()}</button>;
            }
            "#,
        );
        let (js, errors) = generate_client_js(&ir);
        assert!(errors.is_empty());
        assert!(js.starts_with("export function initCounter(instanceIndex, parentScope, props) {"));
        assert!(js.contains("const [count, setCount] = createSignal(0);"));
        assert!(js.contains(r#"scope.querySelector('[slot-marker="s0"]')"#));
        assert!(js.contains(r#"scope.querySelector('[slot-marker="s1"]')"#));
        assert!(js.contains("_s0.textContent = String(count());"));
        assert!(js.contains("_s1.onclick = increment;"));
    }

    #[test]
    fn memo_and_effect_bodies_are_emitted_verbatim_not_double_wrapped() {
        let ir = build(
            r#"
            export default function Title() {
              const [count, setCount] = createSignal(0);
              const doubled = createMemo(() => count() * 2);
              createEffect(() => setTitle(count()));
              return <div>{doubled()}</div>;
            }
            "#,
        );
        let (js, errors) = generate_client_js(&ir);
        assert!(errors.is_empty());
        assert!(js.contains("const doubled = createMemo(() => count() * 2);"));
        assert!(js.contains("createEffect(() => setTitle(count()));"));
        assert!(!js.contains("createMemo(() => (() =>"));
        assert!(!js.contains("createEffect(() => { () =>"));
    }

    #[test]
    fn a_blur_handler_is_bound_with_addeventlistener_capture() {
        let ir = build(
            r#"
            export default function Field(props) {
              return <input onBlur={validate} value={props.value} />;
            }
            "#,
        );
        let (js, _errors) = generate_client_js(&ir);
        assert!(js.contains(r#".addEventListener("blur", validate, true);"#));
    }

    #[test]
    fn a_loop_becomes_a_reconcilelist_call() {
        let ir = build(
            r#"
            export default function List(props) {
              return <ul>{props.items.map(item => <li key={item.id}>{item.name}</li>)}</ul>;
            }
            "#,
        );
        let (js, _errors) = generate_client_js(&ir);
        assert!(js.contains("reconcileList("));
        assert!(js.contains("props.items"));
    }

    #[test]
    fn child_components_are_initialized_in_source_order() {
        let ir = build(
            r#"
            export default function Page(props) {
              return <div><Header title={props.title} /><Footer /></div>;
            }
            "#,
        );
        let (js, _errors) = generate_client_js(&ir);
        let header_pos = js.find("initHeader(").expect("Header init call expected");
        let footer_pos = js.find("initFooter(").expect("Footer init call expected");
        assert!(header_pos < footer_pos);
    }
}
