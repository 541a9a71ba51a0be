//! The language-neutral Intermediate Representation shared by every adapter
//! and by the client-script generator.
//!
//! A `ComponentIR` is built once per compile call (see [`crate::transform`]),
//! consumed by exactly one adapter and by [`crate::client_codegen`], then
//! discarded. Slot identifiers assigned during that single build are the only
//! part of the IR that survives into the emitted artifacts.

use serde::{Deserialize, Serialize};

/// A stable source position, 1-indexed line / 0-indexed column as required by
/// the error shape in the external interface (`CompileError::location`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// A slot identifier, `s0`, `s1`, .... Assigned by [`crate::slots::SlotAllocator`]
/// in deterministic pre-order. Appears at most once in the template and at
/// most once in the client script.
pub type SlotId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// A literal string value, e.g. `class="card"`.
    Static(String),
    /// The raw expression text of a dynamic attribute, e.g. `class={active() ? "on" : "off"}`.
    Dynamic(String),
    /// A boolean-present attribute with no value, e.g. `<input disabled />`.
    BooleanPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    /// True unless `value` is `Static`.
    pub dynamic: bool,
    /// True when the attribute was written as a literal in source (as opposed
    /// to synthesized by a normalization pass, e.g. `className` -> `class`).
    pub literal_source: bool,
    pub location: SourceLocation,
}

impl Attribute {
    /// A spread attribute is represented as a pseudo-attribute named `...`
    /// whose value is the spread expression text.
    pub fn is_spread(&self) -> bool {
        self.name == "..."
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Name without any "on" prefix, e.g. `click` for `onClick`.
    pub name: String,
    pub handler: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prop {
    pub name: String,
    pub value: PropValue,
    pub dynamic: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropValue {
    Static(String),
    Dynamic(String),
}

/// The ordering among `filter`/`sort`/`map` in a loop chain, preserved so the
/// adapter and client generator can reapply it at runtime in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStep {
    Filter,
    Sort,
    Map,
}

/// A structured, block-bodied predicate recognized by the transformer, as
/// opposed to an opaque expression string. Only a narrow grammar is
/// recognized (see `crate::transform::predicate`); anything wider becomes an
/// `Opaque` variant and loses the structural translation in typed adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// `item => expr` or `item => { return expr; }` with a grammar the
    /// transformer could parse structurally.
    Structured {
        item_var: String,
        body: PredicateBody,
    },
    /// Anything outside the recognized grammar; carried verbatim so the
    /// reference adapter can still emit it as an inline expression.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateBody {
    /// `return expr;` with no local aliases.
    Return(String),
    /// One or more `const x = <field-path>;` aliases followed by a `return`.
    WithAliases {
        aliases: Vec<(String, String)>,
        ret: Box<PredicateBody>,
    },
    /// `if (lhs === "literal") return a; ... return b;` chains.
    EqualityChain {
        lhs: String,
        arms: Vec<(String, String)>,
        default: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrNode {
    Element(ElementNode),
    Text(TextNode),
    Expression(ExpressionNode),
    Conditional(ConditionalNode),
    Loop(LoopNode),
    Component(ComponentNode),
    Slot(SlotNode),
    Fragment(FragmentNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub events: Vec<Event>,
    pub ref_expr: Option<String>,
    pub children: Vec<IrNode>,
    pub slot_id: Option<SlotId>,
    pub needs_scope: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
    pub value: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionNode {
    pub raw: String,
    pub inferred_type: Option<String>,
    pub reactive: bool,
    pub slot_id: Option<SlotId>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalNode {
    pub condition: String,
    pub reactive: bool,
    pub when_true: Box<IrNode>,
    pub when_false: Box<IrNode>,
    pub slot_id: Option<SlotId>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopNode {
    pub array_expr: String,
    pub item_var: String,
    pub index_var: Option<String>,
    pub key_expr: Option<String>,
    pub body: Box<IrNode>,
    pub filter_predicate: Option<Predicate>,
    pub sort_comparator: Option<String>,
    pub chain: Vec<ChainStep>,
    pub slot_id: SlotId,
    pub is_static_array: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub name: String,
    pub props: Vec<Prop>,
    pub children: Vec<IrNode>,
    pub slot_id: Option<SlotId>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotNode {
    pub name: Option<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentNode {
    pub children: Vec<IrNode>,
    pub location: SourceLocation,
}

impl IrNode {
    pub fn location(&self) -> SourceLocation {
        match self {
            IrNode::Element(n) => n.location,
            IrNode::Text(n) => n.location,
            IrNode::Expression(n) => n.location,
            IrNode::Conditional(n) => n.location,
            IrNode::Loop(n) => n.location,
            IrNode::Component(n) => n.location,
            IrNode::Slot(n) => n.location,
            IrNode::Fragment(n) => n.location,
        }
    }

    pub fn slot_id(&self) -> Option<&SlotId> {
        match self {
            IrNode::Element(n) => n.slot_id.as_ref(),
            IrNode::Expression(n) => n.slot_id.as_ref(),
            IrNode::Conditional(n) => n.slot_id.as_ref(),
            IrNode::Loop(n) => Some(&n.slot_id),
            IrNode::Component(n) => n.slot_id.as_ref(),
            _ => None,
        }
    }

    /// The first element reachable by descending through fragments only,
    /// used to decide which element receives `needsScope` when the root is a
    /// `Fragment`.
    pub fn first_element(&self) -> Option<&ElementNode> {
        match self {
            IrNode::Element(e) => Some(e),
            IrNode::Fragment(f) => f.children.iter().find_map(IrNode::first_element),
            _ => None,
        }
    }
}

/// A signal declared via `[getter, setter] = createSignal(initial)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDecl {
    pub getter: String,
    pub setter: String,
    pub initial_value: String,
    pub inferred_type: Option<String>,
}

/// A memo declared via `name = createMemo(computation)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoDecl {
    pub name: String,
    pub computation: String,
    pub dependencies: Vec<String>,
    pub inferred_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDecl {
    pub body: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub type_annotation: Option<String>,
    pub optional: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    pub name: String,
    pub alias: Option<String>,
    pub is_default: bool,
    pub is_namespace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub source: String,
    pub specifiers: Vec<ImportSpecifier>,
    pub type_only: bool,
}

/// Everything the later phases need about one component, extracted once by
/// the analyzer so nothing has to be re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub name: String,
    pub is_client_reactive: bool,
    pub props_params: Vec<ParamInfo>,
    /// Set when props arrive as a bare identifier (`props`) rather than a
    /// destructured object pattern; the transformer then rewrites bare
    /// identifiers it cannot otherwise classify to `props.x` lookups.
    pub props_binding_name: Option<String>,
    pub rest_props_binding: Option<String>,
    pub signals: Vec<SignalDecl>,
    pub memos: Vec<MemoDecl>,
    pub effects: Vec<EffectDecl>,
    pub on_mounts: Vec<String>,
    pub imports: Vec<ImportDecl>,
    pub local_functions: Vec<String>,
    pub local_constants: Vec<String>,
}

impl ComponentMetadata {
    pub fn is_static(&self) -> bool {
        self.signals.is_empty() && self.memos.is_empty() && self.effects.is_empty()
    }
}

pub const IR_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentIr {
    pub version: String,
    pub metadata: ComponentMetadata,
    pub root: IrNode,
    /// Errors accumulated while building this IR (parse errors already
    /// stopped the pipeline before this struct exists; these are transform-
    /// phase warnings/infos, e.g. an unrecognized `.map` callback body).
    pub errors: Vec<crate::error::CompileError>,
}

impl ComponentIr {
    /// Total slot count, i.e. one past the highest allocated slot index.
    pub fn slot_count(&self) -> usize {
        fn walk(node: &IrNode, count: &mut usize) {
            if let Some(id) = node.slot_id() {
                if let Ok(n) = id.trim_start_matches('s').parse::<usize>() {
                    *count = (*count).max(n + 1);
                }
            }
            match node {
                IrNode::Element(e) => e.children.iter().for_each(|c| walk(c, count)),
                IrNode::Conditional(c) => {
                    walk(&c.when_true, count);
                    walk(&c.when_false, count);
                }
                IrNode::Loop(l) => walk(&l.body, count),
                IrNode::Component(c) => c.children.iter().for_each(|c| walk(c, count)),
                IrNode::Fragment(f) => f.children.iter().for_each(|c| walk(c, count)),
                _ => {}
            }
        }
        let mut count = 0;
        walk(&self.root, &mut count);
        count
    }
}

/// The void-element set from the reference template dialect (shared by all
/// HTML-flavored adapters): never emits a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Events that must be bound with `addEventListener(name, handler, true)`
/// rather than an `element.onX = handler` property assignment, because they
/// do not bubble.
pub const CAPTURE_ONLY_EVENTS: &[&str] = &["blur", "focus", "focusin", "focusout"];

/// Boolean attributes the client generator assigns as DOM properties rather
/// than via `setAttribute`.
pub const BOOLEAN_PROPERTY_ATTRS: &[&str] = &["disabled", "checked", "hidden", "readonly", "required"];
