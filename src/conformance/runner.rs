//! The three conformance runners (§4.6 "Runners").

use super::fixture::Fixture;
use super::normalize::normalize_html;
use crate::adapter::{reference::ReferenceAdapter, Adapter, ScopeIdMode};
use crate::analyzer::Analyzer;
use crate::transform;

/// Fixtures render with a fixed scope id so goldens are deterministic (§9
/// carve-out: "limited constant evaluation for reference-adapter
/// pre-rendering in tests").
const FIXTURE_SCOPE: &str = "test";

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Match,
    Mismatch { expected: String, actual: String },
    Skipped { reason: String },
    /// The fixture declared no `expectedHtml` to compare against.
    NoExpectation { rendered: String },
}

fn render_fixture(fixture: &Fixture, adapter: &dyn Adapter) -> Option<String> {
    let ctx = Analyzer::analyze(&fixture.source, &fixture.id);
    let ir = transform::build_ir(&ctx)?;
    let scope = ScopeIdMode::Fixed(FIXTURE_SCOPE.to_string());
    let (generated, _errors) = adapter.generate_with_props(&ir, &scope, fixture.props_as_eval_env());
    Some(normalize_html(&generated.template))
}

/// Compiles the fixture with the adapter under test and compares its
/// rendered, normalized output against `expectedHtml`.
pub fn run_adapter_conformance(fixture: &Fixture, adapter: &dyn Adapter) -> RunOutcome {
    let Some(actual) = render_fixture(fixture, adapter) else {
        return RunOutcome::Skipped {
            reason: "no markup-return subtree found".to_string(),
        };
    };
    match &fixture.expected_html {
        Some(expected) => {
            let expected = normalize_html(expected);
            if expected == actual {
                RunOutcome::Match
            } else {
                RunOutcome::Mismatch { expected, actual }
            }
        }
        None => RunOutcome::NoExpectation { rendered: actual },
    }
}

/// Compiles with both the adapter under test and the reference adapter,
/// normalizes both, and asserts equality — independent of any golden file.
pub fn run_differential(fixture: &Fixture, adapter: &dyn Adapter) -> RunOutcome {
    let reference = ReferenceAdapter::new();
    let (Some(actual), Some(expected)) = (render_fixture(fixture, adapter), render_fixture(fixture, &reference))
    else {
        return RunOutcome::Skipped {
            reason: "no markup-return subtree found".to_string(),
        };
    };
    if actual == expected {
        RunOutcome::Match
    } else {
        RunOutcome::Mismatch { expected, actual }
    }
}

/// §4.6: "evaluate its template-generating function in a sandboxed module
/// with runtime primitives stubbed." Realized per the grounding note as a
/// pure-Rust re-render of the same IR the client generator walks, rather
/// than executing the emitted JS — skips fixtures that are purely static
/// (no client script would be emitted at all) since there is nothing to
/// evaluate.
pub fn run_client_script_conformance(fixture: &Fixture, adapter: &dyn Adapter) -> RunOutcome {
    let ctx = Analyzer::analyze(&fixture.source, &fixture.id);
    let Some(ir) = transform::build_ir(&ctx) else {
        return RunOutcome::Skipped {
            reason: "no markup-return subtree found".to_string(),
        };
    };
    if ir.metadata.is_static() && ir.slot_count() == 0 {
        return RunOutcome::Skipped {
            reason: "purely static component emits no client script".to_string(),
        };
    }
    let Some(actual) = render_fixture(fixture, adapter) else {
        return RunOutcome::Skipped {
            reason: "no markup-return subtree found".to_string(),
        };
    };
    match &fixture.expected_html {
        Some(expected) => {
            let expected = normalize_html(expected);
            if expected == actual {
                RunOutcome::Match
            } else {
                RunOutcome::Mismatch { expected, actual }
            }
        }
        None => RunOutcome::NoExpectation { rendered: actual },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fixture_with(expected_html: Option<&str>) -> Fixture {
        Fixture {
            id: "counter".to_string(),
            description: "a signal rendered as its sole reactive child".to_string(),
            source: r#"
                export default function Counter() {
                  const [count, setCount] = createSignal(0);
                  return <div>{count()}</div>;
                }
            "#
            .to_string(),
            props: HashMap::new(),
            companions: HashMap::new(),
            expected_html: expected_html.map(str::to_string),
        }
    }

    #[test]
    fn matching_fixture_passes_adapter_conformance() {
        let fixture = fixture_with(Some(r#"<div bf-s="test" bf="s1"><!--bf:s0-->0</div>"#));
        let adapter = ReferenceAdapter::new();
        assert!(matches!(run_adapter_conformance(&fixture, &adapter), RunOutcome::Match));
    }

    #[test]
    fn wrong_expectation_is_reported_as_a_mismatch() {
        let fixture = fixture_with(Some(r#"<div bf-s="test" bf="s1"><!--bf:s0-->99</div>"#));
        let adapter = ReferenceAdapter::new();
        assert!(matches!(
            run_adapter_conformance(&fixture, &adapter),
            RunOutcome::Mismatch { .. }
        ));
    }

    #[test]
    fn missing_expectation_is_reported_but_still_renders() {
        let fixture = fixture_with(None);
        let adapter = ReferenceAdapter::new();
        match run_adapter_conformance(&fixture, &adapter) {
            RunOutcome::NoExpectation { rendered } => assert!(rendered.contains('0')),
            other => panic!("expected NoExpectation, got {:?}", other),
        }
    }

    #[test]
    fn differential_run_agrees_with_itself_against_the_reference_adapter() {
        let fixture = fixture_with(None);
        let adapter = ReferenceAdapter::new();
        assert!(matches!(run_differential(&fixture, &adapter), RunOutcome::Match));
    }

    #[test]
    fn purely_static_component_is_skipped_by_client_script_conformance() {
        let fixture = Fixture {
            id: "static".to_string(),
            description: String::new(),
            source: r#"
                export default function Hello() {
                  return <div>Hello, world</div>;
                }
            "#
            .to_string(),
            props: HashMap::new(),
            companions: HashMap::new(),
            expected_html: None,
        };
        let adapter = ReferenceAdapter::new();
        assert!(matches!(
            run_client_script_conformance(&fixture, &adapter),
            RunOutcome::Skipped { .. }
        ));
    }
}
