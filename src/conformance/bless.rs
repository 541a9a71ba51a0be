//! Expected-HTML bootstrapping (§4.6): renders each fixture via the
//! reference adapter and writes the normalized, re-indented result back as
//! the fixture's `expectedHtml` field. The `bfc conformance --bless` CLI
//! path is a thin wrapper over [`bless_fixture`].

use super::fixture::Fixture;
use super::normalize::{format_for_fixture, normalize_html};
use crate::adapter::reference::ReferenceAdapter;
use crate::adapter::ScopeIdMode;
use crate::analyzer::Analyzer;
use crate::transform;

/// Renders `fixture` via the reference adapter and returns an updated copy
/// with `expectedHtml` set. Returns `None` if the fixture has no
/// markup-return subtree (nothing to bless).
pub fn bless_fixture(fixture: &Fixture) -> Option<Fixture> {
    let ctx = Analyzer::analyze(&fixture.source, &fixture.id);
    let ir = transform::build_ir(&ctx)?;
    let adapter = ReferenceAdapter::new();
    let scope = ScopeIdMode::Fixed("test".to_string());
    let (generated, _errors) = adapter.generate_with_props(&ir, &scope, fixture.props_as_eval_env());
    let normalized = normalize_html(&generated.template);
    let mut updated = fixture.clone();
    updated.expected_html = Some(format_for_fixture(&normalized));
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn blessing_a_fixture_fills_in_expected_html_and_then_passes_conformance() {
        let fixture = Fixture {
            id: "counter".to_string(),
            description: String::new(),
            source: r#"
                export default function Counter() {
                  const [count, setCount] = createSignal(0);
                  return <div>{count()}</div>;
                }
            "#
            .to_string(),
            props: HashMap::new(),
            companions: HashMap::new(),
            expected_html: None,
        };

        let blessed = bless_fixture(&fixture).expect("fixture has a markup-return subtree");
        assert!(blessed.expected_html.is_some());

        let outcome = crate::conformance::runner::run_adapter_conformance(&blessed, &ReferenceAdapter::new());
        assert!(matches!(outcome, crate::conformance::RunOutcome::Match));
    }

    #[test]
    fn a_fixture_with_no_markup_return_cannot_be_blessed() {
        let fixture = Fixture {
            id: "nothing".to_string(),
            description: String::new(),
            source: "export const x = 1;".to_string(),
            props: HashMap::new(),
            companions: HashMap::new(),
            expected_html: None,
        };
        assert!(bless_fixture(&fixture).is_none());
    }
}
