//! The fixture model (§4.6 "Fixture model").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id: String,
    pub description: String,
    pub source: String,
    #[serde(default)]
    pub props: HashMap<String, serde_json::Value>,
    /// Filename -> source, for components the fixture's source imports.
    #[serde(default)]
    pub companions: HashMap<String, String>,
    #[serde(rename = "expectedHtml", skip_serializing_if = "Option::is_none")]
    pub expected_html: Option<String>,
}

impl Fixture {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Props flattened to the string form [`crate::const_eval::EvalEnv`]
    /// expects: numbers/bools rendered as their literal text, strings
    /// passed through unquoted (the evaluator treats a prop lookup as
    /// already-resolved text, not a re-parsed literal).
    pub fn props_as_eval_env(&self) -> HashMap<String, String> {
        self.props
            .iter()
            .map(|(k, v)| (k.clone(), json_value_to_text(v)))
            .collect()
    }
}

fn json_value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let json = r#"{
            "id": "counter-basic",
            "description": "a bare signal rendered as text",
            "source": "export default function Counter() { const [c] = createSignal(0); return <div>{c()}</div>; }",
            "props": { "label": "Count", "max": 10, "enabled": true },
            "expectedHtml": "<div bf-s=\"test\">0</div>"
        }"#;
        let fixture = Fixture::from_json(json).unwrap();
        assert_eq!(fixture.id, "counter-basic");
        assert_eq!(fixture.expected_html.as_deref(), Some("<div bf-s=\"test\">0</div>"));

        let round_tripped = Fixture::from_json(&fixture.to_json_pretty().unwrap()).unwrap();
        assert_eq!(round_tripped.id, fixture.id);
        assert_eq!(round_tripped.expected_html, fixture.expected_html);
    }

    #[test]
    fn props_are_flattened_to_their_literal_text() {
        let mut fixture = Fixture {
            id: "x".to_string(),
            description: String::new(),
            source: String::new(),
            props: HashMap::new(),
            companions: HashMap::new(),
            expected_html: None,
        };
        fixture.props.insert("label".to_string(), serde_json::json!("Count"));
        fixture.props.insert("max".to_string(), serde_json::json!(10));
        fixture.props.insert("enabled".to_string(), serde_json::json!(true));

        let env = fixture.props_as_eval_env();
        assert_eq!(env.get("label"), Some(&"Count".to_string()));
        assert_eq!(env.get("max"), Some(&"10".to_string()));
        assert_eq!(env.get("enabled"), Some(&"true".to_string()));
    }

    #[test]
    fn missing_expected_html_serializes_without_the_field() {
        let fixture = Fixture {
            id: "x".to_string(),
            description: String::new(),
            source: String::new(),
            props: HashMap::new(),
            companions: HashMap::new(),
            expected_html: None,
        };
        assert!(!fixture.to_json_pretty().unwrap().contains("expectedHtml"));
    }
}
