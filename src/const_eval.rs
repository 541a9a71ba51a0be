//! Limited constant evaluator (§9 "limited constant evaluation for
//! reference-adapter pre-rendering in tests").
//!
//! Evaluates a narrow slice of JS expression syntax — literals, bare
//! identifiers resolved against signal initial values / static props / loop
//! item fields, member access on those, negation, and ternaries — to produce
//! the literal text the conformance fixtures expect in their golden HTML.
//! Deliberately not a general interpreter: anything outside this grammar
//! returns `None` and callers fall back to emitting the raw expression as an
//! embedded placeholder. Modeled on the teacher's own `static_eval.rs`: same
//! "strict mode, unknown things return None" posture, same hand-rolled
//! string scanning rather than a parser generator.

use std::collections::HashMap;

/// An evaluated object value: a flat map of field name to its own evaluated
/// text. Good enough for the `item.field` accesses a `.map` body performs.
pub type ObjectFields = HashMap<String, String>;

#[derive(Debug, Default, Clone)]
pub struct EvalEnv {
    /// Signal getter name -> initial value expression text (itself
    /// recursively evaluable).
    pub signals: HashMap<String, String>,
    /// Static prop name -> value text.
    pub props: HashMap<String, String>,
    /// Loop item variable name -> its field map, for the current iteration.
    pub locals: HashMap<String, ObjectFields>,
}

/// Evaluates `expr` to its literal text, or `None` if it falls outside the
/// recognized grammar.
pub fn eval(expr: &str, env: &EvalEnv) -> Option<String> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(lit) = parse_string_literal(trimmed) {
        return Some(lit);
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Some(format_number(n));
    }
    match trimmed {
        "true" => return Some("true".to_string()),
        "false" => return Some("false".to_string()),
        "null" | "undefined" => return Some("".to_string()),
        _ => {}
    }

    if let Some(rest) = trimmed.strip_prefix('!') {
        let inner = eval(rest, env)?;
        return Some(if is_falsy(&inner) { "true".to_string() } else { "false".to_string() });
    }

    if let Some((cond, yes, no)) = split_ternary(trimmed) {
        let cond_val = eval(&cond, env)?;
        return if is_falsy(&cond_val) { eval(&no, env) } else { eval(&yes, env) };
    }

    // A call to a zero-arg accessor, e.g. a signal getter `count()` or a
    // memo `doubled()` (memos aren't modeled here; only signal getters are
    // pre-rendered, matching the seed scenarios).
    if let Some(name) = trimmed.strip_suffix("()") {
        if is_identifier(name) {
            if let Some(initial) = env.signals.get(name) {
                return eval(initial, env);
            }
            return None;
        }
    }

    if let Some(dot) = trimmed.find('.') {
        let (head, rest) = trimmed.split_at(dot);
        let field = &rest[1..];
        if is_identifier(head) && is_identifier(field) {
            if let Some(obj) = env.locals.get(head) {
                return obj.get(field).cloned();
            }
        }
        return None;
    }

    if is_identifier(trimmed) {
        if let Some(v) = env.locals.get(trimmed).and_then(|o| o.get("")) {
            return Some(v.clone());
        }
        if let Some(v) = env.props.get(trimmed) {
            return Some(v.clone());
        }
        if let Some(v) = env.signals.get(trimmed) {
            return eval(v, env);
        }
        return None;
    }

    None
}

fn is_falsy(s: &str) -> bool {
    matches!(s, "" | "false" | "0" | "null")
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn parse_string_literal(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let quote = bytes[0];
        if (quote == b'"' || quote == b'\'' || quote == b'`') && bytes[bytes.len() - 1] == quote {
            return Some(s[1..s.len() - 1].to_string());
        }
    }
    None
}

/// Splits `cond ? yes : no` at top-level `?`/`:` (ignoring ones nested in
/// parens, brackets, braces, or string literals).
fn split_ternary(s: &str) -> Option<(String, String, String)> {
    let q = find_top_level(s, '?')?;
    let c = find_top_level(&s[q + 1..], ':')? + q + 1;
    Some((
        s[..q].trim().to_string(),
        s[q + 1..c].trim().to_string(),
        s[c + 1..].trim().to_string(),
    ))
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    for (i, c) in s.char_indices() {
        if let Some(q) = in_string {
            if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parses a JS array literal of object literals, e.g.
/// `[{label:"Alpha"},{label:"Beta"}]`, into one field map per element.
/// Object literal values must themselves be string or number literals;
/// anything else causes the whole parse to fail (`None`).
pub fn eval_static_array(expr: &str) -> Option<Vec<ObjectFields>> {
    let trimmed = expr.trim();
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    let mut out = Vec::new();
    for item in split_top_level(inner, ',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        out.push(parse_object_literal(item)?);
    }
    Some(out)
}

fn parse_object_literal(s: &str) -> Option<ObjectFields> {
    let inner = s.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut fields = ObjectFields::new();
    for pair in split_top_level(inner, ',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let colon = find_top_level(pair, ':')?;
        let key = pair[..colon].trim().trim_matches('"').trim_matches('\'');
        let value = pair[colon + 1..].trim();
        let evaluated = parse_string_literal(value)
            .or_else(|| value.parse::<f64>().ok().map(format_number))
            .or_else(|| match value {
                "true" => Some("true".to_string()),
                "false" => Some("false".to_string()),
                _ => None,
            })?;
        fields.insert(key.to_string(), evaluated);
    }
    Some(fields)
}

fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        if let Some(q) = in_string {
            if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                out.push(s[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_signal_initial_value() {
        let mut env = EvalEnv::default();
        env.signals.insert("count".to_string(), "0".to_string());
        assert_eq!(eval("count()", &env), Some("0".to_string()));
    }

    #[test]
    fn evaluates_ternary_over_signal() {
        let mut env = EvalEnv::default();
        env.signals.insert("show".to_string(), "false".to_string());
        assert_eq!(
            eval(r#"show() ? "Visible" : "Hidden""#, &env),
            Some("Hidden".to_string())
        );
    }

    #[test]
    fn evaluates_static_array_of_objects() {
        let items = eval_static_array(r#"[{label:"Alpha"},{label:"Beta"},{label:"Gamma"}]"#).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].get("label"), Some(&"Alpha".to_string()));
        assert_eq!(items[2].get("label"), Some(&"Gamma".to_string()));
    }

    #[test]
    fn member_access_on_loop_item() {
        let mut env = EvalEnv::default();
        let mut fields = ObjectFields::new();
        fields.insert("label".to_string(), "Alpha".to_string());
        env.locals.insert("item".to_string(), fields);
        assert_eq!(eval("item.label", &env), Some("Alpha".to_string()));
    }

    #[test]
    fn unknown_identifier_is_none() {
        let env = EvalEnv::default();
        assert_eq!(eval("mystery", &env), None);
    }
}
