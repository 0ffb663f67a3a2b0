//! Parsing of `KEY=JSON` command-line assignments.

use anyhow::{Context, Result, bail};
use serde_json::Value;

/// Splits `KEY=JSON` at the first `=`. A value that is not valid JSON is
/// taken as a plain string, so `--set theme=dark` works without quoting.
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty key in '{raw}'");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Parses `FORM=JSON`; the value must be valid JSON.
pub fn parse_submission(raw: &str) -> Result<(String, Value)> {
    let Some((form, data)) = raw.split_once('=') else {
        bail!("expected FORM=JSON, got '{raw}'");
    };
    let data = serde_json::from_str(data).with_context(|| format!("invalid JSON for form '{form}'"))?;
    Ok((form.to_string(), data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignments_parse_json_or_fall_back_to_strings() {
        assert_eq!(parse_assignment("debug=true").unwrap(), ("debug".into(), json!(true)));
        assert_eq!(
            parse_assignment("permissions={\"a\":[\"read\"]}").unwrap().1,
            json!({ "a": ["read"] })
        );
        assert_eq!(parse_assignment("theme=dark").unwrap().1, json!("dark"));
        assert_eq!(parse_assignment("expr=a=b").unwrap().1, json!("a=b"));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn submissions_require_json() {
        assert_eq!(
            parse_submission("analytics={\"collection\":true}").unwrap(),
            ("analytics".into(), json!({ "collection": true }))
        );
        assert!(parse_submission("analytics={").is_err());
    }
}
