//! Negotiation Prompt Composition
//!
//! Turns the details a user typed into the negotiation form into the system
//! prompt handed to the voice agent. Every supplied field ends up in the
//! prompt verbatim: either where the template names it, or in a trailing
//! "Additional details" section.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::Path;

/// Form fields the default template knows how to place.
pub const KNOWN_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "phone",
    "isp",
    "account_number",
    "street_address",
    "apartment",
    "city",
    "province",
    "postal_code",
    "situation",
];

/// Substituted for a known placeholder the user left empty.
pub const MISSING_VALUE: &str = "not provided";

/// Built-in template, used when no prompt file overrides it.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../../prompts/negotiation.md");

/// The user's negotiation details, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationContext {
    fields: BTreeMap<String, String>,
}

impl NegotiationContext {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NegotiationContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A prompt template with `{field}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Reads a template file. A missing file is `Ok(None)`.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(template) => Ok(Some(Self::new(template))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Renders the prompt for `context`, optionally followed by the latest
    /// pipeline outputs as plan data.
    ///
    /// Substitution is a single left-to-right pass, so values that happen to
    /// contain `{...}` are never expanded again.
    pub fn render(&self, context: &NegotiationContext, plan_data: Option<&Value>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut placed = BTreeSet::new();
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let name = after
                .find('}')
                .map(|close| &after[..close])
                .filter(|name| is_placeholder_name(name));

            match name {
                Some(name) => {
                    match context.get(name) {
                        Some(value) => {
                            out.push_str(value);
                            placed.insert(name);
                        }
                        None if KNOWN_FIELDS.contains(&name) => out.push_str(MISSING_VALUE),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[name.len() + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);

        let extras: Vec<_> = context
            .fields()
            .iter()
            .filter(|(key, _)| !placed.contains(key.as_str()))
            .collect();
        if !extras.is_empty() {
            out.push_str("\n\nAdditional details:\n");
            for (key, value) in extras {
                out.push_str(&format!("- {key}: {value}\n"));
            }
        }

        if let Some(plan_data) = plan_data {
            let pretty =
                serde_json::to_string_pretty(plan_data).unwrap_or_else(|_| plan_data.to_string());
            out.push_str("\n\nCurrent ISP plan data:\n");
            out.push_str(&pretty);
            out.push('\n');
        }

        out
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_form() -> NegotiationContext {
        NegotiationContext::from_iter([
            ("first_name", "John"),
            ("last_name", "Doe"),
            ("email", "john.doe@email.com"),
            ("phone", "(514) 555-0123"),
            ("isp", "bell"),
            ("account_number", "12345678"),
            ("street_address", "123 Main Street"),
            ("apartment", "4A"),
            ("city", "Montreal"),
            ("province", "Quebec"),
            ("postal_code", "H2X 1Y6"),
            (
                "situation",
                "I'd like to negotiate a better rate for my internet service package.",
            ),
        ])
    }

    #[test]
    fn test_default_template_includes_every_form_field_verbatim() {
        let context = full_form();
        let prompt = PromptTemplate::default().render(&context, None);

        for (field, value) in context.fields() {
            assert!(prompt.contains(value.as_str()), "{field} missing from prompt");
        }
        assert!(!prompt.contains("Additional details"));
        assert!(!prompt.contains(MISSING_VALUE));
    }

    #[test]
    fn test_default_template_has_a_placeholder_for_every_known_field() {
        let template = PromptTemplate::default();
        for field in KNOWN_FIELDS {
            assert!(template.as_str().contains(&format!("{{{field}}}")), "{field}");
        }
    }

    #[test]
    fn test_unknown_fields_are_appended() {
        let context = NegotiationContext::from_iter([
            ("first_name", "Jane"),
            ("current_price", "$95/month"),
        ]);
        let prompt = PromptTemplate::new("Client: {first_name}").render(&context, None);

        assert!(prompt.starts_with("Client: Jane"));
        assert!(prompt.contains("Additional details:\n- current_price: $95/month\n"));
    }

    #[test]
    fn test_missing_known_fields_are_marked() {
        let prompt = PromptTemplate::new("ISP: {isp}, unit {apartment}")
            .render(&NegotiationContext::from_iter([("isp", "rogers")]), None);
        assert_eq!(prompt, "ISP: rogers, unit not provided");
    }

    #[test]
    fn test_values_are_not_expanded_twice() {
        let context = NegotiationContext::from_iter([
            ("first_name", "{last_name}"),
            ("last_name", "Doe"),
        ]);
        let prompt = PromptTemplate::new("{first_name} {last_name}").render(&context, None);
        assert_eq!(prompt, "{last_name} Doe");
    }

    #[test]
    fn test_non_placeholder_braces_are_left_alone() {
        let template = PromptTemplate::new("Reply as {\"ok\": true} for {unknown} { isp }");
        let prompt = template.render(&NegotiationContext::default(), None);
        assert_eq!(prompt, "Reply as {\"ok\": true} for {unknown} { isp }");
    }

    #[test]
    fn test_plan_data_is_appended() {
        let plans = json!({ "plans": [{ "isp": "Videotron", "speed": "400 Mbps", "price": 60 }] });
        let prompt =
            PromptTemplate::new("Negotiate.").render(&NegotiationContext::default(), Some(&plans));

        assert!(prompt.starts_with("Negotiate.\n\nCurrent ISP plan data:\n"));
        assert!(prompt.contains("\"Videotron\""));
        assert!(prompt.contains("400 Mbps"));
    }

    #[test]
    fn test_from_file_reads_override_or_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("negotiation.md");
        assert!(PromptTemplate::from_file(&path).unwrap().is_none());

        std::fs::write(&path, "Negotiate with {isp}.").unwrap();
        let template = PromptTemplate::from_file(&path).unwrap().unwrap();
        let ctx: NegotiationContext = [("isp", "Videotron")].into_iter().collect();
        assert_eq!(template.render(&ctx, None), "Negotiate with Videotron.");
    }
}
