//! Parses Terraform's newline-delimited JSON log into the normalised
//! [`Plan`] model.

use infraglue_model::{ChangeAction, ChangeSummary, Diagnostic, Output, OutputAction, ResourceChange};
use serde_json::Value;

/// Accumulates one plan's worth of parsed NDJSON lines.
#[derive(Debug, Default)]
pub struct PlanAccumulator {
    pub resource_changes: Vec<ResourceChange>,
    pub outputs: Vec<Output>,
    pub diagnostics: Vec<Diagnostic>,
    pub change_summary: ChangeSummary,
}

impl PlanAccumulator {
    /// Feed the full stdout of a `terraform plan --json`/`apply --json` run,
    /// one JSON object per line. Malformed or blank lines are skipped;
    /// unrecognised `type`s are ignored per the streaming contract.
    pub fn feed(&mut self, stdout: &str) {
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(value) = serde_json::from_str::<Value>(line) else {
                continue;
            };
            self.feed_value(&value);
        }
    }

    fn feed_value(&mut self, value: &Value) {
        match value.get("type").and_then(Value::as_str) {
            Some("planned_change") => self.feed_planned_change(value),
            Some("outputs") => self.feed_outputs(value),
            Some("change_summary") => self.feed_change_summary(value),
            Some("diagnostic") => self.feed_diagnostic(value),
            _ => {}
        }
    }

    fn feed_planned_change(&mut self, value: &Value) {
        let Some(change) = value.get("change") else { return };
        let Some(resource) = change.get("resource") else { return };

        let address = resource.get("addr").and_then(Value::as_str).unwrap_or_default().to_string();
        let resource_type = resource.get("resource_type").and_then(Value::as_str).unwrap_or_default().to_string();
        let name = resource.get("resource_name").and_then(Value::as_str).unwrap_or_default().to_string();
        let action = parse_change_action(change.get("action").and_then(Value::as_str).unwrap_or("no-op"));

        self.resource_changes.push(ResourceChange {
            address,
            resource_type,
            name,
            actions: vec![action],
            status: "pending".to_string(),
            before: change.get("before").cloned().filter(|v| !v.is_null()),
            after: change.get("after").cloned().filter(|v| !v.is_null()),
            metadata: Value::Null,
        });
    }

    fn feed_outputs(&mut self, value: &Value) {
        let Some(Value::Object(outputs)) = value.get("outputs") else { return };

        for (name, entry) in outputs {
            let value = entry.get("value").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            let sensitive = entry.get("sensitive").and_then(Value::as_bool).unwrap_or(false);
            let action = entry.get("action").and_then(Value::as_str).and_then(|a| match a {
                "create" => Some(OutputAction::Added),
                "update" => Some(OutputAction::Updated),
                "delete" => Some(OutputAction::Deleted),
                _ => None,
            });

            if action.is_some() {
                self.change_summary.output_updates += 1;
            }

            self.outputs.push(Output {
                name: name.clone(),
                value: value.unwrap_or_else(|| "TO_BE_DEFINED".to_string()),
                sensitive,
                action,
            });
        }
    }

    fn feed_change_summary(&mut self, value: &Value) {
        let Some(changes) = value.get("changes") else { return };
        self.change_summary.add = field_as_u32(changes, "add");
        self.change_summary.change = field_as_u32(changes, "change");
        self.change_summary.remove = field_as_u32(changes, "remove");
        self.change_summary.replace = field_as_u32(changes, "replace");
    }

    fn feed_diagnostic(&mut self, value: &Value) {
        let Some(diag) = value.get("diagnostic") else { return };
        self.diagnostics.push(Diagnostic {
            severity: diag.get("severity").and_then(Value::as_str).unwrap_or_default().to_string(),
            summary: diag.get("summary").and_then(Value::as_str).unwrap_or_default().to_string(),
            detail: diag.get("detail").and_then(Value::as_str).unwrap_or_default().to_string(),
            address: diag.get("address").and_then(Value::as_str).map(str::to_string),
        });
    }
}

fn field_as_u32(value: &Value, field: &str) -> u32 {
    u32::try_from(value.get(field).and_then(Value::as_u64).unwrap_or(0)).unwrap_or(u32::MAX)
}

fn parse_change_action(action: &str) -> ChangeAction {
    match action {
        "create" => ChangeAction::Create,
        "update" => ChangeAction::Update,
        "delete" => ChangeAction::Delete,
        "replace" => ChangeAction::Replace,
        _ => ChangeAction::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_planned_change_outputs_and_summary() {
        let stdout = concat!(
            r#"{"type":"planned_change","change":{"resource":{"addr":"aws_s3_bucket.main","resource_type":"aws_s3_bucket","resource_name":"main"},"action":"create","before":null,"after":{"acl":"private"}}}"#,
            "\n",
            r#"{"type":"outputs","outputs":{"bucket_arn":{"value":"arn:aws:s3:::main","sensitive":false,"action":"create"}}}"#,
            "\n",
            r#"{"type":"change_summary","changes":{"add":1,"change":0,"remove":0,"replace":0}}"#,
            "\n",
            r#"{"type":"diagnostic","diagnostic":{"severity":"warning","summary":"deprecated argument","detail":"use x instead","address":"aws_s3_bucket.main"}}"#,
            "\n",
            r#"{"type":"unrelated_noise"}"#,
        );

        let mut acc = PlanAccumulator::default();
        acc.feed(stdout);

        assert_eq!(acc.resource_changes.len(), 1);
        assert_eq!(acc.resource_changes[0].actions, vec![ChangeAction::Create]);
        assert_eq!(acc.resource_changes[0].address, "aws_s3_bucket.main");
        assert!(acc.resource_changes[0].before.is_none());

        assert_eq!(acc.outputs.len(), 1);
        assert_eq!(acc.outputs[0].action, Some(OutputAction::Added));
        assert_eq!(acc.change_summary.output_updates, 1);
        assert_eq!(acc.change_summary.add, 1);

        assert_eq!(acc.diagnostics.len(), 1);
        assert_eq!(acc.diagnostics[0].severity, "warning");
    }

    #[rstest]
    #[case::missing_value_falls_back_to_placeholder(r#"{"k":{}}"#, "k", "TO_BE_DEFINED")]
    #[case::string_value_passes_through(r#"{"k":{"value":"arn:aws:s3:::main"}}"#, "k", "arn:aws:s3:::main")]
    #[case::object_value_is_json_encoded(r#"{"k":{"value":{"env":"prod","team":"infra"}}}"#, "k", r#"{"env":"prod","team":"infra"}"#)]
    #[case::array_value_is_json_encoded(r#"{"k":{"value":["a","b","c"]}}"#, "k", r#"["a","b","c"]"#)]
    #[case::number_value_is_json_encoded(r#"{"k":{"value":3}}"#, "k", "3")]
    #[case::bool_value_is_json_encoded(r#"{"k":{"value":true}}"#, "k", "true")]
    fn feed_outputs_renders_every_terraform_value_shape(
        #[case] outputs_body: &str,
        #[case] name: &str,
        #[case] expected: &str,
    ) {
        let stdout = format!(r#"{{"type":"outputs","outputs":{outputs_body}}}"#);
        let mut acc = PlanAccumulator::default();
        acc.feed(&stdout);
        assert_eq!(acc.outputs.iter().find(|o| o.name == name).unwrap().value, expected);
    }

    #[test]
    fn missing_value_does_not_count_as_an_output_update() {
        let stdout = r#"{"type":"outputs","outputs":{"k":{}}}"#;
        let mut acc = PlanAccumulator::default();
        acc.feed(stdout);
        assert!(acc.outputs[0].action.is_none());
        assert_eq!(acc.change_summary.output_updates, 0);
    }
}
