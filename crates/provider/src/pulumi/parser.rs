//! Parses a single Pulumi preview/destroy JSON document into the
//! normalised [`Plan`] model.

use infraglue_model::{ChangeAction, ChangeSummary, Output, ResourceChange};
use serde_json::Value;

/// Accumulates one plan's worth of parsed `steps`.
#[derive(Debug, Default)]
pub struct PlanAccumulator {
    pub resource_changes: Vec<ResourceChange>,
    pub outputs: Vec<Output>,
    pub change_summary: ChangeSummary,
}

impl PlanAccumulator {
    /// Parse the full JSON document emitted by `pulumi preview --json` /
    /// `pulumi destroy --preview-only --json` / `pulumi refresh --preview-only --json`.
    pub fn feed(&mut self, stdout: &str) {
        let Ok(doc) = serde_json::from_str::<Value>(stdout.trim()) else { return };

        if let Some(Value::Array(steps)) = doc.get("steps") {
            for step in steps {
                self.feed_step(step);
            }
        }

        if let Some(Value::Object(outputs)) = doc.get("outputs") {
            for (name, value) in outputs {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.outputs.push(Output { name: name.clone(), value: rendered, sensitive: false, action: None });
            }
        }
    }

    fn feed_step(&mut self, step: &Value) {
        let urn = step.get("urn").and_then(Value::as_str).unwrap_or_default();
        let (resource_type, name) = parse_urn(urn);

        let op = step.get("op").and_then(Value::as_str).unwrap_or("same");
        let actions = self.apply_op(op);

        let before = step
            .get("oldState")
            .and_then(|s| s.get("inputs"))
            .cloned()
            .filter(|v| !v.is_null());
        let after = step
            .get("newState")
            .and_then(|s| s.get("inputs"))
            .cloned()
            .or_else(|| step.get("resource").and_then(|r| r.get("properties")).cloned())
            .filter(|v| !v.is_null());

        self.resource_changes.push(ResourceChange {
            address: urn.to_string(),
            resource_type,
            name,
            actions,
            status: "pending".to_string(),
            before,
            after,
            metadata: Value::Null,
        });
    }

    fn apply_op(&mut self, op: &str) -> Vec<ChangeAction> {
        match op {
            "create" => {
                self.change_summary.add += 1;
                vec![ChangeAction::Create]
            }
            "update" => {
                self.change_summary.change += 1;
                vec![ChangeAction::Update]
            }
            "delete" => {
                self.change_summary.remove += 1;
                vec![ChangeAction::Delete]
            }
            "replace" => {
                self.change_summary.replace += 1;
                vec![ChangeAction::Replace]
            }
            "same" => vec![ChangeAction::NoOp],
            _ => Vec::new(),
        }
    }
}

/// Split a Pulumi URN on `::`; the resource type is the second-to-last
/// segment, the resource name the last.
fn parse_urn(urn: &str) -> (String, String) {
    let segments: Vec<&str> = urn.split("::").collect();
    if segments.len() < 2 {
        return (String::new(), urn.to_string());
    }
    let name = segments[segments.len() - 1].to_string();
    let resource_type = segments[segments.len() - 2].to_string();
    (resource_type, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_steps_and_outputs() {
        let stdout = r#"{
            "steps": [
                {
                    "op": "create",
                    "urn": "urn:pulumi:dev::proj::aws:s3/bucket:Bucket::main",
                    "newState": {"inputs": {"acl": "private"}}
                },
                {
                    "op": "same",
                    "urn": "urn:pulumi:dev::proj::aws:s3/bucket:Bucket::untouched"
                }
            ],
            "outputs": {"bucket_arn": "arn:aws:s3:::main"}
        }"#;

        let mut acc = PlanAccumulator::default();
        acc.feed(stdout);

        assert_eq!(acc.resource_changes.len(), 2);
        assert_eq!(acc.resource_changes[0].resource_type, "aws:s3/bucket:Bucket");
        assert_eq!(acc.resource_changes[0].name, "main");
        assert_eq!(acc.resource_changes[0].actions, vec![ChangeAction::Create]);
        assert_eq!(acc.change_summary.add, 1);

        assert_eq!(acc.outputs.len(), 1);
        assert_eq!(acc.outputs[0].value, "arn:aws:s3:::main");
    }

    #[rstest]
    #[case::full_urn("urn:pulumi:dev::proj::aws:s3/bucket:Bucket::main", "aws:s3/bucket:Bucket", "main")]
    #[case::component_child_urn("urn:pulumi:dev::proj::pkg:index:Component$aws:s3/bucket:Bucket::child", "pkg:index:Component$aws:s3/bucket:Bucket", "child")]
    #[case::short_urn_has_no_type("not-a-urn", "", "not-a-urn")]
    #[case::empty_string("", "", "")]
    fn parse_urn_splits_type_and_name(#[case] urn: &str, #[case] resource_type: &str, #[case] name: &str) {
        assert_eq!(parse_urn(urn), (resource_type.to_string(), name.to_string()));
    }

    #[rstest]
    #[case::create("create", ChangeAction::Create)]
    #[case::update("update", ChangeAction::Update)]
    #[case::delete("delete", ChangeAction::Delete)]
    #[case::replace("replace", ChangeAction::Replace)]
    #[case::same("same", ChangeAction::NoOp)]
    fn apply_op_maps_pulumi_op_to_change_action(#[case] op: &str, #[case] expected: ChangeAction) {
        let mut acc = PlanAccumulator::default();
        assert_eq!(acc.apply_op(op), vec![expected]);
    }

    #[test]
    fn unrecognised_op_produces_no_actions() {
        let mut acc = PlanAccumulator::default();
        assert!(acc.apply_op("refresh").is_empty());
    }
}
