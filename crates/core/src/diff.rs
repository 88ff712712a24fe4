//! Attribute-level diffing of a planned resource change, used by drift
//! reports to distinguish purely cosmetic updates from real ones.

use infraglue_model::ResourceChange;
use serde_json::Value;

/// The result of comparing a change's `before`/`after` attribute bags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedDiff {
    /// `true` iff `before` deep-equals `after`.
    pub is_metadata_only: bool,
    /// Keys where `before[k] != after[k]` (deep), sorted for determinism.
    /// Empty when `is_metadata_only` is `true`.
    pub attribute_diffs: Vec<String>,
}

/// Compare a change's attribute bags. Terraform's parser normalises a
/// missing `before`/`after` to `None` rather than an empty object, so a
/// create or delete (where one side is `None`) is never misclassified as
/// metadata-only here.
#[must_use]
pub fn compute_detailed_diff(change: &ResourceChange) -> DetailedDiff {
    match (&change.before, &change.after) {
        (Some(Value::Object(before)), Some(Value::Object(after))) => {
            let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
            keys.sort();
            keys.dedup();

            let diffs: Vec<String> =
                keys.into_iter().filter(|k| before.get(k.as_str()) != after.get(k.as_str())).cloned().collect();

            DetailedDiff { is_metadata_only: diffs.is_empty(), attribute_diffs: diffs }
        }
        (before, after) => DetailedDiff { is_metadata_only: before == after, attribute_diffs: Vec::new() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infraglue_model::ChangeAction;
    use serde_json::json;

    fn change(before: Option<Value>, after: Option<Value>) -> ResourceChange {
        ResourceChange {
            address: "aws_s3_bucket.main".to_string(),
            resource_type: "aws_s3_bucket".to_string(),
            name: "main".to_string(),
            actions: vec![ChangeAction::Update],
            status: "pending".to_string(),
            before,
            after,
            metadata: Value::Null,
        }
    }

    #[test]
    fn identical_attribute_bags_are_metadata_only() {
        let c = change(Some(json!({"acl": "private"})), Some(json!({"acl": "private"})));
        let diff = compute_detailed_diff(&c);
        assert!(diff.is_metadata_only);
        assert!(diff.attribute_diffs.is_empty());
    }

    #[test]
    fn changed_keys_are_reported() {
        let c = change(Some(json!({"acl": "private", "versioning": false})), Some(json!({"acl": "public", "versioning": false})));
        let diff = compute_detailed_diff(&c);
        assert!(!diff.is_metadata_only);
        assert_eq!(diff.attribute_diffs, vec!["acl".to_string()]);
    }

    #[test]
    fn creation_with_no_before_is_not_metadata_only() {
        let c = change(None, Some(json!({"acl": "private"})));
        let diff = compute_detailed_diff(&c);
        assert!(!diff.is_metadata_only);
    }
}
