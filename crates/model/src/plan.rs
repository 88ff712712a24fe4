//! Normalised plan model shared by every provider.

use serde::{Deserialize, Serialize};

use crate::workspace::ProviderKind;

/// A single resource-level action a provider plans to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    /// The resource will be created.
    Create,
    /// The resource will be updated in place.
    Update,
    /// The resource will be deleted.
    Delete,
    /// The resource will be replaced (destroy + create).
    Replace,
    /// No operation; the resource is unchanged.
    NoOp,
}

/// One resource the provider would touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    /// The provider-specific resource address (Terraform addr, Pulumi URN-derived name).
    pub address: String,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Non-empty ordered list of actions.
    pub actions: Vec<ChangeAction>,
    /// Free-form status tag (`"pending"` for freshly parsed plans).
    pub status: String,
    /// Attribute bag before the change; `None` for creation-like changes.
    pub before: Option<serde_json::Value>,
    /// Attribute bag after the change; `None` for deletion-like changes.
    pub after: Option<serde_json::Value>,
    /// Free-form provider-specific metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// How an output changed between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputAction {
    /// The output is new.
    Added,
    /// The output's value changed.
    Updated,
    /// The output was removed.
    Deleted,
}

/// A single planned/applied output value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Output name.
    pub name: String,
    /// Output value; structured values are JSON-encoded at the provider boundary.
    pub value: String,
    /// Whether the provider marked this output sensitive.
    pub sensitive: bool,
    /// How this output changed, if the parser could classify it.
    pub action: Option<OutputAction>,
}

/// A diagnostic message surfaced by the provider's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity tag (`error`, `warning`, ...).
    pub severity: String,
    /// One-line summary.
    pub summary: String,
    /// Full detail text.
    pub detail: String,
    /// Resource address this diagnostic is about, if any.
    pub address: Option<String>,
}

/// Aggregate counts of planned resource/output changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Resources to be created.
    pub add: u32,
    /// Resources to be updated in place.
    pub change: u32,
    /// Resources to be removed.
    pub remove: u32,
    /// Resources to be replaced.
    pub replace: u32,
    /// Outputs added, updated or removed.
    pub output_updates: u32,
}

/// The normalised result of a provider plan/apply/drift call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Which provider produced this plan.
    pub provider: ProviderKind,
    /// The provider's project/stack name.
    pub project_name: String,
    /// When the provider produced this plan.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Ordered resource-level changes.
    pub resource_changes: Vec<ResourceChange>,
    /// Ordered outputs.
    pub outputs: Vec<Output>,
    /// Ordered diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Aggregate change counts.
    pub change_summary: ChangeSummary,
    /// Raw provider-specific metadata (carries the unparsed tool output).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Plan {
    /// Whether this plan represents any change at all.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        let s = &self.change_summary;
        s.add > 0 || s.change > 0 || s.remove > 0 || s.replace > 0 || s.output_updates > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_plan(provider: ProviderKind) -> Plan {
        Plan {
            provider,
            project_name: "demo".to_string(),
            timestamp: chrono::Utc::now(),
            resource_changes: vec![],
            outputs: vec![],
            diagnostics: vec![],
            change_summary: ChangeSummary::default(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn all_zero_summary_has_no_changes() {
        let plan = empty_plan(ProviderKind::Terraform);
        assert!(!plan.has_changes());
    }

    #[test]
    fn any_nonzero_counter_has_changes() {
        let mut plan = empty_plan(ProviderKind::Pulumi);
        plan.change_summary.output_updates = 1;
        assert!(plan.has_changes());
    }
}
