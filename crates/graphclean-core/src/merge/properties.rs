//! Non-destructive property merge.

use serde::{Deserialize, Serialize};

use crate::types::{EntityNode, NodeUpdate};

/// Which side's definition survives a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionChoice {
    /// Primary kept its definition (present and at least as long).
    KeptPrimary,
    /// Duplicate's definition was missing on the primary or longer.
    TookDuplicate,
    /// Neither side had one.
    NoneAvailable,
}

/// The property-merge rules that fired for one merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMergeRule {
    /// Aliases not already on the primary, including the duplicate's name.
    pub aliases_added: usize,
    /// Whether the duplicate's differing name was recorded as an alias.
    pub name_recorded_as_alias: bool,
    pub source_spans_added: usize,
    pub definition: DefinitionChoice,
    pub display_name_filled: bool,
}

impl PropertyMergeRule {
    /// Short human-readable description.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.aliases_added > 0 {
            parts.push(format!("+{} aliases", self.aliases_added));
        }
        if self.source_spans_added > 0 {
            parts.push(format!("+{} source spans", self.source_spans_added));
        }
        match self.definition {
            DefinitionChoice::TookDuplicate => parts.push("definition from duplicate".to_string()),
            DefinitionChoice::KeptPrimary => parts.push("definition kept".to_string()),
            DefinitionChoice::NoneAvailable => {}
        }
        if self.display_name_filled {
            parts.push("display name filled".to_string());
        }
        if parts.is_empty() {
            "no property changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Plan the update folding `duplicate`'s properties into `primary`.
///
/// Collections are unioned, the definition keeps the non-null then longer
/// side (ties keep the primary), and the display name is only filled when
/// the primary has none. Nothing already on the primary is removed.
pub fn plan_property_merge(primary: &EntityNode, duplicate: &EntityNode) -> (NodeUpdate, PropertyMergeRule) {
    let mut update = NodeUpdate::new(primary.id.clone());

    fn push_alias(primary: &EntityNode, alias: &str, add_aliases: &mut Vec<String>) -> bool {
        if alias.is_empty() || alias == primary.name {
            return false;
        }
        if primary.aliases.iter().any(|a| a == alias) || add_aliases.iter().any(|a| a == alias) {
            return false;
        }
        add_aliases.push(alias.to_string());
        true
    }

    let mut add_aliases: Vec<String> = Vec::new();
    let name_recorded_as_alias = push_alias(primary, &duplicate.name, &mut add_aliases);
    for alias in &duplicate.aliases {
        push_alias(primary, alias, &mut add_aliases);
    }

    let add_spans: Vec<String> = duplicate
        .source_spans
        .iter()
        .filter(|span| !primary.source_spans.contains(span))
        .fold(Vec::new(), |mut acc, span| {
            if !acc.contains(span) {
                acc.push(span.clone());
            }
            acc
        });

    let definition = match (primary.definition_text(), duplicate.definition_text()) {
        (None, None) => DefinitionChoice::NoneAvailable,
        (None, Some(dup)) => {
            update.definition = Some(dup.to_string());
            DefinitionChoice::TookDuplicate
        }
        (Some(_), None) => DefinitionChoice::KeptPrimary,
        (Some(kept), Some(dup)) => {
            if dup.chars().count() > kept.chars().count() {
                update.definition = Some(dup.to_string());
                DefinitionChoice::TookDuplicate
            } else {
                DefinitionChoice::KeptPrimary
            }
        }
    };

    let display_name_filled = primary.display_name.is_none() && duplicate.display_name.is_some();
    if display_name_filled {
        update.display_name = duplicate.display_name.clone();
    }

    let rule = PropertyMergeRule {
        aliases_added: add_aliases.len(),
        name_recorded_as_alias,
        source_spans_added: add_spans.len(),
        definition,
        display_name_filled,
    };
    update.add_aliases = add_aliases;
    update.add_source_spans = add_spans;
    (update, rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityLabel;

    #[test]
    fn test_collections_are_unioned() {
        let primary = EntityNode::new("p", EntityLabel::Standard, "iso 26262")
            .with_aliases(["ISO26262"])
            .with_source_spans(["span-1", "span-2"]);
        let dup = EntityNode::new("d", EntityLabel::Standard, "ISO 26262")
            .with_aliases(["ISO26262", "iso-26262"])
            .with_source_spans(["span-2", "span-3"]);

        let (update, rule) = plan_property_merge(&primary, &dup);
        assert_eq!(update.add_aliases, vec!["ISO 26262", "iso-26262"]);
        assert_eq!(update.add_source_spans, vec!["span-3"]);
        assert!(rule.name_recorded_as_alias);
        assert_eq!(rule.aliases_added, 2);

        let aliases_after = primary.aliases.len() + update.add_aliases.len();
        assert!(aliases_after >= primary.aliases.len().max(dup.aliases.len()));
    }

    #[test]
    fn test_identical_name_not_aliased() {
        let primary = EntityNode::new("p", EntityLabel::Concept, "traceability");
        let dup = EntityNode::new("d", EntityLabel::Challenge, "traceability");
        let (update, rule) = plan_property_merge(&primary, &dup);
        assert!(update.add_aliases.is_empty());
        assert!(!rule.name_recorded_as_alias);
        assert!(update.is_empty());
        assert_eq!(rule.describe(), "no property changes");
    }

    #[test]
    fn test_definition_prefers_non_null_then_longer() {
        let bare = EntityNode::new("p", EntityLabel::Concept, "x");
        let short = EntityNode::new("d", EntityLabel::Concept, "x").with_definition("short");
        let long = EntityNode::new("e", EntityLabel::Concept, "x").with_definition("a much longer one");

        let (update, rule) = plan_property_merge(&bare, &short);
        assert_eq!(update.definition.as_deref(), Some("short"));
        assert_eq!(rule.definition, DefinitionChoice::TookDuplicate);

        let (update, rule) = plan_property_merge(&long, &short);
        assert_eq!(update.definition, None);
        assert_eq!(rule.definition, DefinitionChoice::KeptPrimary);

        let (update, _) = plan_property_merge(&short, &long);
        assert_eq!(update.definition.as_deref(), Some("a much longer one"));

        let same = EntityNode::new("f", EntityLabel::Concept, "x").with_definition("equal");
        let (update, rule) = plan_property_merge(&short, &same);
        assert_eq!(update.definition, None);
        assert_eq!(rule.definition, DefinitionChoice::KeptPrimary);
    }

    #[test]
    fn test_display_name_only_filled_when_unset() {
        let primary = EntityNode::new("p", EntityLabel::Tool, "doors");
        let dup = EntityNode::new("d", EntityLabel::Tool, "doors").with_display_name("DOORS");
        let (update, rule) = plan_property_merge(&primary, &dup);
        assert_eq!(update.display_name.as_deref(), Some("DOORS"));
        assert!(rule.display_name_filled);

        let primary = primary.with_display_name("Doors");
        let (update, _) = plan_property_merge(&primary, &dup);
        assert_eq!(update.display_name, None);
    }
}
