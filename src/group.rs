//! Grouper
//!
//! The single barrier of the pipeline: every fragment of a pass is merged by
//! identity into one grouped declaration. Scalars are first-wins in discovery
//! order, slot lists are the union.

use std::collections::HashMap;
use tracing::debug;

use crate::model::{Capability, DeclarationFragment, GroupedDeclaration, Identity, LocalNameConflict};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    /// Ordered by the first fragment of each identity.
    pub declarations: Vec<GroupedDeclaration>,
    pub conflicts: Vec<LocalNameConflict>,
}

pub fn group(fragments: &[DeclarationFragment]) -> Grouping {
    let mut grouping = Grouping::default();
    let mut index: HashMap<&Identity, usize> = HashMap::new();

    for fragment in fragments {
        let slot = *index.entry(&fragment.identity).or_insert_with(|| {
            grouping.declarations.push(GroupedDeclaration {
                identity: fragment.identity.clone(),
                capability: fragment.capability,
                shape: fragment.shape.clone(),
                local_name: None,
                slots: Vec::new(),
                original_paths: Vec::new(),
            });
            grouping.declarations.len() - 1
        });
        let declaration = &mut grouping.declarations[slot];

        if !declaration.original_paths.contains(&fragment.original_path) {
            declaration.original_paths.push(fragment.original_path.clone());
        }

        if let Some(name) = &fragment.local_name {
            match &declaration.local_name {
                None => declaration.local_name = Some(name.clone()),
                Some(kept) if kept != name => {
                    debug!(
                        declaration = %fragment.identity.full_name(),
                        kept = %kept,
                        ignored = %name,
                        path = %fragment.original_path,
                        "conflicting local name override ignored"
                    );
                    grouping.conflicts.push(LocalNameConflict {
                        identity: fragment.identity.clone(),
                        kept: kept.clone(),
                        ignored: name.clone(),
                        ignored_path: fragment.original_path.clone(),
                    });
                }
                _ => {}
            }
        }

        if fragment.capability == Capability::WebComponent {
            for slot in &fragment.slots {
                let duplicate = declaration
                    .slots
                    .iter()
                    .any(|existing| existing.property_name == slot.property_name);
                if !duplicate {
                    declaration.slots.push(slot.clone());
                }
            }
        }
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclarationShape, SlotFragment};

    fn fragment(name: &str, path: &str, local_name: Option<&str>, slots: &[&str]) -> DeclarationFragment {
        DeclarationFragment {
            identity: Identity::new("App", name),
            capability: Capability::WebComponent,
            shape: DeclarationShape::default(),
            local_name: local_name.map(str::to_string),
            source_path: path.to_string(),
            original_path: path.to_string(),
            slots: slots
                .iter()
                .map(|property| SlotFragment {
                    property_name: property.to_string(),
                    slot_name: property.to_string(),
                    root_element: None,
                    is_templated: false,
                    default_text: None,
                    value_type: "string".to_string(),
                    is_render_fragment: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_fragments_merge_by_identity() {
        let grouping = group(&[
            fragment("Toast", "Toast.razor", None, &["Title"]),
            fragment("Card", "Card.cs", None, &[]),
            fragment("Toast", "Toast.razor.cs", None, &["Message", "Title"]),
        ]);
        assert_eq!(grouping.declarations.len(), 2);
        let toast = &grouping.declarations[0];
        assert_eq!(toast.identity.name, "Toast");
        let slots: Vec<&str> = toast.slots.iter().map(|s| s.property_name.as_str()).collect();
        assert_eq!(slots, vec!["Title", "Message"]);
        assert_eq!(toast.original_paths, vec!["Toast.razor", "Toast.razor.cs"]);
        assert_eq!(grouping.declarations[1].identity.name, "Card");
    }

    #[test]
    fn test_local_name_first_wins() {
        let grouping = group(&[
            fragment("Toast", "A.cs", None, &[]),
            fragment("Toast", "B.cs", Some("x-toast-a"), &[]),
            fragment("Toast", "C.cs", Some("x-toast-b"), &[]),
            fragment("Toast", "D.cs", Some("x-toast-a"), &[]),
        ]);
        assert_eq!(grouping.declarations[0].local_name.as_deref(), Some("x-toast-a"));
        assert_eq!(
            grouping.conflicts,
            vec![LocalNameConflict {
                identity: Identity::new("App", "Toast"),
                kept: "x-toast-a".to_string(),
                ignored: "x-toast-b".to_string(),
                ignored_path: "C.cs".to_string(),
            }]
        );
    }

    #[test]
    fn test_same_name_in_other_namespace_stays_separate() {
        let mut other = fragment("Toast", "Other.cs", None, &[]);
        other.identity = Identity::new("Lib", "Toast");
        let grouping = group(&[fragment("Toast", "A.cs", None, &[]), other]);
        assert_eq!(grouping.declarations.len(), 2);
    }
}
