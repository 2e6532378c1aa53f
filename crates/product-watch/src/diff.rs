//! Change detection between two document snapshots.
//!
//! Hosts that cannot observe mutations natively send whole snapshots; this
//! module derives the mutation records a native observer would have reported,
//! so relevance filtering works the same either way.

use std::collections::BTreeSet;

use scraper::ElementRef;

use crate::dom::{element_children, own_text, Document, MutationRecord, NodePath};

/// Diff two snapshots into mutation records, in document order.
///
/// Attribute records for an element come before the records of its
/// children; an element's own `ChildList` record comes after them.
pub fn diff_documents(before: &Document, after: &Document) -> Vec<MutationRecord> {
    let mut records = Vec::new();
    let (old_root, new_root) = (before.root(), after.root());

    if old_root.value().name() != new_root.value().name() {
        records.push(MutationRecord::ChildList {
            target: NodePath::root(),
            added_nodes: vec![NodePath::root()],
        });
        return records;
    }

    // Explicit work stack: page depth is host-controlled.
    let mut stack = vec![Step::Enter(old_root, new_root, NodePath::root())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(old, new, path) => enter_element(old, new, path, &mut stack, &mut records),
            Step::Leave(record) => records.push(record),
        }
    }
    records
}

enum Step<'a, 'b> {
    Enter(ElementRef<'a>, ElementRef<'b>, NodePath),
    Leave(MutationRecord),
}

fn enter_element<'a, 'b>(
    old: ElementRef<'a>,
    new: ElementRef<'b>,
    path: NodePath,
    stack: &mut Vec<Step<'a, 'b>>,
    records: &mut Vec<MutationRecord>,
) {
    for name in changed_attributes(old, new) {
        records.push(MutationRecord::Attributes {
            target: path.clone(),
            attribute_name: Some(name),
        });
    }

    let old_children: Vec<_> = element_children(old).collect();
    let new_children: Vec<_> = element_children(new).collect();

    let mut matched = Vec::new();
    let mut added = Vec::new();
    let mut removed = false;
    for index in 0..old_children.len().max(new_children.len()) {
        match (old_children.get(index), new_children.get(index)) {
            (Some(a), Some(b)) if a.value().name() == b.value().name() => {
                matched.push(Step::Enter(*a, *b, path.child(index)));
            }
            (_, Some(_)) => added.push(path.child(index)),
            (Some(_), None) => removed = true,
            (None, None) => {}
        }
    }

    let text_changed = own_text(old).trim() != own_text(new).trim();
    if !added.is_empty() || removed || text_changed {
        stack.push(Step::Leave(MutationRecord::ChildList {
            target: path,
            added_nodes: added,
        }));
    }
    stack.extend(matched.into_iter().rev());
}

/// Names of attributes added, removed, or changed between `old` and `new`.
fn changed_attributes(old: ElementRef<'_>, new: ElementRef<'_>) -> Vec<String> {
    let names: BTreeSet<&str> = old
        .value()
        .attrs()
        .chain(new.value().attrs())
        .map(|(name, _)| name)
        .collect();

    names
        .into_iter()
        .filter(|name| old.value().attr(name) != new.value().attr(name))
        .map(str::to_string)
        .collect()
}
