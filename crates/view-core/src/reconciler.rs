//! Patches one view sub-tree into another: attribute patching on re-render, and the keyed-list
//! move algorithm (spec §4.10).
//!
//! The keyed-list diff here is a fresh O(n log n) Longest Increasing Subsequence implementation,
//! *not* a port of the grounding corpus's `reconcile_fragments` (`render.rs`), which is a
//! different common-prefix/suffix + hashmap-fallback heuristic. Per `SPEC_FULL.md`'s resolved
//! Open Question, LIS is the sole authoritative algorithm for this runtime.

use hashbrown::HashMap;

use crate::renderer::HostRenderer;
use crate::view::ViewNode;

/// Diffs `old` keyed children against `new_keys`/`new_children` (same length, index-aligned) and
/// mounts/moves/disposes so that `parent`'s host children end up matching `new_children` in
/// order, using `anchor` as the element that must remain the next sibling after the last new
/// child (e.g. a fragment's end-marker comment).
///
/// Returns the new ordered `(key, view)` pairs to store on the `ListNode`.
pub fn reconcile_keyed_list<R: HostRenderer>(
    renderer: &R,
    parent: &R::Node,
    old: Vec<(u64, ViewNode<R>)>,
    new_keys: Vec<u64>,
    mut build: impl FnMut(u64) -> ViewNode<R>,
    anchor: Option<&R::Node>,
) -> Vec<(u64, ViewNode<R>)> {
    let mut old_index_by_key: HashMap<u64, usize> = HashMap::with_capacity(old.len());
    for (i, (key, _)) in old.iter().enumerate() {
        old_index_by_key.entry(*key).or_insert(i);
    }

    // source_index[j] = position of new_keys[j] in `old`, or None if this is a fresh key.
    let source_index: Vec<Option<usize>> =
        new_keys.iter().map(|key| old_index_by_key.get(key).copied()).collect();

    let lis = longest_increasing_subsequence(&source_index);

    // Carry over existing views by key, leaving fresh slots to be built lazily below.
    let mut old_views: Vec<Option<ViewNode<R>>> = old.into_iter().map(|(_, v)| Some(v)).collect();
    let mut new_children: Vec<Option<ViewNode<R>>> = vec![None; new_keys.len()];
    for (j, src) in source_index.iter().enumerate() {
        if let Some(i) = src {
            new_children[j] = old_views[*i].take();
        }
    }

    // Anything left in `old_views` had no surviving key; dispose it.
    for view in old_views.into_iter().flatten() {
        view.dispose();
    }

    // Reverse iteration with a running anchor: positions in the LIS are already correctly
    // placed and only advance the anchor; everything else is created (fresh key) or moved
    // (stale position) before the anchor.
    let mut lis_cursor = lis.len();
    let mut running_anchor: Option<R::Node> = anchor.cloned();

    for j in (0..new_keys.len()).rev() {
        let in_lis = lis_cursor > 0 && lis[lis_cursor - 1] == j;
        let view = match new_children[j].take() {
            Some(view) => view,
            None => {
                let view = build(new_keys[j]);
                view.init();
                match &running_anchor {
                    Some(a) => view.mount(parent, crate::view::MountMode::Insert(a.clone())),
                    None => view.mount(parent, crate::view::MountMode::Append),
                }
                view
            }
        };

        if in_lis {
            lis_cursor -= 1;
        } else if source_index[j].is_some() {
            // Existing view, stale position: move its host nodes before the anchor.
            for node in view.flatten() {
                renderer.insert(parent, &node, running_anchor.as_ref());
            }
        }

        running_anchor = view.flatten().into_iter().next().or(running_anchor);
        new_children[j] = Some(view);
    }

    new_keys.into_iter().zip(new_children.into_iter().map(|v| v.expect("filled above"))).collect()
}

/// O(n log n) Longest Increasing Subsequence over `Option<usize>`, ignoring `None` entries
/// (fresh keys, spec's `sourceIndex == -1`). Returns the indices into `values` that form the LIS,
/// in ascending order, via binary search plus a predecessor array for backtracking.
fn longest_increasing_subsequence(values: &[Option<usize>]) -> Vec<usize> {
    // `tails[k]` holds the index (into `values`) of the smallest tail value of an increasing
    // subsequence of length k+1 found so far.
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessors: Vec<Option<usize>> = vec![None; values.len()];

    for (i, value) in values.iter().enumerate() {
        let Some(value) = value else { continue };

        // Binary search for the first tail whose value is >= `value`.
        let pos = tails.partition_point(|&t| values[t].unwrap() < *value);

        if pos > 0 {
            predecessors[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        result.push(i);
        cursor = predecessors[i];
    }
    result.reverse();
    result
}

/// Whether `a` and `b` are both elements with the same tag — the condition under which a
/// `Dynamic` rerun can swap the host node in place (`MountMode::Replace`) instead of fully
/// disposing the old view and inserting the new one at a fresh anchor position.
pub fn same_element<R: HostRenderer>(a: &ViewNode<R>, b: &ViewNode<R>) -> bool {
    match (a, b) {
        (ViewNode::Element(a), ViewNode::Element(b)) => a.tag() == b.tag(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lis_keeps_ascending_run_and_moves_the_rest() {
        // old [A,B,C,D] -> new [D,A,B,C]: only D's source index (3) breaks the ascending run of
        // A,B,C (0,1,2), so the LIS is exactly {A,B,C} and D is the sole move.
        let source_index = vec![Some(3), Some(0), Some(1), Some(2)];
        let lis = longest_increasing_subsequence(&source_index);
        assert_eq!(lis, vec![1, 2, 3]);
    }

    #[test]
    fn fresh_keys_are_excluded_from_the_subsequence() {
        let source_index = vec![Some(0), None, Some(1)];
        let lis = longest_increasing_subsequence(&source_index);
        assert_eq!(lis, vec![0, 2]);
    }

    #[test]
    fn empty_input_has_empty_lis() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
    }
}
