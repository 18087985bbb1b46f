//! # Hierarchy Ordering — Parents Before Children
//!
//! Object states reference their parent by name. Loading a state must find
//! its parent already materialized, so states are applied in order of depth:
//!
//! ```text
//! stored: [C(parent B), A, B(parent A)]
//! depth:   C=2          A=0  B=1
//! order:  [A, B, C]
//! ```
//!
//! The sort is stable: states at equal depth keep their stored order. A parent
//! name that matches nothing counts as a root. A parent chain that loops back
//! on itself is an error rather than an endless walk.

use std::collections::HashMap;

use crate::error::{Result, SmithyError};

/// Indices of `items` sorted so every item comes after its parent.
pub fn depth_order<'a, T>(
    items: &'a [T],
    name_of: impl Fn(&'a T) -> &'a str,
    parent_of: impl Fn(&'a T) -> &'a str,
) -> Result<Vec<usize>> {
    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        by_name.entry(name_of(item)).or_insert(index);
    }

    let mut depths: Vec<Option<usize>> = vec![None; items.len()];
    for start in 0..items.len() {
        if depths[start].is_some() {
            continue;
        }
        // Walk up until a root or an already-known depth.
        let mut chain = vec![start];
        let mut base = 0;
        loop {
            let current = chain[chain.len() - 1];
            let parent = parent_of(&items[current]);
            let Some(&parent_index) = (!parent.is_empty())
                .then(|| by_name.get(parent))
                .flatten()
            else {
                break;
            };
            if let Some(known) = depths[parent_index] {
                base = known + 1;
                break;
            }
            if chain.contains(&parent_index) {
                return Err(SmithyError::HierarchyCycle(name_of(&items[start]).to_string()));
            }
            chain.push(parent_index);
        }
        for (offset, &index) in chain.iter().rev().enumerate() {
            depths[index] = Some(base + offset);
        }
    }

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| depths[i]);
    Ok(order)
}
