//! Dependency ordering of subtasks
//!
//! Topological sort over prerequisite edges. Ties break towards the
//! original listing order so plans are deterministic, and unresolvable
//! graphs (cycles, dangling references) degrade to listed order rather
//! than failing the plan.

use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::warn;

use crate::domain::Subtask;

/// Order subtask indices so every prerequisite precedes its dependents
///
/// Prerequisite references resolve by id first, then by title (the
/// decomposer keeps unresolved titles verbatim). References matching
/// nothing are ignored as edges. If a cycle remains after Kahn's
/// algorithm, the leftover subtasks are appended in listed order.
pub fn dependency_order(subtasks: &[Subtask]) -> Vec<usize> {
    let index_of: HashMap<&str, usize> = subtasks.iter().enumerate().map(|(i, s)| (s.id.as_str(), i)).collect();
    let by_title: HashMap<String, usize> = subtasks
        .iter()
        .enumerate()
        .map(|(i, s)| (s.title.trim().to_lowercase(), i))
        .collect();

    // dependents[i] lists indices that require subtask i first
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); subtasks.len()];
    let mut in_degree: Vec<usize> = vec![0; subtasks.len()];

    for (i, subtask) in subtasks.iter().enumerate() {
        let mut seen: HashSet<usize> = HashSet::new();
        for prereq in &subtask.prerequisites {
            let resolved = index_of
                .get(prereq.as_str())
                .or_else(|| by_title.get(&prereq.trim().to_lowercase()));
            if let Some(&p) = resolved
                && p != i
                && seen.insert(p)
            {
                dependents[p].push(i);
                in_degree[i] += 1;
            }
        }
    }

    // Min-heap on index keeps listed order among ready subtasks
    let mut ready: BinaryHeap<std::cmp::Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| std::cmp::Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(subtasks.len());
    while let Some(std::cmp::Reverse(i)) = ready.pop() {
        order.push(i);
        for &dep in &dependents[i] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                ready.push(std::cmp::Reverse(dep));
            }
        }
    }

    if order.len() < subtasks.len() {
        warn!(
            remaining = subtasks.len() - order.len(),
            "dependency_order: cycle detected, appending leftover subtasks in listed order"
        );
        let placed: HashSet<usize> = order.iter().copied().collect();
        order.extend((0..subtasks.len()).filter(|i| !placed.contains(i)));
    }

    order
}
