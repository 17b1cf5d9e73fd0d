//! Graph compiler (§4.6): producer map, adjacency, cycle detection,
//! topological order and dependency-level partitioning.
//!
//! Edges are derived purely from the producer map, not from declaration
//! order, so a pass may legally read a resource a *later*-declared pass
//! produces — which is exactly what makes a cycle across two passes
//! representable (scenario S4) rather than merely a forward-reference
//! error.

use crate::error::{RenderGraphError, Result};
use crate::handle::ResourceSlot;
use crate::resource::{ResourceState, Subresource};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug)]
pub(crate) struct ResourceAccess {
    pub resource: ResourceSlot,
    pub subresource: Subresource,
    pub state: ResourceState,
}

pub(crate) struct PassDeclaration<'a> {
    pub name: &'a str,
    pub reads: &'a [ResourceAccess],
    pub writes: &'a [ResourceAccess],
}

#[derive(Clone, Debug)]
pub struct DependencyLevel {
    pub depth: usize,
    /// Pass indices belonging to this level, in topological (== tie-broken
    /// declaration) order.
    pub passes: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct CompiledPlan {
    pub order: Vec<usize>,
    pub levels: Vec<DependencyLevel>,
}

fn expand_subresources(subresource: Subresource, count: u32) -> Vec<u32> {
    match subresource {
        Subresource::All => (0..count.max(1)).collect(),
        Subresource::Index(i) => vec![i],
    }
}

pub(crate) fn compile(
    passes: &[PassDeclaration<'_>],
    subresource_count: impl Fn(ResourceSlot) -> u32,
) -> Result<CompiledPlan> {
    let n = passes.len();

    // Step 1: producer map, built from every pass's write-set regardless of
    // declaration order. Two distinct passes claiming the same subresource
    // is a BadDeclaration; a pass reading back what it itself wrote (a
    // read-write) is not, since it remains the sole producer.
    //
    // Unordered-access writes are the one exception (S3): UAV scatter
    // writes are explicitly allowed to run unordered against each other
    // within a level, so multiple passes may all write the same UAV
    // subresource without tripping the single-producer rule. They're
    // tracked separately and a reader depends on all of them at once.
    let mut producer: HashMap<(ResourceSlot, u32), usize> = HashMap::new();
    let mut uav_writers: HashMap<(ResourceSlot, u32), Vec<usize>> = HashMap::new();
    for (pass_idx, pass) in passes.iter().enumerate() {
        for access in pass.writes {
            for sub in expand_subresources(access.subresource, subresource_count(access.resource))
            {
                let key = (access.resource, sub);
                if access.state == ResourceState::UnorderedAccess {
                    uav_writers.entry(key).or_default().push(pass_idx);
                    continue;
                }
                if let Some(&existing) = producer.get(&key) {
                    if existing != pass_idx {
                        return Err(RenderGraphError::WriteSetOverlap {
                            a: passes[existing].name.to_string(),
                            b: pass.name.to_string(),
                            resource: format!("{:?}", access.resource),
                        });
                    }
                }
                producer.insert(key, pass_idx);
            }
        }
    }

    // Step 2: adjacency from producer -> reader, deduplicated. A subresource
    // with only UAV writers makes every one of them a producer of any later
    // reader.
    let mut adjacency: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for (pass_idx, pass) in passes.iter().enumerate() {
        for access in pass.reads {
            for sub in expand_subresources(access.subresource, subresource_count(access.resource))
            {
                let key = (access.resource, sub);
                if let Some(&producer_idx) = producer.get(&key) {
                    if producer_idx != pass_idx {
                        adjacency[producer_idx].insert(pass_idx);
                    }
                    continue;
                }
                match uav_writers.get(&key) {
                    None => {
                        return Err(RenderGraphError::ReadWithoutProducer {
                            pass: pass.name.to_string(),
                            resource: format!("{:?}", access.resource),
                        })
                    }
                    Some(writers) => {
                        for &writer_idx in writers {
                            if writer_idx != pass_idx {
                                adjacency[writer_idx].insert(pass_idx);
                            }
                        }
                    }
                }
            }
        }
    }

    // Step 3: cycle detection via three-colour DFS.
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Grey,
        Black,
    }
    let mut color = vec![Color::White; n];
    let mut path: Vec<usize> = Vec::new();

    fn visit(
        node: usize,
        adjacency: &[HashSet<usize>],
        color: &mut [Color],
        path: &mut Vec<usize>,
        passes: &[PassDeclaration<'_>],
    ) -> Result<()> {
        color[node] = Color::Grey;
        path.push(node);

        let mut targets: Vec<usize> = adjacency[node].iter().copied().collect();
        targets.sort_unstable();
        for next in targets {
            match color[next] {
                Color::White => visit(next, adjacency, color, path, passes)?,
                Color::Grey => {
                    let cycle_start = path.iter().position(|&p| p == next).unwrap();
                    let mut cycle: Vec<String> =
                        path[cycle_start..].iter().map(|&i| passes[i].name.to_string()).collect();
                    cycle.push(passes[next].name.to_string());
                    return Err(RenderGraphError::CycleDetected { cycle });
                }
                Color::Black => {}
            }
        }

        path.pop();
        color[node] = Color::Black;
        Ok(())
    }

    for start in 0..n {
        if color[start] == Color::White {
            visit(start, &adjacency, &mut color, &mut path, passes)?;
        }
    }

    // Step 4: topological order via Kahn's algorithm, tie-broken by
    // declaration order so results are reproducible (invariant 2, §8).
    let mut in_degree = vec![0usize; n];
    for edges in &adjacency {
        for &target in edges {
            in_degree[target] += 1;
        }
    }

    let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    ready.sort_unstable();
    let mut order = Vec::with_capacity(n);
    let mut remaining_in_degree = in_degree.clone();

    while !ready.is_empty() {
        ready.sort_unstable();
        let next = ready.remove(0);
        order.push(next);

        let mut targets: Vec<usize> = adjacency[next].iter().copied().collect();
        targets.sort_unstable();
        for target in targets {
            remaining_in_degree[target] -= 1;
            if remaining_in_degree[target] == 0 {
                ready.push(target);
            }
        }
    }

    debug_assert_eq!(
        order.len(),
        n,
        "cycle detection above should have rejected any graph that can't be fully ordered"
    );

    // Step 5: dependency levels. depth(P) = 1 + max(depth(predecessors)).
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (pass_idx, edges) in adjacency.iter().enumerate() {
        for &target in edges {
            predecessors[target].push(pass_idx);
        }
    }

    let mut depth = vec![0usize; n];
    for &pass_idx in &order {
        let max_pred_depth = predecessors[pass_idx]
            .iter()
            .map(|&p| depth[p])
            .max()
            .map(|d| d + 1)
            .unwrap_or(0);
        depth[pass_idx] = max_pred_depth;
    }

    let max_depth = depth.iter().copied().max().unwrap_or(0);
    let mut levels: Vec<DependencyLevel> = (0..=max_depth.max(if n == 0 { 0 } else { max_depth }))
        .map(|d| DependencyLevel {
            depth: d,
            passes: Vec::new(),
        })
        .collect();
    if n == 0 {
        levels.clear();
    }
    for &pass_idx in &order {
        levels[depth[pass_idx]].passes.push(pass_idx);
    }

    Ok(CompiledPlan { order, levels })
}
