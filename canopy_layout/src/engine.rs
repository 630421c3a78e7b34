// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tidy tree layout pass: contour-threaded, linear time, deterministic.

use kurbo::{Point, Rect};
use rustc_hash::FxHashMap;

use canopy_hierarchy::{Hierarchy, TaxonId};

use crate::config::{FixedSizing, LayoutConfig, NodeSizing};
use crate::layout::Layout;

/// Linear-time tidy layout engine for general m-ary trees.
///
/// The algorithm is the classic two-pass tidy-tree layout generalized to
/// arbitrary child counts via contour threading and a "default ancestor"
/// (Buchheim, Jünger, Leipert 2002):
///
/// - The post-order pass assigns each node a preliminary x and resolves
///   overlap between each child subtree and its earlier siblings by walking
///   the facing contours. Threads link a contour's bottom-most node directly
///   to the node continuing that contour, skipping resolved interiors, which
///   makes each conflict resolution amortized constant time. A required
///   shift is distributed proportionally across the siblings sitting between
///   the two conflicting subtrees, keeping spacing even.
/// - The pre-order pass accumulates modifiers into absolute x; y is tree
///   depth times the configured level spacing.
///
/// Sibling order is taken from the hierarchy verbatim and never re-sorted,
/// so identical input yields bit-identical output, and structurally
/// identical subtrees come out congruent up to translation wherever they
/// are attached.
///
/// Both walks are iterative with explicit stacks; degenerate shapes (long
/// chains, one node with tens of thousands of children) go through the same
/// recurrence with no special cases.
#[derive(Clone, Debug)]
pub struct LayoutEngine<S = FixedSizing> {
    config: LayoutConfig,
    sizing: S,
}

impl LayoutEngine<FixedSizing> {
    /// Engine with the given spacing and uniform node widths.
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            sizing: FixedSizing::default(),
        }
    }
}

impl Default for LayoutEngine<FixedSizing> {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl<S: NodeSizing> LayoutEngine<S> {
    /// Engine with the given spacing and a caller-supplied sizing source.
    pub fn with_sizing(config: LayoutConfig, sizing: S) -> Self {
        Self { config, sizing }
    }

    /// The spacing configuration in effect.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out the hierarchy.
    ///
    /// A hierarchy holding only the synthetic root represents an empty scope
    /// and produces an empty [`Layout`], not an error. Output positions are
    /// translated so the bounding box origin is (0, 0).
    pub fn compute(&self, hierarchy: &Hierarchy) -> Layout {
        if hierarchy.is_empty() {
            return Layout::default();
        }

        let slots = self.flatten(hierarchy);
        let mut scratch: Vec<Scratch> = (0..slots.len()).map(Scratch::new).collect();

        self.first_walk(&slots, &mut scratch);
        let xs = second_walk(&slots, &scratch);

        // Normalize: translate so the leftmost rendered edge lands on x = 0.
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_depth = 0_u16;
        for (i, slot) in slots.iter().enumerate() {
            min_x = min_x.min(xs[i] - slot.width / 2.0);
            max_x = max_x.max(xs[i] + slot.width / 2.0);
            max_depth = max_depth.max(slot.depth);
        }

        let mut positions =
            FxHashMap::with_capacity_and_hasher(slots.len(), Default::default());
        for (i, slot) in slots.iter().enumerate() {
            let x = xs[i] - min_x;
            let y = f64::from(slot.depth) * self.config.level_spacing;
            positions.insert(slot.id, Point::new(x, y));
        }
        let bounds = Rect::new(
            0.0,
            0.0,
            max_x - min_x,
            f64::from(max_depth) * self.config.level_spacing,
        );

        Layout { positions, bounds }
    }

    /// Flatten the hierarchy into a slot arena in depth-first order.
    ///
    /// Slots carry everything the walks read; all mutable algorithm state
    /// lives in the parallel scratch arena, never on hierarchy nodes.
    fn flatten(&self, hierarchy: &Hierarchy) -> Vec<Slot> {
        let mut slots: Vec<Slot> = Vec::with_capacity(hierarchy.len());
        let mut stack = vec![(hierarchy.root(), None::<usize>)];
        while let Some((id, parent)) = stack.pop() {
            let node = hierarchy.node(id).expect("hierarchy id resolves");
            let slot = slots.len();
            let number = match parent {
                Some(p) => {
                    let number = slots[p].children.len();
                    slots[p].children.push(slot);
                    number
                }
                None => 0,
            };
            slots.push(Slot {
                id,
                parent,
                children: Vec::with_capacity(node.children.len()),
                depth: node.depth,
                number,
                width: self.sizing.width(node),
            });
            for &child in node.children.iter().rev() {
                stack.push((child, Some(slot)));
            }
        }
        slots
    }

    /// Minimum center-to-center distance between `left` and `right`.
    fn separation(&self, slots: &[Slot], left: usize, right: usize) -> f64 {
        let gap = if slots[left].parent == slots[right].parent {
            self.config.sibling_gap
        } else {
            self.config.subtree_gap
        };
        gap + (slots[left].width + slots[right].width) / 2.0
    }

    /// Post-order pass: preliminary x per node, conflicts resolved as each
    /// child subtree completes.
    fn first_walk(&self, slots: &[Slot], scratch: &mut [Scratch]) {
        #[derive(Copy, Clone)]
        struct Frame {
            v: usize,
            next_child: usize,
            default_ancestor: usize,
        }

        let mut frames = vec![Frame {
            v: 0,
            next_child: 0,
            default_ancestor: slots[0].children.first().copied().unwrap_or(0),
        }];

        loop {
            let Some(&frame) = frames.last() else { break };
            let kids = &slots[frame.v].children;
            if frame.next_child < kids.len() {
                let w = kids[frame.next_child];
                frames.push(Frame {
                    v: w,
                    next_child: 0,
                    default_ancestor: slots[w].children.first().copied().unwrap_or(w),
                });
            } else {
                self.place(slots, scratch, frame.v);
                frames.pop();
                if let Some(parent_frame) = frames.last_mut() {
                    parent_frame.default_ancestor = self.apportion(
                        slots,
                        scratch,
                        frame.v,
                        parent_frame.default_ancestor,
                    );
                    parent_frame.next_child += 1;
                }
            }
        }
    }

    /// Assign the preliminary x of `v` once all of its children are placed.
    fn place(&self, slots: &[Slot], scratch: &mut [Scratch], v: usize) {
        let kids = &slots[v].children;
        if kids.is_empty() {
            scratch[v].prelim = match left_sibling(slots, v) {
                Some(w) => scratch[w].prelim + self.separation(slots, w, v),
                None => 0.0,
            };
            return;
        }

        execute_shifts(slots, scratch, v);
        let first = kids[0];
        let last = kids[kids.len() - 1];
        let midpoint = (scratch[first].prelim + scratch[last].prelim) / 2.0;
        match left_sibling(slots, v) {
            Some(w) => {
                scratch[v].prelim = scratch[w].prelim + self.separation(slots, w, v);
                scratch[v].modifier = scratch[v].prelim - midpoint;
            }
            None => scratch[v].prelim = midpoint,
        }
    }

    /// Resolve contour conflicts between `v`'s subtree and its earlier
    /// siblings, threading contours as it goes.
    fn apportion(
        &self,
        slots: &[Slot],
        scratch: &mut [Scratch],
        v: usize,
        mut default_ancestor: usize,
    ) -> usize {
        let Some(parent) = slots[v].parent else {
            return default_ancestor;
        };
        let number = slots[v].number;
        if number == 0 {
            return default_ancestor;
        }
        let left = slots[parent].children[number - 1];

        // Contour cursors: (i)nner/(o)uter on the (m)inus/left and
        // (p)lus/right side, following the conventional naming.
        let mut vim = left;
        let mut vip = v;
        let mut vom = slots[parent].children[0];
        let mut vop = v;

        let mut sim = scratch[vim].modifier;
        let mut sip = scratch[vip].modifier;
        let mut som = scratch[vom].modifier;
        let mut sop = scratch[vop].modifier;

        loop {
            let (Some(next_im), Some(next_ip)) =
                (next_right(slots, scratch, vim), next_left(slots, scratch, vip))
            else {
                break;
            };
            vim = next_im;
            vip = next_ip;
            // Threads installed by earlier merges keep the outer contours at
            // least as deep as the inner ones.
            if let Some(next) = next_left(slots, scratch, vom) {
                vom = next;
            }
            if let Some(next) = next_right(slots, scratch, vop) {
                vop = next;
            }
            scratch[vop].ancestor = v;

            let shift = (scratch[vim].prelim + sim) - (scratch[vip].prelim + sip)
                + self.separation(slots, vim, vip);
            if shift > 0.0 {
                let moved = ancestor_of(slots, scratch, vim, v, default_ancestor);
                move_subtree(slots, scratch, moved, v, shift);
                sip += shift;
                sop += shift;
            }

            sim += scratch[vim].modifier;
            sip += scratch[vip].modifier;
            som += scratch[vom].modifier;
            sop += scratch[vop].modifier;
        }

        if next_right(slots, scratch, vim).is_some()
            && next_right(slots, scratch, vop).is_none()
        {
            scratch[vop].thread = next_right(slots, scratch, vim);
            scratch[vop].modifier += sim - sop;
        }
        if next_left(slots, scratch, vip).is_some()
            && next_left(slots, scratch, vom).is_none()
        {
            scratch[vom].thread = next_left(slots, scratch, vip);
            scratch[vom].modifier += sip - som;
            default_ancestor = v;
        }
        default_ancestor
    }
}

/// Layout slot: the immutable per-node view the walks read.
#[derive(Clone, Debug)]
struct Slot {
    id: TaxonId,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: u16,
    number: usize,
    width: f64,
}

/// Computation-local scratch, kept apart from the public data model.
/// Thread and ancestor fields are plain indices into the slot arena, never
/// owning references.
#[derive(Copy, Clone, Debug)]
struct Scratch {
    prelim: f64,
    modifier: f64,
    shift: f64,
    change: f64,
    thread: Option<usize>,
    ancestor: usize,
}

impl Scratch {
    fn new(slot: usize) -> Self {
        Self {
            prelim: 0.0,
            modifier: 0.0,
            shift: 0.0,
            change: 0.0,
            thread: None,
            ancestor: slot,
        }
    }
}

fn left_sibling(slots: &[Slot], v: usize) -> Option<usize> {
    let parent = slots[v].parent?;
    let number = slots[v].number;
    (number > 0).then(|| slots[parent].children[number - 1])
}

/// Next node on the left contour: first child, else the thread.
fn next_left(slots: &[Slot], scratch: &[Scratch], v: usize) -> Option<usize> {
    slots[v].children.first().copied().or(scratch[v].thread)
}

/// Next node on the right contour: last child, else the thread.
fn next_right(slots: &[Slot], scratch: &[Scratch], v: usize) -> Option<usize> {
    slots[v].children.last().copied().or(scratch[v].thread)
}

/// The sibling of `v` to charge for a shift: the recorded ancestor of the
/// conflicting left-contour node when it is a sibling of `v`, else the
/// default ancestor.
fn ancestor_of(
    slots: &[Slot],
    scratch: &[Scratch],
    vim: usize,
    v: usize,
    default_ancestor: usize,
) -> usize {
    let candidate = scratch[vim].ancestor;
    if slots[candidate].parent == slots[v].parent {
        candidate
    } else {
        default_ancestor
    }
}

/// Shift the subtree rooted at `wp` right by `shift`, spreading the gain
/// across the siblings between `wm` and `wp`.
fn move_subtree(slots: &[Slot], scratch: &mut [Scratch], wm: usize, wp: usize, shift: f64) {
    let subtrees = (slots[wp].number - slots[wm].number) as f64;
    debug_assert!(subtrees > 0.0, "shift target must be right of its ancestor");
    scratch[wp].change -= shift / subtrees;
    scratch[wp].shift += shift;
    scratch[wm].change += shift / subtrees;
    scratch[wp].prelim += shift;
    scratch[wp].modifier += shift;
}

/// Apply the shifts accumulated by [`move_subtree`] to the children of `v`.
fn execute_shifts(slots: &[Slot], scratch: &mut [Scratch], v: usize) {
    let mut shift = 0.0;
    let mut change = 0.0;
    for &w in slots[v].children.iter().rev() {
        scratch[w].prelim += shift;
        scratch[w].modifier += shift;
        change += scratch[w].change;
        shift += scratch[w].shift + change;
    }
}

/// Pre-order pass: absolute x per slot from preliminary x plus the modifier
/// sum accumulated along the root path.
fn second_walk(slots: &[Slot], scratch: &[Scratch]) -> Vec<f64> {
    let mut xs = vec![0.0; slots.len()];
    let mut stack = vec![(0_usize, 0.0_f64)];
    while let Some((v, modsum)) = stack.pop() {
        xs[v] = scratch[v].prelim + modsum;
        for &w in slots[v].children.iter().rev() {
            stack.push((w, modsum + scratch[v].modifier));
        }
    }
    xs
}
