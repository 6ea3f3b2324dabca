//! Intersection Observer
//!
//! Observe element visibility and intersection with the viewport.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::{DOMRect, RootMargin};
use crate::NodeId;

/// Intersection observer options
#[derive(Debug, Clone)]
pub struct IntersectionObserverOptions {
    /// Margin applied to the viewport before intersecting
    pub root_margin: RootMargin,
    /// Thresholds to trigger callback
    pub threshold: Vec<f32>,
}

impl Default for IntersectionObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: RootMargin::ZERO,
            threshold: vec![0.0],
        }
    }
}

/// Intersection observer entry
#[derive(Debug, Clone)]
pub struct IntersectionObserverEntry {
    pub target: NodeId,
    pub bounding_client_rect: DOMRect,
    pub intersection_rect: DOMRect,
    pub root_bounds: DOMRect,
    pub intersection_ratio: f32,
    pub is_intersecting: bool,
    pub time: f64,
}

static NEXT_INTERSECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Intersection observer
///
/// Targets are kept ordered by node id so entries come out in a stable order.
#[derive(Debug)]
pub struct IntersectionObserver {
    id: u64,
    options: IntersectionObserverOptions,
    observed: BTreeMap<NodeId, Option<f32>>, // Last ratio
    pending_entries: Vec<IntersectionObserverEntry>,
}

impl IntersectionObserver {
    pub fn new(options: IntersectionObserverOptions) -> Self {
        Self {
            id: NEXT_INTERSECTION_ID.fetch_add(1, Ordering::Relaxed),
            options,
            observed: BTreeMap::new(),
            pending_entries: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn options(&self) -> &IntersectionObserverOptions {
        &self.options
    }

    /// Observe an element. Observing twice keeps the first observation.
    pub fn observe(&mut self, target: NodeId) {
        self.observed.entry(target).or_insert(None);
    }

    /// Stop observing
    pub fn unobserve(&mut self, target: NodeId) {
        self.observed.remove(&target);
        self.pending_entries.retain(|e| e.target != target);
    }

    /// Disconnect all
    pub fn disconnect(&mut self) {
        self.observed.clear();
        self.pending_entries.clear();
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.observed.contains_key(&target)
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    /// Check intersections
    pub fn check_intersections(
        &mut self,
        viewport: DOMRect,
        element_rects: &HashMap<NodeId, DOMRect>,
        time: f64,
    ) {
        let root = self.options.root_margin.expand(viewport);

        for (node, last_ratio) in &mut self.observed {
            let Some(rect) = element_rects.get(node) else {
                continue;
            };
            let intersection = rect.intersect(&root);
            let ratio = if rect.area() > 0.0 {
                intersection.map(|i| i.area() / rect.area()).unwrap_or(0.0)
            } else if root.contains_point(rect.x, rect.y) {
                // Zero-area targets count as fully visible when inside the root
                1.0
            } else {
                0.0
            };

            // Check if crossed threshold
            let should_notify = match *last_ratio {
                Some(lr) => self.options.threshold.iter().any(|&t| crossed(t, lr, ratio)),
                None => true,
            };

            if should_notify {
                *last_ratio = Some(ratio);

                self.pending_entries.push(IntersectionObserverEntry {
                    target: *node,
                    bounding_client_rect: *rect,
                    intersection_rect: intersection.unwrap_or_default(),
                    root_bounds: root,
                    intersection_ratio: ratio,
                    is_intersecting: ratio > 0.0,
                    time,
                });
            }
        }
    }

    /// Take pending entries
    pub fn take_entries(&mut self) -> Vec<IntersectionObserverEntry> {
        std::mem::take(&mut self.pending_entries)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_entries.is_empty()
    }
}

/// Whether moving from `last` to `ratio` crosses threshold `t`. A zero
/// threshold is crossed when the target starts or stops intersecting.
fn crossed(t: f32, last: f32, ratio: f32) -> bool {
    if t <= 0.0 {
        (last > 0.0) != (ratio > 0.0)
    } else {
        (last < t && ratio >= t) || (last >= t && ratio < t)
    }
}
