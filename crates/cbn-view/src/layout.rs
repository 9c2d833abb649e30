//! Built-in force-directed layout
//!
//! A deterministic simulation with:
//! - Pairwise repulsion (inverse square)
//! - Edge springs toward a rest length
//! - Gravity toward the origin
//! - Velocity damping and clamping
//!
//! Identical inputs always yield identical positions. New nodes start near
//! the centroid of already placed neighbours, or on a golden-angle spiral
//! when they have none.

use crate::surface::{GraphSurface, Stabilization};
use crate::types::{Position, ViewEdge, ViewNode, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const MIN_DISTANCE: f64 = 0.01;
const FIT_PADDING: f64 = 50.0;

/// Layout tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Spring rest length
    pub spring_length: f64,
    /// Spring stiffness
    pub spring_strength: f64,
    /// Repulsion constant
    pub repulsion: f64,
    /// Pull toward the origin
    pub gravity: f64,
    /// Velocity retained per iteration (0..1)
    pub damping: f64,
    /// Per-iteration speed cap
    pub max_velocity: f64,
    /// Iteration cap for one stabilization
    pub max_iterations: usize,
    /// Largest movement that counts as settled
    pub convergence_threshold: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            spring_length: 120.0,
            spring_strength: 0.04,
            repulsion: 8_000.0,
            gravity: 0.01,
            damping: 0.6,
            max_velocity: 50.0,
            max_iterations: 1_000,
            convergence_threshold: 0.05,
        }
    }
}

impl ViewConfig {
    /// With spring rest length
    #[must_use]
    pub fn with_spring_length(mut self, length: f64) -> Self {
        self.spring_length = length;
        self
    }

    /// With iteration cap
    #[must_use]
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// With convergence threshold
    #[must_use]
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone)]
struct Body {
    id: String,
    position: Position,
    velocity: (f64, f64),
    anchored: bool,
    placed: bool,
}

/// Deterministic force-directed [`GraphSurface`]
#[derive(Debug, Clone, Default)]
pub struct ForceLayout {
    config: ViewConfig,
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    springs: Vec<(usize, usize)>,
    physics: bool,
    built: bool,
    viewport: Viewport,
}

impl ForceLayout {
    /// Create with config
    #[must_use]
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Layout config
    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Last fitted viewport
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn spiral(&self, i: usize, radius_scale: f64) -> Position {
        #[allow(clippy::cast_precision_loss)]
        let k = i as f64;
        let radius = self.config.spring_length * radius_scale * (k + 1.0).sqrt();
        let angle = k * GOLDEN_ANGLE;
        Position::new(radius * angle.cos(), radius * angle.sin())
    }

    /// Give every unplaced body a starting point
    fn seed_unplaced(&mut self) {
        for i in 0..self.bodies.len() {
            if self.bodies[i].placed {
                continue;
            }

            let mut sum = (0.0, 0.0);
            let mut count = 0u32;
            for &(a, b) in &self.springs {
                let other = match (a == i, b == i) {
                    (true, false) => b,
                    (false, true) => a,
                    _ => continue,
                };
                if self.bodies[other].placed {
                    sum.0 += self.bodies[other].position.x;
                    sum.1 += self.bodies[other].position.y;
                    count += 1;
                }
            }

            let position = if count > 0 {
                let offset = self.spiral(i, 0.25);
                let n = f64::from(count);
                Position::new(sum.0 / n + offset.x, sum.1 / n + offset.y)
            } else {
                self.spiral(i, 0.5)
            };

            let body = &mut self.bodies[i];
            body.position = position;
            body.placed = true;
        }
    }

    /// One simulation step; returns the largest movement
    fn tick(&mut self) -> f64 {
        let n = self.bodies.len();
        let mut forces = vec![(0.0_f64, 0.0_f64); n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (mut dx, mut dy) = (
                    self.bodies[j].position.x - self.bodies[i].position.x,
                    self.bodies[j].position.y - self.bodies[i].position.y,
                );
                if dx.hypot(dy) < MIN_DISTANCE {
                    // Coincident: separate along a fixed direction
                    #[allow(clippy::cast_precision_loss)]
                    let spread = (j - i) as f64;
                    dx = MIN_DISTANCE * spread;
                    dy = MIN_DISTANCE;
                }
                let dist_sq = dx * dx + dy * dy;
                let dist = dist_sq.sqrt();
                let f = self.config.repulsion / dist_sq;
                let (fx, fy) = (f * dx / dist, f * dy / dist);
                forces[i].0 -= fx;
                forces[i].1 -= fy;
                forces[j].0 += fx;
                forces[j].1 += fy;
            }
        }

        for &(a, b) in &self.springs {
            let dx = self.bodies[b].position.x - self.bodies[a].position.x;
            let dy = self.bodies[b].position.y - self.bodies[a].position.y;
            let dist = dx.hypot(dy).max(MIN_DISTANCE);
            let f = self.config.spring_strength * (dist - self.config.spring_length);
            let (fx, fy) = (f * dx / dist, f * dy / dist);
            forces[a].0 += fx;
            forces[a].1 += fy;
            forces[b].0 -= fx;
            forces[b].1 -= fy;
        }

        let mut largest = 0.0_f64;
        for (body, (fx, fy)) in self.bodies.iter_mut().zip(forces) {
            if body.anchored {
                body.velocity = (0.0, 0.0);
                continue;
            }
            let fx = fx - self.config.gravity * body.position.x;
            let fy = fy - self.config.gravity * body.position.y;

            let mut vx = (body.velocity.0 + fx) * self.config.damping;
            let mut vy = (body.velocity.1 + fy) * self.config.damping;
            let speed = vx.hypot(vy);
            if speed > self.config.max_velocity {
                let scale = self.config.max_velocity / speed;
                vx *= scale;
                vy *= scale;
            }

            let next = Position::new(body.position.x + vx, body.position.y + vy);
            if next.is_finite() {
                largest = largest.max(vx.hypot(vy));
                body.position = next;
                body.velocity = (vx, vy);
            } else {
                body.velocity = (0.0, 0.0);
            }
        }

        largest
    }
}

impl GraphSurface for ForceLayout {
    fn build(&mut self, nodes: &[ViewNode], edges: &[ViewEdge]) {
        self.bodies = nodes
            .iter()
            .map(|node| Body {
                id: node.id.clone(),
                position: Position::default(),
                velocity: (0.0, 0.0),
                anchored: false,
                placed: false,
            })
            .collect();
        self.index = self
            .bodies
            .iter()
            .enumerate()
            .map(|(i, body)| (body.id.clone(), i))
            .collect();
        // Self-loops and unknown endpoints exert no spring force
        self.springs = edges
            .iter()
            .filter_map(|edge| {
                let a = *self.index.get(&edge.from)?;
                let b = *self.index.get(&edge.to)?;
                (a != b).then_some((a, b))
            })
            .collect();
        for i in 0..self.bodies.len() {
            self.bodies[i].position = self.spiral(i, 0.5);
        }
        self.built = true;
    }

    fn destroy(&mut self) {
        self.bodies.clear();
        self.index.clear();
        self.springs.clear();
        self.built = false;
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn positions(&self) -> BTreeMap<String, Position> {
        self.bodies
            .iter()
            .filter(|body| body.placed)
            .map(|body| (body.id.clone(), body.position))
            .collect()
    }

    fn place(&mut self, id: &str, position: Position, anchored: bool) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let body = &mut self.bodies[i];
        body.position = position;
        body.velocity = (0.0, 0.0);
        body.anchored = anchored;
        body.placed = true;
        true
    }

    fn release_anchors(&mut self) {
        for body in &mut self.bodies {
            body.anchored = false;
        }
    }

    fn set_physics(&mut self, enabled: bool) {
        self.physics = enabled;
    }

    fn physics_enabled(&self) -> bool {
        self.physics
    }

    fn stabilize(&mut self) -> Stabilization {
        self.seed_unplaced();
        if !self.physics {
            return Stabilization {
                iterations: 0,
                converged: true,
            };
        }

        for iteration in 1..=self.config.max_iterations {
            if self.tick() < self.config.convergence_threshold {
                return Stabilization {
                    iterations: iteration,
                    converged: true,
                };
            }
        }
        Stabilization {
            iterations: self.config.max_iterations,
            converged: false,
        }
    }

    fn fit(&mut self) -> Viewport {
        let mut bodies = self.bodies.iter().filter(|b| b.placed).map(|b| b.position);
        let Some(first) = bodies.next() else {
            self.viewport = Viewport::default();
            return self.viewport;
        };
        let (mut min, mut max) = (first, first);
        for p in bodies {
            min = Position::new(min.x.min(p.x), min.y.min(p.y));
            max = Position::new(max.x.max(p.x), max.y.max(p.y));
        }
        self.viewport = Viewport {
            center: Position::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0),
            width: max.x - min.x + 2.0 * FIT_PADDING,
            height: max.y - min.y + 2.0 * FIT_PADDING,
        };
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(n: usize, edges: &[(usize, usize)]) -> (Vec<ViewNode>, Vec<ViewEdge>) {
        let nodes = (0..n)
            .map(|i| ViewNode {
                id: format!("n{i}"),
                label: format!("Node {i}"),
                group: "Social".to_string(),
                title: None,
            })
            .collect();
        let edges = edges
            .iter()
            .enumerate()
            .map(|(i, (a, b))| ViewEdge {
                id: format!("e{i}"),
                from: format!("n{a}"),
                to: format!("n{b}"),
                label: None,
            })
            .collect();
        (nodes, edges)
    }

    fn settled(edges: &[(usize, usize)], n: usize) -> ForceLayout {
        let (nodes, edges) = elements(n, edges);
        let mut layout = ForceLayout::new(ViewConfig::default());
        layout.build(&nodes, &edges);
        layout.set_physics(true);
        layout.stabilize();
        layout
    }

    #[test]
    fn stabilization_is_deterministic() {
        let a = settled(&[(0, 1), (1, 2), (2, 0)], 4);
        let b = settled(&[(0, 1), (1, 2), (2, 0)], 4);
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn stabilization_converges_and_separates_nodes() {
        let (nodes, edges) = elements(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let mut layout = ForceLayout::new(ViewConfig::default());
        layout.build(&nodes, &edges);
        layout.set_physics(true);
        let result = layout.stabilize();

        assert!(result.converged);
        let positions: Vec<Position> = layout.positions().into_values().collect();
        for (i, a) in positions.iter().enumerate() {
            assert!(a.is_finite());
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) > 1.0);
            }
        }
    }

    #[test]
    fn anchored_nodes_do_not_move() {
        let (nodes, edges) = elements(3, &[(0, 1), (1, 2)]);
        let mut layout = ForceLayout::new(ViewConfig::default());
        layout.build(&nodes, &edges);
        assert!(layout.place("n0", Position::new(10.0, 20.0), true));
        layout.set_physics(true);
        layout.stabilize();

        assert_eq!(layout.positions()["n0"], Position::new(10.0, 20.0));
    }

    #[test]
    fn physics_off_only_seeds() {
        let (nodes, edges) = elements(2, &[(0, 1)]);
        let mut layout = ForceLayout::new(ViewConfig::default());
        layout.build(&nodes, &edges);
        let result = layout.stabilize();

        assert_eq!(result.iterations, 0);
        assert_eq!(layout.positions().len(), 2);
    }

    #[test]
    fn coincident_nodes_stay_finite() {
        let (nodes, edges) = elements(3, &[]);
        let mut layout = ForceLayout::new(ViewConfig::default());
        layout.build(&nodes, &edges);
        for id in ["n0", "n1", "n2"] {
            layout.place(id, Position::new(5.0, 5.0), false);
        }
        layout.set_physics(true);
        layout.stabilize();

        assert!(layout.positions().values().all(|p| p.is_finite()));
    }

    #[test]
    fn fit_covers_all_nodes() {
        let mut layout = settled(&[(0, 1)], 2);
        let viewport = layout.fit();
        for p in layout.positions().values() {
            assert!((p.x - viewport.center.x).abs() <= viewport.width / 2.0);
            assert!((p.y - viewport.center.y).abs() <= viewport.height / 2.0);
        }
    }

    #[test]
    fn place_unknown_id_is_rejected() {
        let mut layout = ForceLayout::default();
        assert!(!layout.place("ghost", Position::default(), true));
    }
}
