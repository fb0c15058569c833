//! Edge routing over solved node rectangles.
//!
//! Node positions are solved elsewhere; this module only turns an edge
//! between two rectangles into a legible polyline. Two situations need a
//! detour rather than a straight segment:
//!
//! - the rectangles touch, so a straight edge would run flush along the
//!   shared boundary, and
//! - other nodes sit on the straight line between the two centers.
//!
//! Every function here is pure over a bounds snapshot. Degenerate input
//! (zero-size, non-finite or overlapping rectangles) falls back to a straight
//! segment.
//!
//! # Tie-breaks
//!
//! When both axes are equally good, the horizontal axis wins for boundary
//! points. Detours around a horizontal arrangement go above it, detours around
//! a vertical arrangement go to its left.

use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;

use spytial_core::geometry::{Bounds, Point};

use crate::{
    config::RoutingConfig,
    layout::{EdgeKind, EdgeLayout, LayoutResult},
};

/// How two rectangles touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchDirection {
    /// Side by side, sharing a vertical boundary.
    Horizontal,
    /// Stacked, sharing a horizontal boundary.
    Vertical,
    None,
}

/// A routed polyline between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub source: Point,
    pub waypoints: Vec<Point>,
    pub target: Point,
}

impl Route {
    fn straight(source: Point, target: Point) -> Self {
        Self {
            source,
            waypoints: Vec::new(),
            target,
        }
    }

    /// All points from source to target.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.waypoints.len() + 2);
        points.push(self.source);
        points.extend(self.waypoints.iter().copied());
        points.push(self.target);
        points
    }

    /// Consecutive point pairs.
    pub fn segments(&self) -> Vec<(Point, Point)> {
        let points = self.points();
        points.windows(2).map(|pair| (pair[0], pair[1])).collect()
    }
}

/// Returns true if the segment `p1`-`p2` touches or crosses `rect`.
///
/// Boundary contact counts as an intersection.
///
/// # Examples
///
/// ```
/// # use spytial::routing::line_intersects_rect;
/// # use spytial_core::geometry::{Bounds, Point, Size};
/// let rect = Bounds::new_from_top_left(Point::new(10.0, 10.0), Size::new(10.0, 10.0));
/// assert!(line_intersects_rect(Point::new(0.0, 15.0), Point::new(30.0, 15.0), rect));
/// assert!(line_intersects_rect(Point::new(0.0, 10.0), Point::new(30.0, 10.0), rect));
/// assert!(!line_intersects_rect(Point::new(0.0, 0.0), Point::new(30.0, 5.0), rect));
/// ```
pub fn line_intersects_rect(p1: Point, p2: Point, rect: Bounds) -> bool {
    if rect.contains_point(p1) || rect.contains_point(p2) {
        return true;
    }

    // Liang-Barsky clipping of the parametric segment against the rectangle.
    let delta = p2.sub_point(p1);
    let checks = [
        (-delta.x(), p1.x() - rect.min_x()),
        (delta.x(), rect.max_x() - p1.x()),
        (-delta.y(), p1.y() - rect.min_y()),
        (delta.y(), rect.max_y() - p1.y()),
    ];

    let (mut t_enter, mut t_exit) = (0.0f32, 1.0f32);
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_exit {
                return false;
            }
            t_enter = t_enter.max(t);
        } else {
            if t < t_enter {
                return false;
            }
            t_exit = t_exit.min(t);
        }
    }
    t_enter <= t_exit
}

/// The point on the boundary of `bounds` where a line from `center` towards
/// `other` should attach.
///
/// The face is the one turned towards `other`, compared relative to the
/// rectangle's proportions; the horizontal faces win ties. It is not the face
/// turned away from the node at the far end of the edge: detouring routes
/// pass their first or last waypoint as `other`, which lies outside every
/// node involved, so the attachment lands on a face that is not hidden
/// against a neighbouring node. Degenerate rectangles attach at `center`.
pub fn choose_boundary_point(center: Point, bounds: Bounds, other: Point) -> Point {
    if bounds.is_degenerate() {
        return center;
    }
    let dx = other.x() - center.x();
    let dy = other.y() - center.y();
    if dx == 0.0 && dy == 0.0 {
        return center;
    }

    let horizontal = dx.abs() / (bounds.width() / 2.0);
    let vertical = dy.abs() / (bounds.height() / 2.0);
    if horizontal >= vertical {
        let x = if dx >= 0.0 { bounds.max_x() } else { bounds.min_x() };
        Point::new(x, center.y())
    } else {
        let y = if dy >= 0.0 { bounds.max_y() } else { bounds.min_y() };
        Point::new(center.x(), y)
    }
}

/// Classify how `a` and `b` touch.
///
/// They touch horizontally when the gap between them on the x-axis is at
/// most `epsilon` (in either direction) while they overlap on the y-axis,
/// and vertically in the transposed case.
pub fn touch_direction(a: Bounds, b: Bounds, epsilon: f32) -> TouchDirection {
    let gap_x = a.gap_x(b);
    let gap_y = a.gap_y(b);
    if gap_x.abs() <= epsilon && gap_y < 0.0 {
        TouchDirection::Horizontal
    } else if gap_y.abs() <= epsilon && gap_x < 0.0 {
        TouchDirection::Vertical
    } else {
        TouchDirection::None
    }
}

/// Route between two touching rectangles without running along their
/// shared boundary.
///
/// Side-by-side rectangles are joined over the top, stacked ones around the
/// left, `clearance` away from both. Returns `None` when they do not touch
/// in `direction`'s sense.
pub fn perpendicular_route(
    source: Bounds,
    target: Bounds,
    direction: TouchDirection,
    clearance: f32,
) -> Option<Route> {
    let (s, t) = (source.center(), target.center());
    let waypoints = match direction {
        TouchDirection::Horizontal => {
            let y = source.min_y().min(target.min_y()) - clearance;
            vec![Point::new(s.x(), y), Point::new(t.x(), y)]
        }
        TouchDirection::Vertical => {
            let x = source.min_x().min(target.min_x()) - clearance;
            vec![Point::new(x, s.y()), Point::new(x, t.y())]
        }
        TouchDirection::None => return None,
    };
    Some(Route {
        source: choose_boundary_point(s, source, waypoints[0]),
        target: choose_boundary_point(t, target, waypoints[waypoints.len() - 1]),
        waypoints,
    })
}

/// Nodes other than the two endpoints whose rectangles cross the straight
/// line between the endpoint centers, nearest to `source` first.
pub fn find_blocking_nodes<'n>(
    source: Bounds,
    target: Bounds,
    source_id: &str,
    target_id: &str,
    nodes: &'n IndexMap<String, Bounds>,
) -> Vec<(&'n str, Bounds)> {
    let (from, to) = (source.center(), target.center());
    let mut blocking: Vec<(&str, Bounds)> = nodes
        .iter()
        .filter(|(id, bounds)| {
            id.as_str() != source_id
                && id.as_str() != target_id
                && !bounds.is_degenerate()
                && line_intersects_rect(from, to, **bounds)
        })
        .map(|(id, bounds)| (id.as_str(), *bounds))
        .collect();
    // Stable, so equally distant blockers keep snapshot order.
    blocking.sort_by(|(_, a), (_, b)| {
        from.distance(a.center())
            .total_cmp(&from.distance(b.center()))
    });
    blocking
}

/// Which side of everything involved a detour passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Above,
    Below,
    Left,
    Right,
}

impl Side {
    /// Waypoints `clearance` outside `extent`, level with each center.
    fn waypoints(self, s: Point, t: Point, extent: Bounds, clearance: f32) -> Vec<Point> {
        match self {
            Side::Above => {
                let y = extent.min_y() - clearance;
                vec![Point::new(s.x(), y), Point::new(t.x(), y)]
            }
            Side::Below => {
                let y = extent.max_y() + clearance;
                vec![Point::new(s.x(), y), Point::new(t.x(), y)]
            }
            Side::Left => {
                let x = extent.min_x() - clearance;
                vec![Point::new(x, s.y()), Point::new(x, t.y())]
            }
            Side::Right => {
                let x = extent.max_x() + clearance;
                vec![Point::new(x, s.y()), Point::new(x, t.y())]
            }
        }
    }
}

fn clears(route: &Route, blocking: &[Bounds]) -> bool {
    route.segments().into_iter().all(|(p1, p2)| {
        blocking
            .iter()
            .all(|bounds| !line_intersects_rect(p1, p2, *bounds))
    })
}

/// Route around a chain of blocking rectangles.
///
/// When source and target are mostly stacked the route passes left of every
/// blocker, falling back to the right, then above and below; otherwise it
/// tries above, below, left and right in that order. The first side whose
/// every segment misses every blocker wins. The detour keeps `clearance`
/// from the blockers and from both endpoints. When no side is clear the
/// preferred side is used.
pub fn route_around_blocking_nodes(
    source: Bounds,
    target: Bounds,
    blocking: &[Bounds],
    clearance: f32,
) -> Route {
    let (s, t) = (source.center(), target.center());
    let Some(union) = blocking
        .iter()
        .copied()
        .reduce(|merged, bounds| merged.merge(&bounds))
    else {
        return Route::straight(
            choose_boundary_point(s, source, t),
            choose_boundary_point(t, target, s),
        );
    };
    let extent = union.merge(&source).merge(&target);

    let stacked = (t.y() - s.y()).abs() > (t.x() - s.x()).abs();
    let sides = if stacked {
        [Side::Left, Side::Right, Side::Above, Side::Below]
    } else {
        [Side::Above, Side::Below, Side::Left, Side::Right]
    };
    let route_on = |side: Side| {
        let waypoints = side.waypoints(s, t, extent, clearance);
        Route {
            source: choose_boundary_point(s, source, waypoints[0]),
            target: choose_boundary_point(t, target, waypoints[1]),
            waypoints,
        }
    };

    sides
        .into_iter()
        .map(&route_on)
        .find(|route| clears(route, blocking))
        .unwrap_or_else(|| {
            debug!(blocking = blocking.len(); "No detour side clears every blocker");
            route_on(sides[0])
        })
}

/// An edge id with the points it should be drawn through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedEdge {
    pub id: String,
    pub points: Vec<Point>,
}

/// Routes edges over one snapshot of solved node rectangles.
///
/// # Examples
///
/// ```
/// # use indexmap::IndexMap;
/// # use spytial::{config::RoutingConfig, routing::EdgeRouter};
/// # use spytial_core::geometry::{Bounds, Point, Size};
/// let mut nodes = IndexMap::new();
/// nodes.insert("a".to_string(), Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(50.0, 30.0)));
/// nodes.insert("b".to_string(), Bounds::new_from_top_left(Point::new(50.0, 0.0), Size::new(50.0, 30.0)));
///
/// let router = EdgeRouter::new(nodes, RoutingConfig::default());
/// let route = router.near_touch_route("a", "b").expect("touching nodes need a detour");
/// assert!(route.points().iter().all(|p| p.y() <= 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct EdgeRouter {
    nodes: IndexMap<String, Bounds>,
    config: RoutingConfig,
}

impl EdgeRouter {
    pub fn new(nodes: IndexMap<String, Bounds>, config: RoutingConfig) -> Self {
        Self { nodes, config }
    }

    pub fn nodes(&self) -> &IndexMap<String, Bounds> {
        &self.nodes
    }

    /// A detour between two nodes, or `None` when a straight line is fine
    /// or the geometry is degenerate.
    pub fn near_touch_route(&self, source_id: &str, target_id: &str) -> Option<Route> {
        let source = *self.nodes.get(source_id)?;
        let target = *self.nodes.get(target_id)?;
        if source_id == target_id || source.is_degenerate() || target.is_degenerate() {
            return None;
        }

        let epsilon = self.config.touch_epsilon;
        let direction = touch_direction(source, target, epsilon);
        if direction != TouchDirection::None {
            return perpendicular_route(source, target, direction, self.config.clearance);
        }
        if source.gap_x(target) < 0.0 && source.gap_y(target) < 0.0 {
            // Overlapping rectangles.
            return None;
        }

        let blocking = find_blocking_nodes(source, target, source_id, target_id, &self.nodes);
        if blocking.is_empty() {
            return None;
        }
        trace!(
            source = source_id,
            target = target_id,
            blocking = blocking.len();
            "Routing around blocking nodes",
        );
        let rects: Vec<Bounds> = blocking.into_iter().map(|(_, bounds)| bounds).collect();
        Some(route_around_blocking_nodes(
            source,
            target,
            &rects,
            self.config.clearance,
        ))
    }

    /// Route one edge, falling back to a straight boundary-to-boundary line.
    pub fn route(&self, id: &str, source_id: &str, target_id: &str) -> Option<RoutedEdge> {
        let source = *self.nodes.get(source_id)?;
        let target = *self.nodes.get(target_id)?;

        let route = if source_id == target_id {
            self.self_loop(source)
        } else if let Some(route) = self.near_touch_route(source_id, target_id) {
            route
        } else {
            let (s, t) = (source.center(), target.center());
            Route::straight(
                choose_boundary_point(s, source, t),
                choose_boundary_point(t, target, s),
            )
        };
        Some(RoutedEdge {
            id: id.to_string(),
            points: route.points(),
        })
    }

    /// Route every visible node-to-node edge of a layout whose endpoints have bounds.
    pub fn route_edges(&self, layout: &LayoutResult) -> Vec<RoutedEdge> {
        layout
            .visible_edges()
            .filter(|edge| edge.kind != EdgeKind::Group)
            .filter_map(|edge: &EdgeLayout| self.route(&edge.id, &edge.source, &edge.target))
            .collect()
    }

    /// A loop leaving the top face and returning to the right face.
    fn self_loop(&self, bounds: Bounds) -> Route {
        let center = bounds.center();
        let top = Point::new(center.x(), bounds.min_y());
        let right = Point::new(bounds.max_x(), center.y());
        let clearance = self.config.clearance;
        let corner = Point::new(bounds.max_x() + clearance, bounds.min_y() - clearance);
        Route {
            source: top,
            waypoints: vec![
                top.with_y(corner.y()),
                corner,
                right.with_x(corner.x()),
            ],
            target: right,
        }
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;
    use spytial_core::geometry::Size;

    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Bounds {
        Bounds::new_from_top_left(Point::new(x, y), Size::new(w, h))
    }

    /// A pair of side-by-side rectangles whose gap is within epsilon and
    /// whose vertical spans overlap.
    fn touching_pair() -> impl Strategy<Value = (Bounds, Bounds)> {
        (
            -500.0f32..500.0,
            -500.0f32..500.0,
            10.0f32..200.0,
            10.0f32..200.0,
            10.0f32..200.0,
            10.0f32..200.0,
            0.0f32..0.9,
            0.05f32..0.95,
        )
            .prop_map(|(x, y, wa, ha, wb, hb, gap, shift)| {
                let a = rect(x, y, wa, ha);
                // Offset b vertically so it still overlaps a.
                let offset = (shift - 0.5) * 2.0 * (ha.min(hb) * 0.9);
                let b = rect(x + wa + gap, y + offset, wb, hb);
                (a, b)
            })
    }

    fn check_perpendicular_route_avoids_shared_span(a: Bounds, b: Bounds) -> Result<(), TestCaseError> {
        prop_assert_eq!(touch_direction(a, b, 1.0), TouchDirection::Horizontal);
        let route = perpendicular_route(a, b, TouchDirection::Horizontal, 20.0).unwrap();
        prop_assert!(!route.waypoints.is_empty());

        let shared_top = a.min_y().max(b.min_y());
        let shared_bottom = a.max_y().min(b.max_y());
        for point in route.points() {
            prop_assert!(
                point.y() <= shared_top || point.y() >= shared_bottom,
                "point {:?} inside shared span {}..{}",
                point,
                shared_top,
                shared_bottom
            );
        }
        Ok(())
    }

    /// A top, B in the middle crossing the line between centers, C at the bottom.
    fn stacked_chain() -> impl Strategy<Value = (Bounds, Bounds, Bounds)> {
        (
            10.0f32..100.0,
            10.0f32..100.0,
            10.0f32..100.0,
            5.0f32..100.0,
            5.0f32..100.0,
            -0.45f32..0.45,
        )
            .prop_map(|(wa, wb, wc, gap1, gap2, shift)| {
                let a = rect(-wa / 2.0, 0.0, wa, 40.0);
                let b = rect(-wb / 2.0 + shift * wb, 40.0 + gap1, wb, 40.0);
                let c = rect(-wc / 2.0, b.max_y() + gap2, wc, 40.0);
                (a, b, c)
            })
    }

    fn check_route_around_chain(a: Bounds, b: Bounds, c: Bounds) -> Result<(), TestCaseError> {
        let mut nodes = IndexMap::new();
        nodes.insert("a".to_string(), a);
        nodes.insert("b".to_string(), b);
        nodes.insert("c".to_string(), c);
        let router = EdgeRouter::new(nodes, RoutingConfig::default());

        let route = router.near_touch_route("a", "c").unwrap();
        prop_assert!(route.waypoints.len() >= 2);
        for (p1, p2) in route.segments() {
            prop_assert!(!line_intersects_rect(p1, p2, b));
        }
        Ok(())
    }

    /// A source at the origin, a target below and to the right, one blocker
    /// on the line between them and a wide one just above the target.
    fn diagonal_with_blockers() -> impl Strategy<Value = (Bounds, Bounds, [Bounds; 2])> {
        (
            150.0f32..300.0,
            100.0f32..250.0,
            0.3f32..0.7,
            40.0f32..100.0,
            -0.4f32..0.4,
            5.0f32..30.0,
        )
            .prop_map(|(tx, ty, along, width, shift, gap)| {
                let source = rect(0.0, 0.0, 20.0, 20.0);
                let target = rect(tx, ty, 20.0, 20.0);
                let (s, t) = (source.center(), target.center());
                let on_line = s.add_point(t.sub_point(s).scale(along));
                let middle = rect(on_line.x() - 10.0, on_line.y() - 10.0, 20.0, 20.0);
                let beside = rect(t.x() - width * (0.5 + shift), ty - gap - 20.0, width, 20.0);
                (source, target, [middle, beside])
            })
    }

    fn check_route_clears_diagonal_blockers(
        source: Bounds,
        target: Bounds,
        blockers: [Bounds; 2],
    ) -> Result<(), TestCaseError> {
        let route = route_around_blocking_nodes(source, target, &blockers, 20.0);
        prop_assert!(route.waypoints.len() >= 2);
        for (p1, p2) in route.segments() {
            for blocker in blockers {
                prop_assert!(
                    !line_intersects_rect(p1, p2, blocker),
                    "segment {:?}->{:?} crosses {:?}",
                    p1,
                    p2,
                    blocker
                );
            }
        }
        Ok(())
    }

    fn check_routing_is_repeatable(a: Bounds, b: Bounds, c: Bounds) -> Result<(), TestCaseError> {
        let mut nodes = IndexMap::new();
        nodes.insert("a".to_string(), a);
        nodes.insert("b".to_string(), b);
        nodes.insert("c".to_string(), c);
        let router = EdgeRouter::new(nodes, RoutingConfig::default());
        prop_assert_eq!(router.route("e", "a", "c"), router.route("e", "a", "c"));
        Ok(())
    }

    proptest! {
        #[test]
        fn perpendicular_route_avoids_shared_span((a, b) in touching_pair()) {
            check_perpendicular_route_avoids_shared_span(a, b)?;
        }

        #[test]
        fn route_around_chain((a, b, c) in stacked_chain()) {
            check_route_around_chain(a, b, c)?;
        }

        #[test]
        fn route_clears_diagonal_blockers((source, target, blockers) in diagonal_with_blockers()) {
            check_route_clears_diagonal_blockers(source, target, blockers)?;
        }

        #[test]
        fn routing_is_repeatable((a, b, c) in stacked_chain()) {
            check_routing_is_repeatable(a, b, c)?;
        }
    }
}
