//! CPU hit testing against a frame's nodes and links.
//!
//! Only the two pickable families take part. Nodes win over links: a point
//! inside a marker (plus tolerance) picks the nearest such node, otherwise
//! the nearest link segment within tolerance.

use glam::Vec3;

use crate::interpolation::Frame;
use crate::layout::NodeId;

/// What a pick hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickTarget {
    /// A node marker.
    Node(NodeId),
    /// A branch.
    Link(NodeId),
}

impl PickTarget {
    /// Id of the hit element.
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Node(id) | Self::Link(id) => id,
        }
    }
}

/// Element under `point` (layout space, z ignored), if any.
pub fn pick(frame: &Frame, point: Vec3, tolerance: f32) -> Option<PickTarget> {
    let p = point.truncate();
    let layout = &frame.layout;

    let node = layout
        .nodes
        .iter()
        .filter(|n| n.opacity > 0.0)
        .map(|n| (n, n.position.truncate().distance(p)))
        .filter(|(n, d)| *d <= n.radius + tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((n, _)) = node {
        return Some(PickTarget::Node(n.id.clone()));
    }

    layout
        .links
        .iter()
        .filter(|l| l.opacity > 0.0)
        .filter_map(|l| {
            let d = l
                .path
                .windows(2)
                .map(|w| segment_distance(p, w[0].truncate(), w[1].truncate()))
                .min_by(f32::total_cmp)?;
            (d <= tolerance).then_some((l, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(l, _)| PickTarget::Link(l.id.clone()))
}

fn segment_distance(p: glam::Vec2, a: glam::Vec2, b: glam::Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframes::TreeData;
    use crate::layout::{LayoutCalculator, LayoutOptions, RadialLayout};

    fn frame() -> Frame {
        let tree = TreeData::internal(
            0.0,
            vec![TreeData::leaf("A", 1.0), TreeData::leaf("B", 1.0)],
        );
        Frame::still(RadialLayout.calculate(&tree, &LayoutOptions::default()).unwrap())
    }

    #[test]
    fn node_beats_link() {
        let frame = frame();
        let leaf = frame.layout.leaves().next().unwrap().clone();
        let hit = pick(&frame, leaf.position, 0.5).unwrap();
        assert_eq!(hit, PickTarget::Node(leaf.id));
    }

    #[test]
    fn link_segment_within_tolerance() {
        let frame = frame();
        let link = &frame.layout.links[0];
        let last = *link.path.last().unwrap();
        let prev = link.path[link.path.len() - 2];
        let mid = (last + prev) / 2.0;
        let hit = pick(&frame, mid, 1.0).unwrap();
        assert_eq!(hit.id(), &link.id);
        assert!(matches!(hit, PickTarget::Link(_)));
    }

    #[test]
    fn empty_space_misses() {
        assert_eq!(pick(&frame(), Vec3::new(5000.0, 5000.0, 0.0), 2.0), None);
    }
}
