use crate::types::GemeindeFeature;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Bounding-box R-tree over feature positions in a feature slice.
pub struct SpatialIndex {
    tree: RTree<AreaIndex>,
}

impl SpatialIndex {
    pub fn build(features: &[GemeindeFeature]) -> Self {
        let items: Vec<AreaIndex> = features.iter().enumerate()
            .filter_map(|(i, feature)| {
                let rect = feature.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        Self { tree: RTree::bulk_load(items) }
    }

    /// Position of the first feature whose polygon contains the point.
    pub fn locate(&self, features: &[GemeindeFeature], lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree.locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| features.get(i).is_some_and(|f| f.geometry.contains(&point)))
            .min()
    }
}
