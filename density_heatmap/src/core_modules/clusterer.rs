// THEORY:
// The clusterer is the grouping layer of the density heatmap. It takes the flat
// list of projected positions and discovers where they pile up, using a DBSCAN
// variant tuned for interactive recordings rather than a textbook DBSCAN.
//
// Algorithm steps:
// 1.  **Size-Adaptive Thresholds**: `epsilon` and `min_points` are scaled by
//     `point_count / 1000`, so a long recording needs a proportionally denser
//     neighborhood before it counts as a hotspot. The neighbor radius is a tenth
//     of the scaled epsilon.
// 2.  **Seeding**: Points are visited in index order. A point whose neighborhood
//     is too sparse is marked as noise; otherwise it seeds a new cluster.
// 3.  **Expansion**: The seed's neighborhood is walked depth-first. Core
//     neighbors open their own neighborhoods, sparse neighbors and earlier noise
//     are absorbed as border points. A point claimed by an earlier cluster is
//     never reassigned. The walk keeps an explicit stack of frames so a large,
//     dense cluster cannot exhaust the call stack.
// 4.  **Aggregation**: Every finished cluster reports its centroid. The centroid
//     is returned alongside the clusters; writing it back into a point array is
//     a separate, explicit step (`ClusterSet::apply_centroids`).
// 5.  **Stateless Utility**: Like the rest of the leaves, clustering is a pure
//     function of its input. Neighbor search is a plain O(n²) scan; recordings
//     are bounded by the sampling rate, not by a stream.

use crate::core_modules::point::Point2D;

/// Final label of a single input point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLabel {
    /// Never part of a dense neighborhood.
    Noise,
    /// Member of the cluster with this id (ids start at 1).
    Cluster(u32),
}

/// One density cluster: an ordered list of indices into the input points.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: u32,
    /// Indices in expansion order. The first entry is always the seed.
    pub members: Vec<usize>,
}

/// The complete outcome of one clustering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterSet {
    /// Clusters in discovery order; `clusters[k].id == k + 1`.
    pub clusters: Vec<Cluster>,
    /// One label per input point.
    pub labels: Vec<PointLabel>,
    /// Mean member position, parallel to `clusters`.
    pub centroids: Vec<Point2D>,
}

impl ClusterSet {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn noise_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|label| matches!(label, PointLabel::Noise))
            .count()
    }

    /// Total number of member entries, i.e. how many stamps a density render performs.
    pub fn stamp_count(&self) -> usize {
        self.clusters.iter().map(|cluster| cluster.members.len()).sum()
    }

    /// Overwrites the first member of every cluster with that cluster's centroid.
    ///
    /// This is the "representative point" convention used by the density render:
    /// each cluster's seed is drawn at the cluster's center of mass.
    pub fn apply_centroids(&self, points: &mut [Point2D]) {
        for (cluster, centroid) in self.clusters.iter().zip(&self.centroids) {
            if let Some(slot) = cluster.members.first().and_then(|&i| points.get_mut(i)) {
                *slot = *centroid;
            }
        }
    }
}

pub mod dbscan {
    use super::*;

    /// The neighbor radius is the scaled epsilon divided by this.
    const NEIGHBOUR_RADIUS_DIVISOR: f64 = 10.0;
    /// Point count at which `epsilon` and `min_points` are used unscaled.
    const SCALE_REFERENCE_COUNT: f64 = 1000.0;

    /// Returns `(scaled_epsilon, scaled_min_points)` for a recording of `point_count` points.
    pub fn scaled_parameters(point_count: usize, epsilon: f64, min_points: u32) -> (f64, usize) {
        let scaled_epsilon = epsilon * (point_count as f64 / SCALE_REFERENCE_COUNT);
        // Truncated in single precision.
        let scaled_min_points = (min_points as f32 * (point_count as f32 / 1000f32)) as usize;
        (scaled_epsilon, scaled_min_points)
    }

    /// Groups `points` into density clusters. Noise points are absent from every cluster.
    pub fn create_clusters(points: &[Point2D], epsilon: f64, min_points: u32) -> ClusterSet {
        let point_count = points.len();
        let (scaled_epsilon, scaled_min_points) =
            scaled_parameters(point_count, epsilon, min_points);
        let neighbour_radius = scaled_epsilon / NEIGHBOUR_RADIUS_DIVISOR;

        // `None` means unvisited.
        let mut visits: Vec<Option<PointLabel>> = vec![None; point_count];
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut next_id = 1u32;

        for index in 0..point_count {
            if visits[index].is_some() {
                continue;
            }

            let neighbours = region_query(points, index, neighbour_radius);
            if neighbours.len() < scaled_min_points {
                visits[index] = Some(PointLabel::Noise);
                continue;
            }

            let members = expand_cluster(
                points,
                &mut visits,
                index,
                neighbours,
                next_id,
                neighbour_radius,
                scaled_min_points,
            );
            clusters.push(Cluster { id: next_id, members });
            next_id += 1;
        }

        let centroids = clusters
            .iter()
            .map(|cluster| {
                Point2D::mean(cluster.members.iter().map(|&i| &points[i])).unwrap_or_default()
            })
            .collect();
        let labels = visits
            .into_iter()
            .map(|visit| visit.unwrap_or(PointLabel::Noise))
            .collect();

        ClusterSet {
            clusters,
            labels,
            centroids,
        }
    }

    /// All other points within `radius` of `points[index]`, in index order.
    fn region_query(points: &[Point2D], index: usize, radius: f64) -> Vec<usize> {
        let origin = points[index];
        points
            .iter()
            .enumerate()
            .filter(|&(other, point)| other != index && origin.distance(point) <= radius)
            .map(|(other, _)| other)
            .collect()
    }

    /// A neighborhood being walked, and how far into it we are.
    struct Frame {
        neighbours: Vec<usize>,
        cursor: usize,
    }

    /// Depth-first expansion from a core seed. Returns members in discovery order.
    fn expand_cluster(
        points: &[Point2D],
        visits: &mut [Option<PointLabel>],
        seed: usize,
        seed_neighbours: Vec<usize>,
        cluster_id: u32,
        radius: f64,
        min_points: usize,
    ) -> Vec<usize> {
        let label = PointLabel::Cluster(cluster_id);
        let mut members = vec![seed];
        visits[seed] = Some(label);

        let mut stack = vec![Frame {
            neighbours: seed_neighbours,
            cursor: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(&neighbour) = frame.neighbours.get(frame.cursor) else {
                stack.pop();
                continue;
            };
            frame.cursor += 1;

            if visits[neighbour].is_none() {
                let neighbour_neighbours = region_query(points, neighbour, radius);
                if neighbour_neighbours.len() >= min_points {
                    // Core point: claim it, then walk its neighborhood before resuming this one.
                    members.push(neighbour);
                    visits[neighbour] = Some(label);
                    stack.push(Frame {
                        neighbours: neighbour_neighbours,
                        cursor: 0,
                    });
                    continue;
                }
                visits[neighbour] = Some(PointLabel::Noise);
            }

            // Border point, either just found or left over as noise from an earlier seed.
            if visits[neighbour] == Some(PointLabel::Noise) {
                visits[neighbour] = Some(label);
                members.push(neighbour);
            }
        }

        members
    }
}

#[cfg(test)]
mod tests {
    use super::dbscan::*;
    use super::*;

    fn row(start: (f64, f64), step: (f64, f64), count: usize) -> Vec<Point2D> {
        (0..count)
            .map(|k| Point2D::new(start.0 + step.0 * k as f64, start.1 + step.1 * k as f64))
            .collect()
    }

    #[test]
    fn empty_input_has_no_clusters() {
        let result = create_clusters(&[], 30.0, 1);
        assert!(result.is_empty());
        assert!(result.labels.is_empty());
        assert!(result.centroids.is_empty());
    }

    #[test]
    fn thresholds_scale_with_point_count() {
        assert_eq!(scaled_parameters(1000, 30.0, 4), (30.0, 4));
        let (epsilon, min_points) = scaled_parameters(2000, 30.0, 4);
        assert!((epsilon - 60.0).abs() < 1e-9);
        assert_eq!(min_points, 8);
        // Small recordings truncate the density requirement to zero.
        assert_eq!(scaled_parameters(10, 30.0, 1).1, 0);
    }

    #[test]
    fn every_point_gets_exactly_one_label_and_ids_are_contiguous() {
        // 20 points; epsilon 500 scales to 10 (radius 1.0), min_points 125 scales to 2.
        let mut points = row((10.0, 10.0), (0.3, 0.0), 8);
        points.extend(row((50.0, 50.0), (0.0, 0.3), 8));
        points.extend([
            Point2D::new(100.0, 0.0),
            Point2D::new(0.0, 100.0),
            Point2D::new(200.0, 200.0),
            Point2D::new(300.0, 10.0),
        ]);

        let result = create_clusters(&points, 500.0, 125);

        assert_eq!(result.labels.len(), points.len());
        assert_eq!(result.len(), 2);
        let ids: Vec<u32> = result.clusters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(result.noise_count(), 4);
        assert_eq!(result.stamp_count(), 16);

        for (index, label) in result.labels.iter().enumerate() {
            let owners = result
                .clusters
                .iter()
                .filter(|c| c.members.contains(&index))
                .count();
            match label {
                PointLabel::Noise => assert_eq!(owners, 0, "noise point {index} is in a cluster"),
                PointLabel::Cluster(id) => {
                    assert_eq!(owners, 1, "point {index} is in {owners} clusters");
                    assert!(result.clusters[*id as usize - 1].members.contains(&index));
                }
            }
        }

        let mut first: Vec<usize> = result.clusters[0].members.clone();
        first.sort_unstable();
        assert_eq!(first, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn ids_follow_discovery_order() {
        let mut points = row((50.0, 50.0), (0.0, 0.3), 8);
        points.extend(row((10.0, 10.0), (0.3, 0.0), 8));
        points.extend(row((400.0, 400.0), (50.0, 0.0), 4));

        let result = create_clusters(&points, 500.0, 125);
        assert_eq!(result.labels[0], PointLabel::Cluster(1));
        assert_eq!(result.labels[8], PointLabel::Cluster(2));
        assert_eq!(result.labels[16], PointLabel::Noise);
    }

    #[test]
    fn points_around_a_common_center_form_one_cluster() {
        // 10 points within 0.4 of (5, 5); epsilon 1000 scales to 10, radius 1.0.
        let offsets = [
            (0.0, 0.0),
            (0.4, 0.0),
            (-0.4, 0.0),
            (0.0, 0.4),
            (0.0, -0.4),
            (0.2, 0.2),
            (-0.2, 0.2),
            (0.2, -0.2),
            (-0.2, -0.2),
            (0.1, 0.3),
        ];
        let points: Vec<Point2D> = offsets
            .iter()
            .map(|&(dx, dy)| Point2D::new(5.0 + dx, 5.0 + dy))
            .collect();

        for min_points in [1, 500] {
            let result = create_clusters(&points, 1000.0, min_points);
            assert_eq!(result.len(), 1, "min_points {min_points}");
            let mut members = result.clusters[0].members.clone();
            members.sort_unstable();
            assert_eq!(members, (0..10).collect::<Vec<_>>());
            assert_eq!(result.noise_count(), 0);
        }
    }

    #[test]
    fn earlier_noise_is_adopted_as_a_border_point() {
        // 4 points; epsilon 2500 scales to 10 (radius 1.0), min_points 625 scales to 2.
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.9, 0.0),
            Point2D::new(1.2, 0.0),
            Point2D::new(1.5, 0.0),
        ];
        let result = create_clusters(&points, 2500.0, 625);

        assert_eq!(result.len(), 1);
        assert_eq!(result.clusters[0].members, vec![1, 0, 2, 3]);
        assert!(result.labels.iter().all(|l| *l == PointLabel::Cluster(1)));
    }

    #[test]
    fn first_cluster_keeps_a_shared_border_point() {
        // 9 points; epsilon 1112 scales to ~10 (radius ~1.0), min_points 400 scales to 3.
        let mut points = row((0.0, 0.0), (0.3, 0.0), 4);
        points.push(Point2D::new(1.8, 0.0));
        points.extend(row((2.7, 0.0), (0.3, 0.0), 4));

        let result = create_clusters(&points, 1112.0, 400);

        assert_eq!(result.len(), 2);
        assert_eq!(result.labels[4], PointLabel::Cluster(1));
        assert!(result.clusters[0].members.contains(&4));
        assert!(!result.clusters[1].members.contains(&4));
        assert_eq!(result.clusters[1].members.len(), 4);
    }

    #[test]
    fn two_groups_report_their_means_and_apply_them_on_request() {
        // 8 points; min_points scales to 0 so every point is core; radius 1.0.
        let recorded = vec![
            Point2D::new(10.0, 10.0),
            Point2D::new(10.5, 10.0),
            Point2D::new(10.0, 10.5),
            Point2D::new(10.5, 10.5),
            Point2D::new(100.0, 100.0),
            Point2D::new(100.5, 100.0),
            Point2D::new(100.0, 100.5),
            Point2D::new(100.5, 100.5),
        ];
        let result = create_clusters(&recorded, 1250.0, 1);

        assert_eq!(result.len(), 2);
        assert_eq!(result.centroids[0], Point2D::new(10.25, 10.25));
        assert_eq!(result.centroids[1], Point2D::new(100.25, 100.25));

        let mut points = recorded.clone();
        result.apply_centroids(&mut points);
        assert_eq!(points[result.clusters[0].members[0]], Point2D::new(10.25, 10.25));
        assert_eq!(points[result.clusters[1].members[0]], Point2D::new(100.25, 100.25));
        let changed = points.iter().zip(&recorded).filter(|(a, b)| a != b).count();
        assert_eq!(changed, 2);
    }
}
