//! Alignment dowels for contour cuts.
//!
//! Dowel sites are spread over the outer seam loops by arc length and
//! pulled toward the interior. Each site yields a standalone pin and a
//! clearance hole straddling the seam.

use cutkit_math::{Point3, Transform};
use cutkit_mesh::{make_cylinder, SeamLoop, TriangleMesh};
use cutkit_model::{ConnectorInfo, ConnectorKind, ModelVolume, VolumeType};

use crate::config::DowelSettings;

/// Dowel centres on the seam plane, in cut coordinates.
///
/// Sites are shared between loops in proportion to their perimeter (largest
/// remainder), then spaced evenly along each loop.
pub fn place_dowels(seams: &[SeamLoop], count: usize, inset: f64) -> Vec<Point3> {
    let outer: Vec<(&SeamLoop, f64)> = seams
        .iter()
        .filter(|s| !s.is_hole)
        .map(|s| (s, s.perimeter()))
        .filter(|(_, len)| *len > 0.0)
        .collect();
    let total: f64 = outer.iter().map(|(_, len)| len).sum();
    if count == 0 || total <= 0.0 {
        return Vec::new();
    }

    let quotas: Vec<f64> = outer
        .iter()
        .map(|(_, len)| count as f64 * len / total)
        .collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let mut by_remainder: Vec<usize> = (0..quotas.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra)
    });
    for &i in by_remainder.iter().take(count.saturating_sub(assigned)) {
        counts[i] += 1;
    }

    outer
        .iter()
        .zip(counts)
        .flat_map(|((seam, _), n)| seam.samples(n))
        .map(|s| s.position + s.inward * inset)
        .collect()
}

/// Pin geometry standing on `z = 0`.
pub fn pin_mesh(settings: &DowelSettings) -> TriangleMesh {
    make_cylinder(settings.radius, settings.height, settings.segments)
}

/// Clearance hole centred on `site`, in cut coordinates.
pub fn hole_mesh(site: &Point3, settings: &DowelSettings, tolerance: f64) -> TriangleMesh {
    let half = settings.height / 2.0 + tolerance;
    make_cylinder(settings.radius + tolerance, 2.0 * half, settings.segments)
        .transformed(&Transform::translation(site.x, site.y, site.z - half))
}

/// Negative volume receiving dowel `index`.
pub fn hole_volume(
    index: usize,
    site: &Point3,
    settings: &DowelSettings,
    tolerance: f64,
    object_from_cut: Transform,
) -> ModelVolume {
    let mut volume = ModelVolume::new(
        format!("dowel_hole_{}", index + 1),
        hole_mesh(site, settings, tolerance),
    )
    .with_type(VolumeType::NegativeVolume)
    .with_transform(object_from_cut);
    volume.connector = Some(ConnectorInfo {
        kind: ConnectorKind::DowelHole,
        radius_tolerance: tolerance,
        height_tolerance: tolerance,
    });
    volume
}

/// Printable pin volume for dowel `index`.
pub fn pin_volume(index: usize, settings: &DowelSettings) -> ModelVolume {
    let mut volume = ModelVolume::new(format!("dowel_{}", index + 1), pin_mesh(settings));
    volume.connector = Some(ConnectorInfo {
        kind: ConnectorKind::DowelPin,
        radius_tolerance: 0.0,
        height_tolerance: 0.0,
    });
    volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, size: f64) -> SeamLoop {
        SeamLoop {
            points: vec![
                Point3::new(x0, 0.0, 0.0),
                Point3::new(x0 + size, 0.0, 0.0),
                Point3::new(x0 + size, size, 0.0),
                Point3::new(x0, size, 0.0),
            ],
            is_hole: false,
        }
    }

    #[test]
    fn test_sites_inset_into_section() {
        let sites = place_dowels(&[square(0.0, 20.0)], 4, 3.0);
        assert_eq!(sites.len(), 4);
        assert_relative_eq!(sites[0].x, 10.0);
        assert_relative_eq!(sites[0].y, 3.0);
        for s in &sites {
            assert!(s.x >= 3.0 - 1e-9 && s.x <= 17.0 + 1e-9);
            assert!(s.y >= 3.0 - 1e-9 && s.y <= 17.0 + 1e-9);
        }
    }

    #[test]
    fn test_sites_shared_by_perimeter() {
        let seams = [square(0.0, 30.0), square(100.0, 10.0)];
        let sites = place_dowels(&seams, 4, 1.0);
        assert_eq!(sites.len(), 4);
        assert_eq!(sites.iter().filter(|p| p.x < 50.0).count(), 3);
    }

    #[test]
    fn test_holes_are_skipped() {
        let mut hole = square(0.0, 10.0);
        hole.is_hole = true;
        assert!(place_dowels(&[hole], 3, 1.0).is_empty());
        assert!(place_dowels(&[square(0.0, 10.0)], 0, 1.0).is_empty());
    }

    #[test]
    fn test_hole_straddles_seam_with_clearance() {
        let settings = DowelSettings::default();
        let mesh = hole_mesh(&Point3::new(5.0, 5.0, 0.0), &settings, 0.1);
        let bb = mesh.bounds().unwrap();
        assert_relative_eq!(bb.min.z, -4.1, epsilon = 1e-12);
        assert_relative_eq!(bb.max.z, 4.1, epsilon = 1e-12);
        assert_relative_eq!(bb.max.x, 5.0 + 2.1, epsilon = 1e-12);
    }

    #[test]
    fn test_volumes_carry_connector_info() {
        let settings = DowelSettings::default();
        let hole = hole_volume(0, &Point3::origin(), &settings, 0.1, Transform::identity());
        assert_eq!(hole.volume_type, VolumeType::NegativeVolume);
        assert_eq!(hole.connector.map(|c| c.kind), Some(ConnectorKind::DowelHole));
        assert_eq!(hole.name, "dowel_hole_1");
        let pin = pin_volume(1, &settings);
        assert!(pin.is_model_part());
        assert_eq!(pin.connector.map(|c| c.kind), Some(ConnectorKind::DowelPin));
    }
}
