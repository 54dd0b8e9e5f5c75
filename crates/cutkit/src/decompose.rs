//! Partitioning of the working copy into pieces.
//!
//! Every solid volume is expressed in the seam frame, split there and the
//! fragments are mapped back into the volume's own coordinates, so the
//! volume transforms of the source survive the cut.

use cutkit_math::{Transform, Vec3};
use cutkit_mesh::{split_by_profile, BoundingBox, Profile, SeamLoop, TriangleMesh};
use cutkit_model::{ConnectorInfo, ConnectorKind, ModelObject, ModelVolume, VolumeType};
use tracing::debug;

use crate::attributes::CutAttributes;
use crate::config::CutConfig;
use crate::dowel::{hole_volume, pin_volume, place_dowels};
use crate::error::{CutError, Result};
use crate::groove::Groove;
use crate::request::Part;

/// Side of the seam a piece lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CutSide {
    Upper,
    Lower,
}

/// What a piece turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PieceKind {
    Fragment,
    DowelPin,
}

/// A volume of a piece with the index of the volume it was cut from.
#[derive(Debug, Clone)]
pub(crate) struct PieceVolume {
    pub volume: ModelVolume,
    pub source_index: Option<usize>,
}

/// A future result object, before placement and bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub name: String,
    pub side: CutSide,
    pub kind: PieceKind,
    pub keep: bool,
    pub volumes: Vec<PieceVolume>,
    /// Object-to-world transform.
    pub instance: Transform,
}

/// One disjoint region of a contour partition.
#[derive(Debug, Clone)]
pub(crate) struct Region {
    pub volume_index: usize,
    pub side: CutSide,
    /// Geometry in cut coordinates.
    pub mesh: TriangleMesh,
    pub is_solid: bool,
}

/// Regions in traversal order plus the seams of the solid volumes.
#[derive(Debug, Clone, Default)]
pub(crate) struct Partition {
    pub regions: Vec<Region>,
    pub seams: Vec<SeamLoop>,
}

impl Partition {
    /// Part descriptors seeded from the regions: upper regions selected,
    /// non-solid regions flagged as modifiers.
    pub fn default_parts(&self) -> Vec<Part> {
        self.regions
            .iter()
            .map(|r| Part {
                selected: r.side == CutSide::Upper,
                is_modifier: !r.is_solid,
            })
            .collect()
    }
}

/// Everything the decomposer reads from the request.
pub(crate) struct CutContext<'a> {
    pub object: &'a ModelObject,
    /// Object-to-world transform of the cut instance.
    pub instance: Transform,
    /// Cut-to-world transform; the cutting plane is local `z = 0`.
    pub world_from_cut: Transform,
    pub attributes: CutAttributes,
    pub config: &'a CutConfig,
}

impl CutContext<'_> {
    /// Volume mesh expressed in `frame` (frame-to-world), welded, together
    /// with the transform mapping frame coordinates back to the volume.
    fn volume_in(
        &self,
        volume: &ModelVolume,
        frame_inv: &Transform,
    ) -> Result<(TriangleMesh, Transform)> {
        let to_frame = frame_inv.then(&self.instance).then(&volume.transform);
        let from_frame = to_frame.inverse().ok_or_else(|| {
            CutError::GeometryDegenerate(format!(
                "volume '{}' has a singular transform",
                volume.name
            ))
        })?;
        let mesh = volume
            .mesh
            .transformed(&to_frame)
            .weld(self.config.weld_tolerance);
        Ok((mesh, from_frame))
    }

    fn degenerate(volume: &ModelVolume, err: impl std::fmt::Display) -> CutError {
        CutError::GeometryDegenerate(format!("volume '{}': {}", volume.name, err))
    }
}

/// The recess must not cut the lower side of a volume into more pieces
/// than a flat cut would.
fn check_recess_intact(
    volume: &ModelVolume,
    mesh: &TriangleMesh,
    recessed: &TriangleMesh,
    epsilon: f64,
) -> Result<()> {
    let flat = split_by_profile(mesh, &Profile::flat(), epsilon)
        .map_err(|e| CutContext::degenerate(volume, e))?;
    if flat.lower.is_empty() {
        return Ok(());
    }
    let expected = flat.lower.split_by_connectivity().len();
    let found = recessed.split_by_connectivity().len();
    if found > expected {
        return Err(CutError::ParameterOutOfRange(format!(
            "groove recess breaks through volume '{}' ({} lower pieces instead of {})",
            volume.name, found, expected
        )));
    }
    Ok(())
}

/// Plane and groove cuts: one upper and one lower piece.
///
/// `seam_frame` places the cut surfaces in the world. The upper piece is
/// bounded by `upper_profile` and the lower piece by `lower_profile`; with a
/// groove these differ and the recess is checked against the part's
/// cross-section.
pub(crate) fn decompose_two_sided(
    ctx: &CutContext<'_>,
    seam_frame: &Transform,
    upper_profile: &Profile,
    lower_profile: &Profile,
    groove: Option<&Groove>,
) -> Result<Vec<Piece>> {
    let frame_inv = seam_frame
        .inverse()
        .ok_or_else(|| CutError::GeometryDegenerate("singular cut transform".into()))?;
    let epsilon = ctx.config.seam_epsilon;
    let carves_groove = groove.is_some_and(Groove::is_active);

    let mut upper = Vec::new();
    let mut lower = Vec::new();
    let mut upper_bounds: Option<BoundingBox> = None;
    let mut lower_bounds: Option<BoundingBox> = None;
    let mut passive = Vec::new();
    let mut crossed = false;

    for (index, volume) in ctx.object.volumes.iter().enumerate() {
        if !volume.is_model_part() {
            passive.push(index);
            continue;
        }
        let (mesh, from_frame) = ctx.volume_in(volume, &frame_inv)?;

        let (top, bottom) = if carves_groove {
            let tongue = split_by_profile(&mesh, upper_profile, epsilon)
                .map_err(|e| CutContext::degenerate(volume, e))?;
            let recess = split_by_profile(&mesh, lower_profile, epsilon)
                .map_err(|e| CutContext::degenerate(volume, e))?;
            if tongue.is_crossed() || recess.is_crossed() {
                crossed = true;
                if let Some(g) = groove {
                    g.check_cross_section(&recess.seams, &mesh)?;
                }
                check_recess_intact(volume, &mesh, &recess.lower, epsilon)?;
            }
            (tongue.upper, recess.lower)
        } else {
            let split = split_by_profile(&mesh, upper_profile, epsilon)
                .map_err(|e| CutContext::degenerate(volume, e))?;
            check_volume(volume, &mesh, &split.upper, &split.lower, ctx.config.tolerance)?;
            crossed |= split.is_crossed();
            (split.upper, split.lower)
        };

        for (fragment, pieces, bounds, feature) in [
            (top, &mut upper, &mut upper_bounds, ConnectorKind::Tongue),
            (bottom, &mut lower, &mut lower_bounds, ConnectorKind::Recess),
        ] {
            if fragment.is_empty() {
                continue;
            }
            let local = fragment.transformed(&from_frame);
            let fragment_bounds = local.transformed(&volume.transform).bounds();
            *bounds = merge_bounds(*bounds, fragment_bounds);
            let mut piece = volume.with_mesh(local, volume.transform);
            if let Some(g) = groove.filter(|g| g.is_active()) {
                piece.connector = Some(ConnectorInfo {
                    kind: feature,
                    radius_tolerance: g.width_tolerance,
                    height_tolerance: g.depth_tolerance,
                });
            }
            pieces.push(PieceVolume {
                volume: piece,
                source_index: Some(index),
            });
        }
    }

    if carves_groove && !crossed {
        return Err(CutError::ParameterOutOfRange(
            "groove does not cross the object".into(),
        ));
    }
    debug!(
        upper = upper.len(),
        lower = lower.len(),
        modifiers = passive.len(),
        crossed,
        "two-sided decomposition"
    );

    // Non-solid volumes follow every side their bounds touch.
    for &index in &passive {
        let volume = &ctx.object.volumes[index];
        let Some(bb) = volume.mesh.transformed(&volume.transform).bounds() else {
            continue;
        };
        for (pieces, bounds) in [(&mut upper, &upper_bounds), (&mut lower, &lower_bounds)] {
            if bounds.is_some_and(|b| b.intersects(&bb, ctx.config.seam_epsilon)) {
                pieces.push(PieceVolume {
                    volume: volume.duplicate(),
                    source_index: Some(index),
                });
            }
        }
    }

    let name = &ctx.object.name;
    let mut pieces = Vec::with_capacity(2);
    for (volumes, side, suffix, flag) in [
        (upper, CutSide::Upper, "A", CutAttributes::KEEP_UPPER),
        (lower, CutSide::Lower, "B", CutAttributes::KEEP_LOWER),
    ] {
        if !volumes.iter().any(|v| v.volume.is_model_part()) {
            continue;
        }
        pieces.push(Piece {
            name: format!("{}_{}", name, suffix),
            side,
            kind: PieceKind::Fragment,
            keep: ctx.attributes.contains(flag),
            volumes,
            instance: ctx.instance,
        });
    }
    Ok(pieces)
}

/// Split every volume by the cut plane and then into connected components.
///
/// Traversal order is volume order; within a solid volume upper components
/// come before lower ones. Non-solid volumes are single regions on the side
/// of their centre.
pub(crate) fn partition(ctx: &CutContext<'_>) -> Result<Partition> {
    let cut_inv = ctx
        .world_from_cut
        .inverse()
        .ok_or_else(|| CutError::GeometryDegenerate("singular cut transform".into()))?;
    let flat = Profile::flat();
    let mut out = Partition::default();

    for (index, volume) in ctx.object.volumes.iter().enumerate() {
        let (mesh, _) = ctx.volume_in(volume, &cut_inv)?;
        if !volume.is_model_part() {
            let side = match mesh.bounds() {
                Some(bb) if bb.center().z < 0.0 => CutSide::Lower,
                _ => CutSide::Upper,
            };
            out.regions.push(Region {
                volume_index: index,
                side,
                mesh,
                is_solid: false,
            });
            continue;
        }

        let split = split_by_profile(&mesh, &flat, ctx.config.seam_epsilon)
            .map_err(|e| CutContext::degenerate(volume, e))?;
        check_volume(volume, &mesh, &split.upper, &split.lower, ctx.config.tolerance)?;
        for (fragment, side) in [(&split.upper, CutSide::Upper), (&split.lower, CutSide::Lower)] {
            for component in fragment.split_by_connectivity() {
                out.regions.push(Region {
                    volume_index: index,
                    side,
                    mesh: component,
                    is_solid: true,
                });
            }
        }
        out.seams.extend(split.seams);
    }

    debug!(
        regions = out.regions.len(),
        seams = out.seams.len(),
        "contour partition"
    );
    Ok(out)
}

/// One piece per selected part, followed by one piece per dowel pin.
pub(crate) fn contour_pieces(
    ctx: &CutContext<'_>,
    partition: &Partition,
    parts: &[Part],
    dowels_count: usize,
) -> Result<Vec<Piece>> {
    if parts.len() != partition.regions.len() {
        return Err(CutError::ParameterOutOfRange(format!(
            "{} parts given for {} contour regions",
            parts.len(),
            partition.regions.len()
        )));
    }
    let cut_inv = ctx
        .world_from_cut
        .inverse()
        .ok_or_else(|| CutError::GeometryDegenerate("singular cut transform".into()))?;
    let object_from_world = ctx.instance.inverse().ok_or_else(|| {
        CutError::GeometryDegenerate("singular instance transform".into())
    })?;
    let object_from_cut = object_from_world.then(&ctx.world_from_cut);
    let dowel = &ctx.config.dowel;
    let tolerance = ctx.config.tolerance;

    let solid_retained = parts
        .iter()
        .zip(&partition.regions)
        .any(|(p, r)| p.selected && !p.is_modifier && r.is_solid);
    let sites = if dowels_count > 0 && solid_retained {
        let sites = place_dowels(&partition.seams, dowels_count, dowel.effective_inset());
        if sites.is_empty() {
            return Err(CutError::ParameterOutOfRange(
                "no seam to place dowels on".into(),
            ));
        }
        sites
    } else {
        Vec::new()
    };

    let mut pieces = Vec::new();
    let selected = parts
        .iter()
        .zip(&partition.regions)
        .filter(|(p, _)| p.selected);
    for (k, (part, region)) in selected.enumerate() {
        let source = &ctx.object.volumes[region.volume_index];
        let to_cut = cut_inv.then(&ctx.instance).then(&source.transform);
        let from_cut = to_cut.inverse().ok_or_else(|| {
            CutError::GeometryDegenerate(format!(
                "volume '{}' has a singular transform",
                source.name
            ))
        })?;

        let mut volume = source.with_mesh(region.mesh.transformed(&from_cut), source.transform);
        if part.is_modifier && volume.is_model_part() {
            volume.volume_type = VolumeType::ParameterModifier;
        }
        let mut volumes = vec![PieceVolume {
            volume,
            source_index: Some(region.volume_index),
        }];

        if !part.is_modifier && region.is_solid {
            let inside_offset = match region.side {
                CutSide::Upper => dowel.height / 4.0,
                CutSide::Lower => -dowel.height / 4.0,
            };
            for (i, site) in sites.iter().enumerate() {
                let inside = site + Vec3::new(0.0, 0.0, inside_offset);
                if region.mesh.contains_point(&inside) {
                    volumes.push(PieceVolume {
                        volume: hole_volume(i, site, dowel, tolerance, object_from_cut),
                        source_index: None,
                    });
                }
            }
        }

        pieces.push(Piece {
            name: format!("{}_{}", ctx.object.name, k + 1),
            side: region.side,
            kind: PieceKind::Fragment,
            keep: true,
            volumes,
            instance: ctx.instance,
        });
    }

    for (i, site) in sites.iter().enumerate() {
        let world = ctx.world_from_cut.apply_point(site);
        pieces.push(Piece {
            name: format!("{}_dowel_{}", ctx.object.name, i + 1),
            side: CutSide::Upper,
            kind: PieceKind::DowelPin,
            keep: true,
            volumes: vec![PieceVolume {
                volume: pin_volume(i, dowel),
                source_index: None,
            }],
            instance: Transform::translation(world.x, world.y, 0.0),
        });
    }

    debug!(pieces = pieces.len(), dowels = sites.len(), "contour pieces");
    Ok(pieces)
}

/// Fragment volumes must add up to the source volume.
fn check_volume(
    volume: &ModelVolume,
    source: &TriangleMesh,
    upper: &TriangleMesh,
    lower: &TriangleMesh,
    tolerance: f64,
) -> Result<()> {
    let expected = source.volume();
    let actual = upper.volume() + lower.volume();
    let allowed = tolerance.max(expected.abs() * 1e-6);
    if (actual - expected).abs() > allowed {
        return Err(CutError::GeometryDegenerate(format!(
            "volume '{}' lost {:.4} mm³ in the cut",
            volume.name,
            expected - actual
        )));
    }
    Ok(())
}

fn merge_bounds(a: Option<BoundingBox>, b: Option<BoundingBox>) -> Option<BoundingBox> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.merged(&b)),
        (a, b) => a.or(b),
    }
}
