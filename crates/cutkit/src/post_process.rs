//! Placement and bookkeeping of the pieces of a cut.

use cutkit_math::{Dir3, Transform, Vec3};
use cutkit_mesh::BoundingBox;
use cutkit_model::{CutInfo, ModelInstance, ModelObject, VolumeSource};
use tracing::debug;
use uuid::Uuid;

use crate::attributes::CutAttributes;
use crate::decompose::{CutSide, Piece, PieceKind};

/// Knobs for turning pieces into result objects.
pub(crate) struct Finish<'a> {
    pub source: &'a ModelObject,
    pub attributes: CutAttributes,
    pub world_from_cut: Transform,
    /// Link the fragments into one assembly.
    pub link: bool,
    /// Lay unlinked upper and lower halves side by side.
    pub offset_two_parts: bool,
    pub plate_gap: f64,
    pub connectors: u32,
}

/// Drop unwanted pieces, place the rest on the plate and build the objects.
///
/// Output order follows the pieces: fragments first, dowel pins last.
pub(crate) fn finish(mut pieces: Vec<Piece>, opts: &Finish<'_>) -> Vec<ModelObject> {
    pieces.retain(|p| p.keep);

    let normal = opts.world_from_cut.apply_vec(&Vec3::z());
    let normal = if normal.norm() > 0.0 {
        normal.normalize()
    } else {
        Vec3::z()
    };
    let cut_x = opts.world_from_cut.apply_vec(&Vec3::x());

    for piece in pieces.iter_mut().filter(|p| p.kind == PieceKind::Fragment) {
        if let Some(rotation) = orientation(piece.side, opts.attributes, &normal, &cut_x) {
            if let Some(bb) = world_bounds(piece) {
                piece.instance = rotation.about_point(&bb.center()).then(&piece.instance);
            }
        }
    }
    for piece in pieces.iter_mut() {
        if let Some(bb) = world_bounds(piece) {
            piece.instance = Transform::translation(0.0, 0.0, -bb.min.z).then(&piece.instance);
        }
    }

    let fragments: Vec<usize> = pieces
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind == PieceKind::Fragment)
        .map(|(i, _)| i)
        .collect();
    if opts.offset_two_parts && !opts.link {
        if let [a, b] = fragments[..] {
            if pieces[a].side == CutSide::Upper && pieces[b].side == CutSide::Lower {
                lay_side_by_side(&mut pieces, a, b, opts.plate_gap);
            }
        }
    }

    let cut_info = opts.link.then(|| {
        let previous = opts.source.cut_info;
        CutInfo {
            cut_id: previous.map_or_else(Uuid::new_v4, |c| c.cut_id),
            check_sum: previous.map_or(1, |c| c.check_sum + 1),
            connectors_cnt: opts.connectors,
        }
    });

    let objects: Vec<ModelObject> = pieces
        .into_iter()
        .map(|piece| {
            let info = match piece.kind {
                PieceKind::Fragment => cut_info,
                PieceKind::DowelPin => None,
            };
            into_object(piece, opts.source, info)
        })
        .collect();
    debug!(objects = objects.len(), linked = opts.link, "cut finished");
    objects
}

/// Rotation laying a piece down, if its flags ask for one.
///
/// Place-on-cut wins over flip when both are set.
fn orientation(
    side: CutSide,
    attributes: CutAttributes,
    normal: &Vec3,
    cut_x: &Vec3,
) -> Option<Transform> {
    let (place, flip, face) = match side {
        CutSide::Upper => (
            CutAttributes::PLACE_ON_CUT_UPPER,
            CutAttributes::FLIP_UPPER,
            -normal,
        ),
        CutSide::Lower => (
            CutAttributes::PLACE_ON_CUT_LOWER,
            CutAttributes::FLIP_LOWER,
            *normal,
        ),
    };
    if attributes.contains(place) {
        // The cut face looks along `face`; turn it to face the plate.
        Some(Transform::rotation_between(&face, &(-Vec3::z())))
    } else if attributes.contains(flip) {
        let axis = if cut_x.norm() > 0.0 { cut_x.normalize() } else { Vec3::x() };
        Some(Transform::rotation_about_axis(
            &Dir3::new_normalize(axis),
            std::f64::consts::PI,
        ))
    } else {
        None
    }
}

/// World bounds of the printable volumes of a piece, falling back to all
/// volumes for modifier-only pieces.
fn world_bounds(piece: &Piece) -> Option<BoundingBox> {
    let bounds = |solid_only: bool| {
        piece
            .volumes
            .iter()
            .filter(|v| !solid_only || v.volume.is_model_part())
            .filter_map(|v| v.volume.world_mesh(&piece.instance).bounds())
            .reduce(|a, b| a.merged(&b))
    };
    bounds(true).or_else(|| bounds(false))
}

fn lay_side_by_side(pieces: &mut [Piece], upper: usize, lower: usize, gap: f64) {
    let (Some(ub), Some(lb)) = (world_bounds(&pieces[upper]), world_bounds(&pieces[lower])) else {
        return;
    };
    let dx = ub.max.x - lb.min.x + gap;
    let piece = &mut pieces[lower];
    piece.instance = Transform::translation(dx, 0.0, 0.0).then(&piece.instance);
}

/// Volume order in a result object: printable parts, then modifiers, then
/// connectors.
fn volume_rank(piece_volume: &crate::decompose::PieceVolume) -> u8 {
    let v = &piece_volume.volume;
    if v.connector.is_some() && !v.is_model_part() {
        2
    } else if v.is_model_part() {
        0
    } else {
        1
    }
}

fn into_object(mut piece: Piece, source: &ModelObject, cut_info: Option<CutInfo>) -> ModelObject {
    piece.volumes.sort_by_key(volume_rank);

    let mut object = ModelObject::new(piece.name);
    object.config = source.config.clone();
    object.cut_info = cut_info;
    object.instances.push(ModelInstance::new(piece.instance));
    object.volumes = piece
        .volumes
        .into_iter()
        .map(|pv| {
            let mut volume = pv.volume;
            volume.source = pv.source_index.map(|volume_index| VolumeSource {
                object_id: source.id,
                volume_index,
            });
            volume
        })
        .collect();
    object
}
