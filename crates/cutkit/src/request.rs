//! One cut operation on one object instance.

use cutkit_math::{Transform, Vec3};
use cutkit_mesh::Profile;
use cutkit_model::{Model, ModelObject};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attributes::CutAttributes;
use crate::config::CutConfig;
use crate::decompose::{self, CutContext, Partition, PieceKind};
use crate::error::{CutError, Result};
use crate::groove::Groove;
use crate::post_process::{self, Finish};

/// Selection of one contour region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Emit this region as a result object.
    pub selected: bool,
    /// Emit the region as a modifier instead of a printable part.
    pub is_modifier: bool,
}

/// How the object is divided.
#[derive(Debug, Clone, PartialEq)]
pub enum CutMode {
    /// Split by the cut plane into an upper and a lower half.
    Plane,
    /// Split by the cut plane and into connected regions, then keep the
    /// selected regions.
    Contour {
        /// One entry per region, in [`CutRequest::contour_parts`] order.
        parts: Vec<Part>,
        /// Number of alignment dowels to generate.
        dowels_count: usize,
    },
    /// Split along a tongue-and-recess surface.
    Groove {
        /// Groove parameters.
        groove: Groove,
        /// In-plane placement of the groove relative to the cut plane.
        rotation: Transform,
        /// Link the halves as parts of one assembly.
        keep_as_parts: bool,
    },
}

impl CutMode {
    fn label(&self) -> &'static str {
        match self {
            CutMode::Plane => "plane",
            CutMode::Contour { .. } => "contour",
            CutMode::Groove { .. } => "groove",
        }
    }
}

/// Lifecycle of a [`CutRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutState {
    /// Ready to perform.
    Created,
    /// Pieces computed, results not yet assembled.
    Decomposed,
    /// Results available.
    Finalized,
    /// The cut failed; nothing was produced.
    Failed,
}

/// A single cut of one instance of an object.
///
/// The request works on a private copy of the object; the caller's model is
/// never touched. Results are produced once and handed out as new objects.
#[derive(Debug)]
pub struct CutRequest {
    model: Model,
    instance: usize,
    cut_matrix: Transform,
    attributes: CutAttributes,
    config: CutConfig,
    state: CutState,
    partition: Option<Partition>,
    results: Vec<ModelObject>,
    /// Lay independent halves side by side instead of stacked in place.
    pub set_offset_for_two_part: bool,
}

impl CutRequest {
    /// Prepare a cut of `instance` of `object` by the plane `z = 0` of
    /// `cut_matrix` (cut-to-world).
    pub fn new(
        object: &ModelObject,
        instance: usize,
        cut_matrix: Transform,
        attributes: CutAttributes,
    ) -> Result<Self> {
        if instance >= object.instances.len() {
            return Err(CutError::InstanceOutOfRange {
                index: instance,
                count: object.instances.len(),
            });
        }
        if cut_matrix.inverse().is_none() {
            return Err(CutError::GeometryDegenerate(
                "singular cut transform".into(),
            ));
        }
        let mut model = Model::new();
        model.add_object(object.clone());
        debug!(object = %object.name, instance, "cut request created");
        Ok(Self {
            model,
            instance,
            cut_matrix,
            attributes,
            config: CutConfig::default(),
            state: CutState::Created,
            partition: None,
            results: Vec::new(),
            set_offset_for_two_part: false,
        })
    }

    /// Builder: replace the engine configuration.
    pub fn with_config(mut self, config: CutConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CutState {
        self.state
    }

    /// Flags the request was created with.
    pub fn attributes(&self) -> CutAttributes {
        self.attributes
    }

    /// Engine configuration in use.
    pub fn config(&self) -> &CutConfig {
        &self.config
    }

    /// Cut-to-world transform.
    pub fn cut_matrix(&self) -> &Transform {
        &self.cut_matrix
    }

    /// Default part descriptors for a contour cut, one per region.
    ///
    /// Regions above the plane are selected; regions of non-printable volumes
    /// are marked as modifiers. The partition is computed once and reused by
    /// [`CutRequest::perform_by_contour`].
    pub fn contour_parts(&mut self) -> Result<Vec<Part>> {
        if let Some(partition) = &self.partition {
            return Ok(partition.default_parts());
        }
        let partition = decompose::partition(&self.context())?;
        let parts = partition.default_parts();
        self.partition = Some(partition);
        Ok(parts)
    }

    /// Run the cut. A request can be performed only once.
    pub fn perform(&mut self, mode: CutMode) -> Result<&[ModelObject]> {
        if self.state != CutState::Created {
            return Err(CutError::AlreadyPerformed);
        }
        let label = mode.label();
        match self.run(mode) {
            Ok(objects) => {
                info!(mode = label, objects = objects.len(), "cut performed");
                self.results = objects;
                self.state = CutState::Finalized;
                Ok(&self.results)
            }
            Err(err) => {
                warn!(mode = label, error = %err, "cut failed");
                self.state = CutState::Failed;
                Err(err)
            }
        }
    }

    /// Plane cut into an upper and a lower half.
    pub fn perform_with_plane(&mut self) -> Result<&[ModelObject]> {
        self.perform(CutMode::Plane)
    }

    /// Contour cut keeping the selected regions, with optional dowels.
    pub fn perform_by_contour(
        &mut self,
        parts: Vec<Part>,
        dowels_count: usize,
    ) -> Result<&[ModelObject]> {
        self.perform(CutMode::Contour {
            parts,
            dowels_count,
        })
    }

    /// Groove cut. `rotation_m` places the groove in the cut plane and must
    /// keep the plane normal.
    pub fn perform_with_groove(
        &mut self,
        groove: &Groove,
        rotation_m: &Transform,
        keep_as_parts: bool,
    ) -> Result<&[ModelObject]> {
        self.perform(CutMode::Groove {
            groove: *groove,
            rotation: *rotation_m,
            keep_as_parts,
        })
    }

    /// Results of the cut; empty until performed.
    pub fn objects(&self) -> &[ModelObject] {
        &self.results
    }

    /// Move the results out of the request.
    pub fn take_objects(&mut self) -> Vec<ModelObject> {
        std::mem::take(&mut self.results)
    }

    fn object(&self) -> &ModelObject {
        &self.model.objects[0]
    }

    fn context(&self) -> CutContext<'_> {
        let object = self.object();
        CutContext {
            object,
            instance: object.instances[self.instance].transform,
            world_from_cut: self.cut_matrix,
            attributes: self.attributes,
            config: &self.config,
        }
    }

    fn run(&mut self, mode: CutMode) -> Result<Vec<ModelObject>> {
        if !self.attributes.keeps_anything() {
            debug!("no side retained; nothing to do");
            return Ok(Vec::new());
        }

        let (pieces, link, grooves) = match mode {
            CutMode::Plane => {
                let flat = Profile::flat();
                let pieces = decompose::decompose_two_sided(
                    &self.context(),
                    &self.cut_matrix,
                    &flat,
                    &flat,
                    None,
                )?;
                (pieces, self.attributes.contains(CutAttributes::CUT_TO_PARTS), 0)
            }
            CutMode::Groove {
                groove,
                rotation,
                keep_as_parts,
            } => {
                check_groove_rotation(&rotation)?;
                let profiles = groove.profiles()?;
                let frame = self
                    .cut_matrix
                    .then(&rotation)
                    .then(&Transform::rotation_z(groove.angle.to_radians()));
                let pieces = decompose::decompose_two_sided(
                    &self.context(),
                    &frame,
                    &profiles.tongue,
                    &profiles.recess,
                    Some(&groove),
                )?;
                (pieces, keep_as_parts, usize::from(groove.is_active()))
            }
            CutMode::Contour {
                parts,
                dowels_count,
            } => {
                let partition = match self.partition.take() {
                    Some(partition) => partition,
                    None => decompose::partition(&self.context())?,
                };
                let pieces =
                    decompose::contour_pieces(&self.context(), &partition, &parts, dowels_count)?;
                (pieces, self.attributes.contains(CutAttributes::CUT_TO_PARTS), 0)
            }
        };
        self.state = CutState::Decomposed;

        // One per dowel pin, one per groove.
        let connectors = pieces
            .iter()
            .filter(|p| p.kind == PieceKind::DowelPin)
            .count()
            + grooves;
        let finish = Finish {
            source: self.object(),
            attributes: self.attributes,
            world_from_cut: self.cut_matrix,
            link,
            offset_two_parts: self.set_offset_for_two_part,
            plate_gap: self.config.plate_gap,
            connectors: u32::try_from(connectors).unwrap_or(u32::MAX),
        };
        Ok(post_process::finish(pieces, &finish))
    }
}

/// The groove placement must keep the cut plane in place.
fn check_groove_rotation(rotation: &Transform) -> Result<()> {
    let normal = rotation.apply_vec(&Vec3::z());
    let shift = rotation.translation_part().z;
    if (normal - Vec3::z()).norm() > 1e-6 || shift.abs() > 1e-9 || rotation.determinant() <= 0.0 {
        return Err(CutError::ParameterOutOfRange(
            "groove rotation must keep the cut plane".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutkit_mesh::make_box;
    use cutkit_model::ModelVolume;

    fn box_object() -> ModelObject {
        let mut object = ModelObject::new("box");
        object.add_volume(ModelVolume::new("box", make_box(10.0, 10.0, 10.0)));
        object.add_instance(Transform::identity());
        object
    }

    #[test]
    fn test_instance_out_of_range() {
        let err = CutRequest::new(&box_object(), 1, Transform::identity(), CutAttributes::default());
        assert!(matches!(
            err,
            Err(CutError::InstanceOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_singular_cut_rejected() {
        let err = CutRequest::new(
            &box_object(),
            0,
            Transform::scale(1.0, 1.0, 0.0),
            CutAttributes::default(),
        );
        assert!(matches!(err, Err(CutError::GeometryDegenerate(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CutConfig::default();
        config.seam_epsilon = 0.0;
        let request = CutRequest::new(&box_object(), 0, Transform::identity(), CutAttributes::default())
            .unwrap()
            .with_config(config);
        assert!(matches!(request, Err(CutError::InvalidConfig(_))));
    }

    #[test]
    fn test_state_transitions() {
        let mut request = CutRequest::new(
            &box_object(),
            0,
            Transform::translation(0.0, 0.0, 5.0),
            CutAttributes::default(),
        )
        .unwrap();
        assert_eq!(request.state(), CutState::Created);
        assert_eq!(request.perform_with_plane().unwrap().len(), 2);
        assert_eq!(request.state(), CutState::Finalized);
        assert_eq!(request.perform_with_plane(), Err(CutError::AlreadyPerformed));
        assert_eq!(request.take_objects().len(), 2);
        assert!(request.objects().is_empty());
    }

    #[test]
    fn test_failure_moves_to_failed() {
        let mut request = CutRequest::new(
            &box_object(),
            0,
            Transform::translation(0.0, 0.0, 5.0),
            CutAttributes::default(),
        )
        .unwrap();
        let tilted = Transform::rotation_x(0.3);
        let result = request.perform_with_groove(&Groove::new(2.0, 4.0, 20.0, 0.0), &tilted, true);
        assert!(matches!(result, Err(CutError::ParameterOutOfRange(_))));
        assert_eq!(request.state(), CutState::Failed);
        assert_eq!(request.perform_with_plane(), Err(CutError::AlreadyPerformed));
    }

    #[test]
    fn test_contour_parts_defaults() {
        let mut request = CutRequest::new(
            &box_object(),
            0,
            Transform::translation(0.0, 0.0, 5.0),
            CutAttributes::default(),
        )
        .unwrap();
        let parts = request.contour_parts().unwrap();
        assert_eq!(
            parts,
            vec![
                Part { selected: true, is_modifier: false },
                Part { selected: false, is_modifier: false },
            ]
        );
        // Cached partition gives the same answer.
        assert_eq!(request.contour_parts().unwrap(), parts);
    }

    #[test]
    fn test_contour_part_count_mismatch() {
        let mut request = CutRequest::new(
            &box_object(),
            0,
            Transform::translation(0.0, 0.0, 5.0),
            CutAttributes::default(),
        )
        .unwrap();
        let result = request.perform_by_contour(vec![Part::default()], 0);
        assert!(matches!(result, Err(CutError::ParameterOutOfRange(_))));
    }

    #[test]
    fn test_request_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CutRequest>();
    }
}
