//! Volumes: the meshes an object is built from.

use std::collections::BTreeMap;

use cutkit_math::Transform;
use cutkit_mesh::TriangleMesh;
use serde::{Deserialize, Serialize};

use crate::ids::ObjectId;

/// Ordered per-object or per-volume setting overrides.
pub type ConfigMap = BTreeMap<String, String>;

/// Role of a volume inside its object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeType {
    /// Printable solid.
    #[default]
    ModelPart,
    /// Region subtracted from the solid parts.
    NegativeVolume,
    /// Region overriding print settings.
    ParameterModifier,
    /// Region where supports are suppressed.
    SupportBlocker,
    /// Region where supports are forced.
    SupportEnforcer,
}

impl VolumeType {
    /// Printable solid geometry.
    pub fn is_model_part(self) -> bool {
        self == VolumeType::ModelPart
    }

    /// Anything that only modifies the solid parts.
    pub fn is_modifier(self) -> bool {
        !self.is_model_part()
    }
}

/// Kind of connector geometry a volume was generated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorKind {
    /// Standalone alignment pin.
    DowelPin,
    /// Negative volume receiving a pin.
    DowelHole,
    /// Protruding groove feature.
    Tongue,
    /// Recessed groove feature.
    Recess,
}

/// Connector metadata carried by generated volumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectorInfo {
    /// Connector kind.
    pub kind: ConnectorKind,
    /// Radial clearance added to the nominal size.
    pub radius_tolerance: f64,
    /// Axial clearance added to the nominal size.
    pub height_tolerance: f64,
}

/// Where a cut volume came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSource {
    /// Object the volume was cut from.
    pub object_id: ObjectId,
    /// Index of the source volume in that object.
    pub volume_index: usize,
}

/// A mesh with a role, a placement and settings inside a [`ModelObject`].
///
/// [`ModelObject`]: crate::ModelObject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVolume {
    /// Identifier, fresh for every volume.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Geometry in volume-local coordinates.
    pub mesh: TriangleMesh,
    /// Volume-to-object transform.
    pub transform: Transform,
    /// Role of the volume.
    pub volume_type: VolumeType,
    /// Extruder assignment.
    pub extruder: Option<u32>,
    /// Material assignment.
    pub material_id: Option<String>,
    /// Setting overrides.
    pub config: ConfigMap,
    /// Source volume, set on cut results.
    pub source: Option<VolumeSource>,
    /// Connector metadata, set on generated connector volumes.
    pub connector: Option<ConnectorInfo>,
}

impl ModelVolume {
    /// Create a model part volume with an identity transform.
    pub fn new(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            id: ObjectId::fresh(),
            name: name.into(),
            mesh,
            transform: Transform::identity(),
            volume_type: VolumeType::ModelPart,
            extruder: None,
            material_id: None,
            config: ConfigMap::new(),
            source: None,
            connector: None,
        }
    }

    /// Builder: set the volume type.
    pub fn with_type(mut self, volume_type: VolumeType) -> Self {
        self.volume_type = volume_type;
        self
    }

    /// Builder: set the volume-to-object transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Printable solid?
    pub fn is_model_part(&self) -> bool {
        self.volume_type.is_model_part()
    }

    /// Mesh in world coordinates for the given instance transform.
    pub fn world_mesh(&self, instance: &Transform) -> TriangleMesh {
        self.mesh.transformed(&instance.then(&self.transform))
    }

    /// Copy with a fresh identifier and the same geometry and settings.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ObjectId::fresh(),
            ..self.clone()
        }
    }

    /// Copy of the metadata (name, type, assignments, config) around new geometry.
    pub fn with_mesh(&self, mesh: TriangleMesh, transform: Transform) -> Self {
        Self {
            id: ObjectId::fresh(),
            name: self.name.clone(),
            mesh,
            transform,
            volume_type: self.volume_type,
            extruder: self.extruder,
            material_id: self.material_id.clone(),
            config: self.config.clone(),
            source: self.source,
            connector: self.connector,
        }
    }
}
