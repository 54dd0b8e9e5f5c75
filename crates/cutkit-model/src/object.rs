//! Objects, instances and the model container.

use cutkit_math::Transform;
use cutkit_mesh::{BoundingBox, TriangleMesh};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::ObjectId;
use crate::volume::{ConfigMap, ModelVolume};

/// One placement of an object on the plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInstance {
    /// Object-to-world transform.
    pub transform: Transform,
}

impl ModelInstance {
    /// Instance placed by `transform`.
    pub fn new(transform: Transform) -> Self {
        Self { transform }
    }
}

/// Assembly link shared by the objects produced from one cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutInfo {
    /// Identifier shared by all parts of the assembly.
    pub cut_id: Uuid,
    /// Number of cut generations the assembly went through.
    pub check_sum: u32,
    /// Number of connectors generated at the seams.
    pub connectors_cnt: u32,
}

impl CutInfo {
    /// Link for a fresh assembly.
    pub fn new() -> Self {
        Self {
            cut_id: Uuid::new_v4(),
            check_sum: 1,
            connectors_cnt: 0,
        }
    }

    /// Do both objects belong to the same assembly?
    pub fn is_linked_with(&self, other: &CutInfo) -> bool {
        self.cut_id == other.cut_id
    }
}

impl Default for CutInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A printable object: volumes sharing a set of instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    /// Identifier, fresh for every object.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Volumes in object coordinates.
    pub volumes: Vec<ModelVolume>,
    /// Placements.
    pub instances: Vec<ModelInstance>,
    /// Setting overrides.
    pub config: ConfigMap,
    /// Assembly link, set on cut results.
    pub cut_info: Option<CutInfo>,
}

impl ModelObject {
    /// Empty object without volumes or instances.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::fresh(),
            name: name.into(),
            volumes: Vec::new(),
            instances: Vec::new(),
            config: ConfigMap::new(),
            cut_info: None,
        }
    }

    /// Append a volume.
    pub fn add_volume(&mut self, volume: ModelVolume) -> &mut ModelVolume {
        self.volumes.push(volume);
        let last = self.volumes.len() - 1;
        &mut self.volumes[last]
    }

    /// Append an instance.
    pub fn add_instance(&mut self, transform: Transform) -> &mut ModelInstance {
        self.instances.push(ModelInstance::new(transform));
        let last = self.instances.len() - 1;
        &mut self.instances[last]
    }

    /// World bounding box of the model parts of instance `instance`.
    pub fn instance_bounds(&self, instance: usize) -> Option<BoundingBox> {
        let inst = self.instances.get(instance)?;
        self.volumes
            .iter()
            .filter(|v| v.is_model_part())
            .filter_map(|v| v.world_mesh(&inst.transform).bounds())
            .reduce(|a, b| a.merged(&b))
    }

    /// Enclosed volume of the model parts, in object units.
    pub fn solid_volume(&self) -> f64 {
        self.volumes
            .iter()
            .filter(|v| v.is_model_part())
            .map(|v| v.mesh.transformed(&v.transform).volume())
            .sum()
    }

    /// All model part geometry of instance `instance` merged in world coordinates.
    pub fn instance_mesh(&self, instance: usize) -> TriangleMesh {
        let mut out = TriangleMesh::new();
        if let Some(inst) = self.instances.get(instance) {
            for v in self.volumes.iter().filter(|v| v.is_model_part()) {
                out.merge(&v.world_mesh(&inst.transform));
            }
        }
        out
    }

    /// Does the object carry generated connector volumes?
    pub fn has_connectors(&self) -> bool {
        self.volumes.iter().any(|v| v.connector.is_some())
    }

    /// Deep copy with fresh identifiers for the object and its volumes.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ObjectId::fresh(),
            volumes: self.volumes.iter().map(ModelVolume::duplicate).collect(),
            ..self.clone()
        }
    }
}

/// Container owning model objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Objects in plate order.
    pub objects: Vec<ModelObject>,
}

impl Model {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object.
    pub fn add_object(&mut self, object: ModelObject) -> &mut ModelObject {
        self.objects.push(object);
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    /// Drop every object.
    pub fn clear_objects(&mut self) {
        self.objects.clear();
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
