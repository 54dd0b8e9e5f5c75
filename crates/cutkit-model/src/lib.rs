#![warn(missing_docs)]

//! Scene model for the cutkit cutting engine.
//!
//! A [`Model`] owns [`ModelObject`]s; each object is a set of
//! [`ModelVolume`]s (solid parts and modifier regions) placed on the plate
//! by one or more [`ModelInstance`]s. Objects produced by a cut carry a
//! [`CutInfo`] linking them into an assembly, and their volumes record the
//! [`VolumeSource`] they were cut from.
//!
//! The whole model serializes to JSON through serde.

mod ids;
mod object;
mod volume;

pub use ids::ObjectId;
pub use object::{CutInfo, Model, ModelInstance, ModelObject};
pub use volume::{ConfigMap, ConnectorInfo, ConnectorKind, ModelVolume, VolumeSource, VolumeType};
