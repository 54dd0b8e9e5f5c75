#![warn(missing_docs)]

//! Cutting engine for multi-volume 3D print models.
//!
//! A [`CutRequest`] takes one instance of a [`ModelObject`] and a cut plane
//! and divides the object in one of three ways:
//!
//! - **plane**: an upper and a lower half, each closed by a cap on the seam;
//! - **groove**: halves joined by a drafted tongue and a matching recess
//!   that is larger by the configured clearance;
//! - **contour**: the connected regions on either side of the plane, of
//!   which the caller selects any subset, optionally with alignment dowels.
//!
//! Modifier volumes follow the pieces they overlap, results can be linked
//! as one assembly, and [`CutAttributes`] choose which halves are kept and
//! how they are laid on the plate.
//!
//! # Example
//!
//! ```
//! use cutkit::{CutAttributes, CutRequest};
//! use cutkit_math::Transform;
//! use cutkit_mesh::make_box;
//! use cutkit_model::{ModelObject, ModelVolume};
//!
//! let mut object = ModelObject::new("block");
//! object.add_volume(ModelVolume::new("block", make_box(20.0, 20.0, 20.0)));
//! object.add_instance(Transform::identity());
//!
//! let cut = Transform::translation(0.0, 0.0, 8.0);
//! let mut request = CutRequest::new(&object, 0, cut, CutAttributes::default())?;
//! let halves = request.perform_with_plane()?;
//! assert_eq!(halves.len(), 2);
//! # Ok::<(), cutkit::CutError>(())
//! ```

mod attributes;
mod config;
mod decompose;
mod dowel;
mod error;
mod groove;
mod post_process;
mod request;

pub use attributes::CutAttributes;
pub use config::{CutConfig, DowelSettings};
pub use dowel::place_dowels;
pub use error::{CutError, Result};
pub use groove::{Groove, GrooveProfiles, CUT_TOLERANCE};
pub use request::{CutMode, CutRequest, CutState, Part};

pub use cutkit_model::ModelObject;
