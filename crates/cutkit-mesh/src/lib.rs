#![warn(missing_docs)]

//! Triangle mesh operations for the cutkit cutting engine.
//!
//! Provides an indexed [`TriangleMesh`] with the bookkeeping a cutter needs
//! (welding, volume, connectivity, manifold checks), piecewise-linear cut
//! [`Profile`]s, and [`split_by_surface`], which splits a closed mesh into
//! closed upper and lower fragments and reports the seam loops.
//!
//! # Example
//!
//! ```
//! use cutkit_math::Transform;
//! use cutkit_mesh::{make_box, split_by_plane};
//!
//! let mesh = make_box(10.0, 10.0, 10.0).transformed(&Transform::translation(0.0, 0.0, -5.0));
//! let split = split_by_plane(&mesh, 1e-9).unwrap();
//! assert!((split.upper.volume() - 500.0).abs() < 1e-9);
//! ```

mod error;
mod mesh;
mod primitives;
mod profile;
mod seam;
mod split;
mod triangulate;

pub use error::{MeshError, Result};
pub use mesh::{BoundingBox, TriangleMesh};
pub use primitives::{make_box, make_cylinder};
pub use profile::{CutSurface, Profile};
pub use seam::{SeamLoop, SeamSample};
pub use split::{split_by_plane, split_by_profile, split_by_surface, SurfaceSplit};
