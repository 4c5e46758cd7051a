pub mod position;
pub mod cluster;
pub mod linear;
pub mod dual_quaternion;
pub mod dispatcher;

pub use position::{
  get_geometry,
  get_global_position,
};
pub use cluster::compute_cluster_deformation;
pub use linear::compute_linear_deformation;
pub use dual_quaternion::compute_dual_quaternion_deformation;
pub use dispatcher::compute_skin_deformation;
