pub mod transform;
pub mod dual_quat;

pub use dual_quat::HalaDualQuat;
