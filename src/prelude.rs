pub use crate::error::HalaRendererError;
pub use crate::config::HalaSceneCacheConfig;
pub use crate::math::HalaDualQuat;
pub use crate::scene::cpu::HalaScene;
pub use crate::scene::cpu::skin::{
  HalaLinkMode,
  HalaSkinningType,
};
pub use crate::scene::gpu::{
  HalaGpuBackend,
  HalaGpuBackendRef,
  HalaHeadlessBackend,
  HalaRenderState,
  HalaSceneCache,
  HalaLightRegistry,
};
pub use crate::scene::loader::{
  HalaGltfLoader,
  HalaSceneCacheBuilder,
  HalaCacheBuildStats,
};
pub use crate::skinning::compute_skin_deformation;
pub use crate::renderer::{
  HalaSceneRenderer,
  HalaFrameStats,
};
pub use crate::scene_context::{
  HalaSceneContext,
  HalaSceneStatus,
};
