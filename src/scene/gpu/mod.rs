pub mod backend;
pub mod headless;
pub mod render_state;
pub mod mesh;
pub mod material;
pub mod light;
pub mod texture;
pub mod scene;

pub use backend::{
  HalaGpuBackend,
  HalaGpuBackendRef,
};
pub use headless::HalaHeadlessBackend;
pub use render_state::HalaRenderState;
pub use mesh::{
  HalaSubMesh,
  HalaMeshCache,
  HalaMeshCacheData,
};
pub use material::HalaMaterialCache;
pub use light::{
  HalaLightCache,
  HalaLightRegistry,
};
pub use texture::HalaTextureCache;
pub use scene::HalaSceneCache;
