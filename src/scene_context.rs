use std::path::{
  Path,
  PathBuf,
};

use crate::config::HalaSceneCacheConfig;
use crate::error::HalaRendererError;
use crate::renderer::{
  HalaSceneRenderer,
  HalaFrameStats,
};
use crate::scene::cpu::HalaScene;
use crate::scene::gpu::{
  HalaGpuBackendRef,
  HalaLightRegistry,
  HalaRenderState,
  HalaSceneCache,
};
use crate::scene::loader::{
  HalaSceneCacheBuilder,
  HalaCacheBuildStats,
};

/// The load and refresh status of a scene context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaSceneStatus {
  Unloaded,
  MustBeLoaded,
  MustBeRefreshed,
  Refreshed,
}

/// A scene file with its caches, its clock and the selected pose.
pub struct HalaSceneContext {
  pub file_name: PathBuf,
  pub config: HalaSceneCacheConfig,
  status: HalaSceneStatus,

  // The caches are dropped before the scene.
  cache: Option<HalaSceneCache>,
  scene: Option<HalaScene>,
  renderer: HalaSceneRenderer,
  build_stats: HalaCacheBuildStats,

  current_time: f64,
  frame_time: f64,
  start: f64,
  stop: f64,
  pose_index: Option<u32>,
  pause: bool,
}

/// The Drop implementation of the scene context.
impl Drop for HalaSceneContext {
  fn drop(&mut self) {
    log::debug!("A HalaSceneContext \"{:?}\" dropped.", self.file_name);
  }
}

/// The implementation of the scene context.
impl HalaSceneContext {
  /// Create a context waiting for its file to be loaded.
  /// param path: The scene file.
  /// param config: The configuration.
  /// return: The context.
  pub fn new<P: AsRef<Path>>(path: P, config: HalaSceneCacheConfig) -> Result<Self, HalaRendererError> {
    let path = path.as_ref();
    config.validate()?;
    if !path.is_file() {
      return Err(HalaRendererError::new(&format!("The scene file \"{:?}\" does not exist.", path), None));
    }
    let is_supported = path.extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "gltf" | "glb"))
      .unwrap_or(false);
    if !is_supported {
      return Err(HalaRendererError::new(&format!("Unsupported scene file \"{:?}\".", path), None));
    }

    let frame_time = config.frame_time();
    log::debug!("A HalaSceneContext \"{:?}\" created.", path);
    Ok(Self {
      file_name: path.to_path_buf(),
      renderer: HalaSceneRenderer::new(config.clone()),
      config,
      status: HalaSceneStatus::MustBeLoaded,
      cache: None,
      scene: None,
      build_stats: HalaCacheBuildStats::default(),
      current_time: 0.0,
      frame_time,
      start: 0.0,
      stop: 0.0,
      pose_index: None,
      pause: false,
    })
  }

  /// Import the file, check it and build its caches.
  /// The first animation stack is selected.
  /// param backend: The GPU backend.
  /// param light_registry: The registry assigning light slots.
  pub fn load_file(&mut self, backend: &HalaGpuBackendRef, light_registry: &HalaLightRegistry) -> Result<(), HalaRendererError> {
    if self.status != HalaSceneStatus::MustBeLoaded {
      return Err(HalaRendererError::new(&format!("The scene \"{:?}\" is not waiting to be loaded.", self.file_name), None));
    }

    let result = self.load_scene(backend, light_registry);
    if result.is_err() {
      self.status = HalaSceneStatus::Unloaded;
    }
    result
  }

  fn load_scene(&mut self, backend: &HalaGpuBackendRef, light_registry: &HalaLightRegistry) -> Result<(), HalaRendererError> {
    let mut scene = HalaScene::load(&self.file_name)?;

    let details = scene.validate();
    if !details.is_empty() {
      log::error!("The scene \"{:?}\" failed the integrity check:", self.file_name);
      for detail in details.iter() {
        log::error!("  {}", detail);
      }
      return Err(HalaRendererError::new(
        &format!("The scene \"{:?}\" failed the integrity check with {} problems.", self.file_name, details.len()),
        None));
    }

    let triangulated = scene.triangulate();
    if triangulated > 0 {
      log::debug!("{} meshes triangulated.", triangulated);
    }
    scene.update_node_hierarchies();

    for (i, stack) in scene.anim_stacks.iter().enumerate() {
      log::debug!("Animation stack {}: \"{}\".", i, stack.name);
    }
    if !scene.anim_stacks.is_empty() {
      scene.set_current_anim_stack(Some(0))?;
    }

    let mut cache = HalaSceneCache::new(backend, light_registry);
    self.build_stats = HalaSceneCacheBuilder::new(self.config.clone()).build(&scene, &mut cache);

    self.cache = Some(cache);
    self.scene = Some(scene);
    self.pose_index = None;
    self.update_time_bounds();
    self.status = HalaSceneStatus::MustBeRefreshed;
    Ok(())
  }

  fn update_time_bounds(&mut self) {
    let (start, stop) = self.scene.as_ref()
      .and_then(|scene| scene.current_anim_stack())
      .map(|stack| (stack.start, stack.stop))
      .unwrap_or((0.0, 0.0));
    self.start = start;
    self.stop = stop;
    self.current_time = start;
  }

  /// Select an animation stack, the light caches are rebound to its base layer.
  /// param index: The animation stack index.
  pub fn set_current_anim_stack(&mut self, index: u32) -> Result<(), HalaRendererError> {
    let (Some(scene), Some(cache)) = (self.scene.as_mut(), self.cache.as_mut()) else {
      return Err(HalaRendererError::new("The scene is not loaded.", None));
    };
    scene.set_current_anim_stack(Some(index))?;

    cache.lights.clear();
    cache.failed_lights.clear();
    HalaSceneCacheBuilder::new(self.config.clone()).build(scene, cache);

    self.update_time_bounds();
    self.status = HalaSceneStatus::MustBeRefreshed;
    Ok(())
  }

  /// Select the pose to draw, None for the animated pose.
  /// param index: The pose index.
  pub fn set_current_pose(&mut self, index: Option<u32>) -> Result<(), HalaRendererError> {
    let scene = self.scene.as_ref()
      .ok_or(HalaRendererError::new("The scene is not loaded.", None))?;
    if let Some(index) = index {
      if index as usize >= scene.poses.len() {
        return Err(HalaRendererError::new(&format!("The pose {} does not exist.", index), None));
      }
    }
    self.pose_index = index;
    self.status = HalaSceneStatus::MustBeRefreshed;
    Ok(())
  }

  pub fn set_pause(&mut self, pause: bool) {
    self.pause = pause;
  }

  /// Advance the clock by one frame, wrapping from the stop time to the start time.
  pub fn on_timer_click(&mut self) {
    if self.scene.is_none() || self.pause || self.stop <= self.start {
      return;
    }
    let next_time = self.current_time + self.frame_time;
    self.current_time = if next_time > self.stop { self.start } else { next_time };
    self.status = HalaSceneStatus::MustBeRefreshed;
  }

  /// Draw the scene at the current time.
  /// param render_state: The camera and shader state.
  /// return: What the frame drew, None before the scene is loaded.
  pub fn on_display(&mut self, render_state: &HalaRenderState) -> Option<HalaFrameStats> {
    let (Some(scene), Some(cache)) = (self.scene.as_ref(), self.cache.as_ref()) else {
      return None;
    };
    let pose = self.pose_index.and_then(|index| scene.poses.get(index as usize));
    let stats = self.renderer.render(scene, cache, render_state, self.current_time, pose);
    self.status = HalaSceneStatus::Refreshed;
    Some(stats)
  }

  pub fn status(&self) -> HalaSceneStatus {
    self.status
  }

  pub fn scene(&self) -> Option<&HalaScene> {
    self.scene.as_ref()
  }

  pub fn cache(&self) -> Option<&HalaSceneCache> {
    self.cache.as_ref()
  }

  /// What the last cache build did.
  pub fn build_stats(&self) -> HalaCacheBuildStats {
    self.build_stats
  }

  pub fn current_time(&self) -> f64 {
    self.current_time
  }

  /// The start and stop times of the current animation stack.
  pub fn time_bounds(&self) -> (f64, f64) {
    (self.start, self.stop)
  }

  pub fn is_paused(&self) -> bool {
    self.pause
  }
}
