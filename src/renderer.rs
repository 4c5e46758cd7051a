use glam::{
  DMat4,
  DVec4,
};
use rayon::prelude::*;

use crate::config::HalaSceneCacheConfig;
use crate::scene::cpu::HalaScene;
use crate::scene::cpu::node::HalaNodeAttribute;
use crate::scene::cpu::pose::HalaPose;
use crate::scene::cpu::scene::ROOT_NODE;
use crate::scene::gpu::{
  HalaSceneCache,
  HalaRenderState,
  HalaMaterialCache,
  HalaLightCache,
};
use crate::skinning::{
  get_geometry,
  get_global_position,
  compute_skin_deformation,
};

/// What one frame drew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaFrameStats {
  pub drawn_meshes: u32,
  pub skinned_meshes: u32,
  pub draw_calls: u32,
  pub lights: u32,
}

/// A mesh node found by the traversal.
struct HalaMeshInstance {
  node: u32,
  mesh: u32,
  /// The global transform with the geometric offset folded in.
  global_offset_position: DMat4,
}

/// The per-frame scene renderer.
pub struct HalaSceneRenderer {
  pub config: HalaSceneCacheConfig,

  // Statistic.
  pub total_frames: u64,
  pub stat_frames: u64,
  pub last_stat_time: std::time::Instant,
  pub elapsed_time: std::time::Duration,
  pub total_cpu_nanoseconds: u128,
}

/// The implementation of the scene renderer.
impl HalaSceneRenderer {
  /// Create a new renderer.
  /// param config: The configuration.
  /// return: The renderer.
  pub fn new(config: HalaSceneCacheConfig) -> Self {
    log::debug!("A HalaSceneRenderer created.");
    Self {
      config,
      total_frames: 0,
      stat_frames: 0,
      last_stat_time: std::time::Instant::now(),
      elapsed_time: std::time::Duration::ZERO,
      total_cpu_nanoseconds: 0,
    }
  }

  /// Draw the scene at a time.
  /// Deformation of all skinned meshes finishes before the first upload,
  /// uploads and draws run on the calling thread.
  /// param scene: The scene.
  /// param cache: The caches built for the scene.
  /// param render_state: The camera and shader state.
  /// param time: The time in seconds.
  /// param pose: The optional bind or rest pose.
  /// return: What the frame drew.
  pub fn render(
    &mut self,
    scene: &HalaScene,
    cache: &HalaSceneCache,
    render_state: &HalaRenderState,
    time: f64,
    pose: Option<&HalaPose>,
  ) -> HalaFrameStats {
    let frame_start = std::time::Instant::now();
    let mut stats = HalaFrameStats::default();

    // Walk the hierarchy with the global transform of the parent.
    let mut mesh_instances = Vec::new();
    let mut light_instances = Vec::new();
    let mut stack: Vec<(u32, Option<DMat4>)> = vec![(ROOT_NODE, None)];
    while let Some((node_index, parent_global_position)) = stack.pop() {
      let Some(node) = scene.nodes.get(node_index as usize) else {
        continue;
      };
      let global_position = get_global_position(scene, node_index, time, pose, parent_global_position.as_ref());

      for attribute in node.attributes.iter() {
        match *attribute {
          HalaNodeAttribute::Mesh(mesh_index) if cache.meshes.contains_key(&mesh_index) => {
            mesh_instances.push(HalaMeshInstance {
              node: node_index,
              mesh: mesh_index,
              global_offset_position: global_position * get_geometry(scene, node_index),
            });
          },
          HalaNodeAttribute::Light(light_index) if cache.lights.contains_key(&light_index) => {
            light_instances.push((light_index, global_position));
          },
          _ => (),
        }
      }

      stack.extend(node.children.iter().rev().map(|child| (*child, Some(global_position))));
    }

    // Lights.
    {
      let mut backend = cache.backend.borrow_mut();
      if cache.lights.is_empty() {
        HalaLightCache::initialize_environment(&mut *backend, render_state);
        stats.lights = 1;
      } else {
        let mut light_count = 0;
        for (light_index, global_position) in light_instances.iter() {
          let Some(light) = cache.lights.get(light_index) else {
            continue;
          };
          if light.set_light(&mut *backend, render_state, time, global_position) {
            light_count = light_count.max(light.index() + 1);
            stats.lights += 1;
          }
        }
        render_state.set_light_count(&mut *backend, light_count);
      }
    }

    // Deform the skinned meshes, one scratch array per instance.
    let config = &self.config;
    let deform = |instance: &HalaMeshInstance| -> Option<Vec<DVec4>> {
      let mesh = scene.meshes.get(instance.mesh as usize)?;
      if !mesh.has_deformation() {
        return None;
      }
      let mut vertices = mesh.control_points_homogeneous();
      compute_skin_deformation(scene, &instance.global_offset_position, mesh, time, &mut vertices, pose, config);
      Some(vertices)
    };
    let deformed: Vec<Option<Vec<DVec4>>> = if self.config.parallel_skinning {
      mesh_instances.par_iter().map(deform).collect()
    } else {
      mesh_instances.iter().map(deform).collect()
    };

    // Upload and draw.
    for (instance, vertices) in mesh_instances.iter().zip(deformed.iter()) {
      let (Some(mesh_cache), Some(mesh), Some(node)) = (
        cache.meshes.get(&instance.mesh),
        scene.meshes.get(instance.mesh as usize),
        scene.nodes.get(instance.node as usize),
      ) else {
        continue;
      };

      if let Some(vertices) = vertices {
        mesh_cache.update_vertex_position(mesh, vertices);
        stats.skinned_meshes += 1;
      }

      mesh_cache.begin_draw();
      for (slot, sub_mesh) in mesh_cache.sub_meshes().iter().enumerate() {
        if sub_mesh.triangle_count == 0 {
          continue;
        }
        let material = node.materials.get(slot).and_then(|index| cache.materials.get(index));
        {
          let mut backend = cache.backend.borrow_mut();
          match material {
            Some(material) => material.set_current_material(&mut *backend, render_state),
            None => HalaMaterialCache::set_default_material(&mut *backend, render_state),
          }
        }
        stats.draw_calls += mesh_cache.draw(render_state, &instance.global_offset_position, slot as u32);
      }
      mesh_cache.end_draw();
      stats.drawn_meshes += 1;
    }

    self.update_statistic(frame_start.elapsed());
    stats
  }

  /// Accumulate the frame time, log the frame rate once per second.
  fn update_statistic(&mut self, cpu_time: std::time::Duration) {
    self.total_cpu_nanoseconds += cpu_time.as_nanos();
    self.stat_frames += 1;

    let now = std::time::Instant::now();
    let interval = now - self.last_stat_time;
    self.elapsed_time += interval;
    if self.elapsed_time > std::time::Duration::from_secs(1) {
      let elapsed_time_nanos = self.elapsed_time.as_nanos();
      log::info!(
        "FPS: {}, CPU Time: {:.4}ms, Total Frames: {}",
        self.stat_frames as u128 * 1000000000 / elapsed_time_nanos,
        self.total_cpu_nanoseconds as f64 / self.stat_frames as f64 / 1000000.0,
        self.total_frames + 1,
      );
      self.total_cpu_nanoseconds = 0;
      self.stat_frames = 0;
      self.elapsed_time = std::time::Duration::ZERO;
    }
    self.last_stat_time = now;
    self.total_frames += 1;
  }
}
