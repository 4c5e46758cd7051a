use std::collections::BTreeMap;

use glam::{
  DQuat,
  DVec3,
};

/// Find the keys around a time in a sorted key list.
/// return: The left and right key indices and the blend factor between them.
fn find_keys(times: impl ExactSizeIterator<Item = f64> + Clone, time: f64) -> Option<(usize, usize, f64)> {
  let count = times.len();
  if count == 0 {
    return None;
  }
  let mut prev: Option<(usize, f64)> = None;
  for (i, t) in times.enumerate() {
    if time <= t {
      return Some(match prev {
        None => (i, i, 0.0),
        Some((j, pt)) => {
          let span = t - pt;
          let factor = if span > 0.0 { (time - pt) / span } else { 0.0 };
          (j, i, factor)
        },
      });
    }
    prev = Some((i, t));
  }
  Some((count - 1, count - 1, 0.0))
}

/// A scalar animation curve, linear between keys and clamped at the ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaAnimCurve {
  /// (time in seconds, value), sorted by time.
  pub keys: Vec<(f64, f64)>,
}

impl HalaAnimCurve {
  pub fn new(mut keys: Vec<(f64, f64)>) -> Self {
    keys.sort_by(|a, b| a.0.total_cmp(&b.0));
    Self { keys }
  }

  /// Sample the curve.
  /// param time: The time in seconds.
  /// return: The value, None for an empty curve.
  pub fn evaluate(&self, time: f64) -> Option<f64> {
    let (l, r, t) = find_keys(self.keys.iter().map(|k| k.0), time)?;
    let (a, b) = (self.keys[l].1, self.keys[r].1);
    Some(a + (b - a) * t)
  }
}

/// A keyed vector track, linear between keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaTrackVec3 {
  pub keys: Vec<(f64, DVec3)>,
}

impl HalaTrackVec3 {
  pub fn evaluate(&self, time: f64) -> Option<DVec3> {
    let (l, r, t) = find_keys(self.keys.iter().map(|k| k.0), time)?;
    Some(self.keys[l].1.lerp(self.keys[r].1, t))
  }
}

/// A keyed rotation track, spherical-linear between keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaTrackQuat {
  pub keys: Vec<(f64, DQuat)>,
}

impl HalaTrackQuat {
  pub fn evaluate(&self, time: f64) -> Option<DQuat> {
    let (l, r, t) = find_keys(self.keys.iter().map(|k| k.0), time)?;
    Some(self.keys[l].1.slerp(self.keys[r].1, t))
  }
}

/// The transform tracks of one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaNodeTracks {
  pub translation: Option<HalaTrackVec3>,
  pub rotation: Option<HalaTrackQuat>,
  pub scale: Option<HalaTrackVec3>,
}

/// The animatable channels of one light.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HalaLightCurves {
  /// Red, green and blue.
  pub color: [Option<HalaAnimCurve>; 3],
  /// Spot cone angle in degrees.
  pub cone_angle: Option<HalaAnimCurve>,
}

/// A layer of animation curves, keyed by node and light index.
#[derive(Clone, Debug, Default)]
pub struct HalaAnimLayer {
  pub name: String,
  pub node_tracks: BTreeMap<u32, HalaNodeTracks>,
  pub light_curves: BTreeMap<u32, HalaLightCurves>,
}

/// An animation take with its time span in seconds.
#[derive(Clone, Debug, Default)]
pub struct HalaAnimStack {
  pub name: String,
  pub start: f64,
  pub stop: f64,
  pub layers: Vec<HalaAnimLayer>,
}

impl HalaAnimStack {
  /// The base layer, used for evaluation.
  pub fn base_layer(&self) -> Option<&HalaAnimLayer> {
    self.layers.first()
  }
}
