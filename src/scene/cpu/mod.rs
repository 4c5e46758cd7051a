pub mod node;
pub mod anim;
pub mod skin;
pub mod pose;
pub mod material;
pub mod texture;
pub mod image_data;
pub mod mesh;
pub mod light;
pub mod scene;

pub use scene::HalaScene;
