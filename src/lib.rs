//! table-ngin
//!
//! A shadow-mapped tabletop renderer for native and WASM targets. Polygon
//! meshes are compiled into flat triangle streams, a random census of dice
//! and tokens is placed on a grid battlemap, and the scene is drawn from an
//! orbit camera in two passes: a depth pass from the light, then a lit pass
//! that samples it.
//!
//! High-level modules
//! - `camera`: orbit camera state, projection and pointer/wheel handling
//! - `config`: census sizes, palettes and placement bounds
//! - `context`: window, surface, device and queue
//! - `data_structures`: meshes, compiled geometry, materials, textures, entities
//! - `flow`: the winit event loop
//! - `pipelines`: shader programs, light state and the GPU renderer
//! - `placement`: rejection-sampled placement of dice and tokens
//! - `render`: frame plans and invalidation-driven scheduling
//! - `resources`: asset loading and the geometry compiler
//! - `scene`: the tabletop scene that ties everything together
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod placement;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::TableConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run(TableConfig::default()).map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
