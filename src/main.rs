//! # Voxel Terrain Viewer Entry Point
//!
//! Native entry point. For the browser build, see `run_web()` in the library.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

#[cfg(not(target_family = "wasm"))]
fn main() {
    if let Err(err) = voxel_terrain_viewer::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_family = "wasm")]
fn main() {}
