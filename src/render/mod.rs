//! The software renderer.
//!
//! One [`setup::Renderer`] owns every per-frame arena (drawsegs, visplanes,
//! vissprites, clip arrays) plus the screen-size-derived tables.  A frame is
//! a BSP walk feeding the column/span rasterisers in `draw`; nothing here
//! ever feeds back into simulation state.

pub mod bsp;
pub mod draw;
pub mod planes;
pub mod segs;
pub mod setup;
pub mod swirl;
pub mod textures;
pub mod things;

/// 0xAARRGGBB framebuffer pixel.
pub type Pixel = u32;

pub use setup::{Frame, RenderOptions, Renderer};
pub use textures::{NO_TEXTURE, TextureBank, TextureId};

/// 2D surface the intermission/finale screens draw onto.  The host wires
/// this to its patch blitter; tests use a recording stub.
pub trait UiCanvas {
    /// Blit a named patch lump with its own offsets applied.
    fn draw_patch(&mut self, name: &str, x: i32, y: i32);
    /// Tile a named flat over the whole screen.
    fn fill_flat(&mut self, name: &str);
}
