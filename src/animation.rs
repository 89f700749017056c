use winit::window::Window;

use crate::backend::GraphicsBackend;
use crate::renderer::Renderer;

/// Source of frame ticks: asks the host to call back before the next repaint.
pub trait FramePacer {
    fn request_frame(&mut self);
}

impl FramePacer for Window {
    // the RedrawRequested that follows is paced by the surface's present mode
    fn request_frame(&mut self) {
        self.request_redraw();
    }
}

/// Drives the rotation: one step, one draw, one frame request per tick.
#[derive(Debug, Clone)]
pub struct Animator {
    step: f64,
    ticks: u64,
}

impl Animator {
    pub fn new(step: f64) -> Self {
        Self { step, ticks: 0 }
    }

    #[cfg(test)]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick<B: GraphicsBackend>(
        &mut self,
        renderer: &mut Renderer<B>,
        pacer: &mut impl FramePacer,
    ) {
        renderer.rotation_mut().advance(self.step);
        renderer.draw();
        pacer.request_frame();

        self.ticks += 1;
        log::trace!(
            "tick {} at {} degrees",
            self.ticks,
            renderer.rotation().degrees()
        );
    }

    /// Runs `n` ticks back to back, without waiting on a display.
    #[cfg(test)]
    pub fn run_ticks<B: GraphicsBackend>(
        &mut self,
        n: u64,
        renderer: &mut Renderer<B>,
        pacer: &mut impl FramePacer,
    ) {
        for _ in 0..n {
            self.tick(renderer, pacer);
        }
    }
}
