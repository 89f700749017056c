mod animation;
mod backend;
mod config;
mod error;
mod geometry;
mod logging;
mod renderer;
mod shader;
mod transform;

use anyhow::Context;
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use animation::Animator;
use backend::wgpu_backend::WgpuBackend;
use config::Config;
use renderer::Renderer;

struct Application {
    // declared before `window`: the surface inside must be dropped first
    renderer: Renderer<WgpuBackend>,
    animator: Animator,
    window: Window,
}

impl Application {
    async fn new(event_loop: &EventLoop<()>, config: &Config) -> anyhow::Result<Application> {
        let (width, height) = config.window_size;
        let window = WindowBuilder::new()
            .with_title(&config.window_title)
            .with_resizable(true)
            .with_inner_size(LogicalSize::new(width, height))
            .build(event_loop)
            .context("failed to create window")?;

        let backend = WgpuBackend::new(&window, config.vsync)
            .await
            .context("failed to acquire a GPU context")?;
        let renderer =
            Renderer::new(backend, config).context("failed to build the pentagon pipeline")?;

        Ok(Application {
            renderer,
            animator: Animator::new(config.rotation_step),
            window,
        })
    }

    fn run(&mut self, event_loop: EventLoop<()>) -> anyhow::Result<()> {
        // the animator asks for every redraw itself, nothing needs polling
        event_loop.set_control_flow(ControlFlow::Wait);
        self.window.request_redraw();

        event_loop.run(move |event, elwt| {
            if let Event::WindowEvent {
                window_id,
                ref event,
            } = event
            {
                if window_id != self.window.id() {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),

                    WindowEvent::Resized(physical_size) => self.resize(*physical_size),

                    WindowEvent::RedrawRequested => {
                        let now = instant::Instant::now();

                        self.animator.tick(&mut self.renderer, &mut self.window);

                        match self.renderer.backend_mut().take_surface_error() {
                            None => {}
                            // Reconfigure the surface if lost or outdated
                            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                self.resize(self.window.inner_size())
                            }
                            // The system is out of memory, we should probably quit
                            Some(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("surface out of memory, exiting");
                                elwt.exit();
                            }
                            // Timeouts resolve by the next frame
                            Some(e) => log::warn!("dropped frame: {:?}", e),
                        }

                        log::trace!("frame took {}ms", now.elapsed().as_millis());
                    }

                    _ => (),
                }
            }
        })?;

        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.renderer
            .backend_mut()
            .resize(new_size.width, new_size.height);
        log::debug!("surface size {:?}", self.renderer.backend().size());
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::default();
    logging::init_logging(config.log_filter.as_deref());

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut application = pollster::block_on(Application::new(&event_loop, &config))
        .inspect_err(|e| log::error!("{:#}", e))?;

    application.run(event_loop)
}
