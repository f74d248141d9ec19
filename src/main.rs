use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use avatar_viewer::cli::Cli;
use avatar_viewer::input::WinitPointer;
use avatar_viewer::loaders::GltfModelLoader;
use avatar_viewer::renderer::{WgpuSurface, WindowTarget};
use avatar_viewer::{FrameScheduler, LoopHandle, RenderLoop, SceneConfig, SceneHost, TickStatus};

/// Re-arms the loop through winit redraw requests
struct RedrawScheduler {
    window: Arc<Window>,
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) {
        self.window.request_redraw();
    }
}

struct Viewer {
    // Host drops first so its meshes go before the device
    host: SceneHost<WgpuSurface>,
    render_loop: RenderLoop<RedrawScheduler>,
    _target: WindowTarget,
}

struct App {
    cli: Cli,
    config: SceneConfig,
    viewer: Option<Viewer>,
    loop_handle: Option<LoopHandle>,
    pointer: WinitPointer,
}

impl App {
    fn new(cli: Cli, config: SceneConfig) -> Self {
        Self {
            cli,
            config,
            viewer: None,
            loop_handle: None,
            pointer: WinitPointer::new(),
        }
    }

    fn create_viewer(&self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title("Avatar Viewer")
                    .with_visible(false)
                    .with_inner_size(winit::dpi::LogicalSize::new(self.cli.width, self.cli.height)),
            )
            .context("Failed to create window")?;
        let window = Arc::new(window);

        let mut target = pollster::block_on(WindowTarget::new(window.clone()))?;
        let host = SceneHost::new(
            &mut target,
            self.cli.width,
            self.cli.height,
            &self.config,
            Box::new(GltfModelLoader),
        )?;
        let render_loop = RenderLoop::new(RedrawScheduler { window });

        Ok(Viewer {
            host,
            render_loop,
            _target: target,
        })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(handle) = &self.loop_handle {
            handle.stop();
        }
        if let Some(viewer) = &mut self.viewer {
            viewer.host.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match self.create_viewer(event_loop) {
            Ok(viewer) => {
                self.loop_handle = Some(viewer.render_loop.handle());
                self.viewer = Some(viewer);
            }
            Err(e) => {
                log::error!("Failed to initialize viewer: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        self.pointer.process_event(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.host.resize_physical(size.width, size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.host.set_pixel_ratio(scale_factor);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(viewer) = &mut self.viewer else {
                    return;
                };
                let pointer = self.pointer.take();
                match viewer.render_loop.tick(&mut viewer.host, &pointer) {
                    Ok(TickStatus::Rendered(_)) => {}
                    Ok(TickStatus::Stopped) => log::debug!("Render loop stopped"),
                    Err(e) => log::error!("Render error: {:#}", e),
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = cli.scene_config()?;
    if let Some(hint) = Cli::missing_model_hint(&config) {
        log::warn!("{}", hint);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli, config);

    log::info!(
        "Avatar Viewer - drag to orbit, right-drag to pan, scroll to zoom, Escape to quit, --model <PATH> to pick a model"
    );
    event_loop.run_app(&mut app)?;

    Ok(())
}
