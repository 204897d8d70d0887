//! Ember3D deferred-shading demo
//!
//! Parses the command line, opens a window and drives the renderer's
//! frame loop until the window closes or a frame fails.

use ember_3d_engine::ember3d::Engine;
use ember_3d_engine::{engine_error, engine_info};
use ember_3d_engine_renderer_vulkan::FrameOutcome;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

mod camera;
mod obj;
mod options;
mod scene;

#[cfg(test)]
mod camera_tests;
#[cfg(test)]
mod obj_tests;
#[cfg(test)]
mod options_tests;

use options::{Options, ParsedArgs};
use scene::DemoScene;

struct App {
    options: Options,
    // Declared before `window`: the scene (and its surface) must drop
    // while the window is still alive.
    scene: Option<DemoScene>,
    window: Option<Window>,
    failed: bool,
}

impl App {
    fn new(options: Options) -> Self {
        Self {
            options,
            scene: None,
            window: None,
            failed: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("Ember3D Demo")
            .with_inner_size(PhysicalSize::new(self.options.width, self.options.height));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => {
                engine_error!("ember3d::demo", "Failed to create window: {}", e);
                self.failed = true;
                event_loop.exit();
                return;
            }
        };

        match DemoScene::new(&window, &self.options) {
            Ok(scene) => {
                self.scene = Some(scene);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                engine_error!("ember3d::demo", "Failed to set up the scene: {}", e);
                self.failed = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                engine_info!("ember3d::demo", "Window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(scene) = &mut self.scene {
                    scene.handle_resize(size.width, size.height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                let (Some(scene), Some(window)) = (&mut self.scene, &self.window) else {
                    return;
                };
                match scene.render() {
                    // Minimized: stop requesting redraws; the event loop
                    // blocks until the window gets a size again.
                    Ok(FrameOutcome::SkippedMinimized) => {}
                    Ok(_) => window.request_redraw(),
                    Err(e) => {
                        engine_error!("ember3d::demo", "Frame failed: {}", e);
                        self.failed = true;
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }
}

fn main() {
    Engine::initialize();

    let options = match options::parse_args(std::env::args().skip(1)) {
        Ok(ParsedArgs::Help) => {
            println!("{}", options::USAGE);
            return;
        }
        Ok(ParsedArgs::Run(options)) => options,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", options::USAGE);
            std::process::exit(-1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!("ember3d::demo", "Failed to create event loop: {}", e);
            std::process::exit(-1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(options);
    let run_result = event_loop.run_app(&mut app);

    if let Some(scene) = &app.scene {
        scene.wait_idle().ok();
    }

    let failed = app.failed || run_result.is_err();
    drop(app);
    Engine::shutdown();

    if failed {
        std::process::exit(-1);
    }
}
