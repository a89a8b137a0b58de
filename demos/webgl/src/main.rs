use webcanvas::{
    utils::{init_logging, set_panic_hook},
    web_sys::WebGlRenderingContext as Gl,
    CanvasWebGl, Error, FrameRenderer,
};

const LASER_COUNT: usize = 200;
const CANVAS_SIZE: u32 = 600;

/// A square moving across the canvas, bouncing off the edges.
struct Laser {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    size: f32,
}

impl Laser {
    fn update(&mut self, width: f32, height: f32, elapsed: f32) {
        let (nx, ny) = (self.x + self.dx * elapsed, self.y + self.dy * elapsed);
        if nx > width - self.size || nx < 0.0 {
            self.dx = -self.dx;
        }
        if ny > height - self.size || ny < 0.0 {
            self.dy = -self.dy;
        }
        self.x = (self.x + self.dx * elapsed).clamp(0.0, width - self.size);
        self.y = (self.y + self.dy * elapsed).clamp(0.0, height - self.size);
    }
}

fn lasers() -> Vec<Laser> {
    let offset = CANVAS_SIZE as f32 / LASER_COUNT as f32;
    let spread = 50.0 / LASER_COUNT as f32;
    (0..LASER_COUNT)
        .map(|i| Laser {
            x: i as f32 * offset,
            y: 50.0,
            dx: 50.0,
            dy: -41.0 + i as f32 * spread,
            size: 20.0,
        })
        .collect()
}

fn main() -> Result<(), Error> {
    set_panic_hook();
    init_logging(log::Level::Info)?;

    let mut canvas = CanvasWebGl::new_with_size(CANVAS_SIZE, CANVAS_SIZE)?;
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let mut lasers = lasers();

    canvas.start(60.0, move |gl, timing| {
        let elapsed = (timing.delta / 1000.0) as f32;

        gl.disable(Gl::SCISSOR_TEST);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(Gl::COLOR_BUFFER_BIT);

        gl.enable(Gl::SCISSOR_TEST);
        for (i, laser) in lasers.iter_mut().enumerate() {
            laser.update(width, height, elapsed);
            let shade = i as f32 / LASER_COUNT as f32;
            // Scissor origin is the bottom-left corner.
            gl.scissor(
                laser.x as i32,
                (height - laser.y - laser.size) as i32,
                laser.size as i32,
                laser.size as i32,
            );
            gl.clear_color(1.0, shade, 1.0 - shade, 1.0);
            gl.clear(Gl::COLOR_BUFFER_BIT);
        }
        true
    })?;
    log::info!("WebGL demo running with {LASER_COUNT} lasers");

    // Keep the frame loop alive after `main` returns.
    std::mem::forget(canvas);
    Ok(())
}
