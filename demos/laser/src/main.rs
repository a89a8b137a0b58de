use webcanvas::{
    tiny_skia::{Color, FillRule, Paint, PathBuilder, Transform},
    utils::{init_logging, set_panic_hook, window_size},
    Canvas2d, Error, FrameRenderer,
};

/// A circle bouncing between the edges of the canvas.
struct Laser {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    size: f32,
}

impl Laser {
    const fn new() -> Self {
        Self {
            x: 40.0,
            y: 40.0,
            dx: 13.7,
            dy: -13.7,
            size: 35.0,
        }
    }

    fn update(&mut self, width: f32, height: f32) {
        if self.x + self.dx > width - self.size || self.x + self.dx < self.size {
            self.dx = -self.dx;
        }
        if self.y + self.dy > height - self.size || self.y + self.dy < self.size {
            self.dy = -self.dy;
        }
        self.x += self.dx;
        self.y += self.dy;
    }
}

fn main() -> Result<(), Error> {
    set_panic_hook();
    init_logging(log::Level::Info)?;

    // Smaller than the window, to show the canvas is not tied to it.
    let (width, height) = window_size()?;
    let mut canvas = Canvas2d::new_with_size(width * 9 / 10, height * 9 / 10)?;
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);

    let mut laser = Laser::new();
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(0xff, 0x00, 0xff, 0xff));
    paint.anti_alias = true;

    canvas.start(60.0, move |surface, _timing| {
        laser.update(width, height);
        surface.clear(Color::WHITE);
        if let Some(circle) = PathBuilder::from_circle(laser.x, laser.y, laser.size) {
            surface.pixmap_mut().fill_path(
                &circle,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
        true
    })?;
    log::info!("Laser demo running at {width}x{height}");

    // Keep the frame loop alive after `main` returns.
    std::mem::forget(canvas);
    Ok(())
}
