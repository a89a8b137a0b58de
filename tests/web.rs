//! Browser tests, run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use std::{cell::Cell, rc::Rc};

use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use webcanvas::{
    tiny_skia::Color,
    web_sys::{
        js_sys::Promise,
        wasm_bindgen::{JsCast, JsValue},
        window, HtmlCanvasElement,
    },
    Canvas2d, Canvas2dOptions, CanvasWebGl, Error, FrameRenderer, WebGlOptions,
};

wasm_bindgen_test_configure!(run_in_browser);

async fn sleep(ms: i32) {
    let promise = Promise::new(&mut |resolve, _| {
        window()
            .expect("window")
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .expect("setTimeout");
    });
    JsFuture::from(promise).await.expect("timeout");
}

#[wasm_bindgen_test]
fn creates_canvas_with_matching_buffer() {
    let canvas = Canvas2d::new_with_size(64, 32).expect("canvas");
    assert_eq!((canvas.width(), canvas.height()), (64, 32));

    let surface = canvas.surface();
    let surface = surface.borrow();
    assert_eq!((surface.width(), surface.height()), (64, 32));
}

#[wasm_bindgen_test]
fn missing_parent_is_an_error() {
    let result = Canvas2d::new_with_options(Canvas2dOptions::new().parent_id("no-such-element"));
    assert!(matches!(result, Err(Error::UnableToRetrieveElement(id)) if id == "no-such-element"));
}

#[wasm_bindgen_test]
fn attaches_to_existing_canvas() {
    let document = window().expect("window").document().expect("document");
    let element = document
        .create_element("canvas")
        .expect("element")
        .dyn_into::<HtmlCanvasElement>()
        .expect("canvas element");
    element.set_width(10);
    element.set_height(20);

    let canvas = Canvas2d::from_canvas(element, Canvas2dOptions::new()).expect("canvas");
    assert_eq!((canvas.width(), canvas.height()), (10, 20));
}

#[wasm_bindgen_test]
fn present_copies_pixels() {
    let canvas = Canvas2d::new_with_options(
        Canvas2dOptions::new()
            .size((4, 4))
            .background(Color::from_rgba8(255, 0, 0, 255)),
    )
    .expect("canvas");
    canvas.present().expect("present");

    let image = canvas
        .context()
        .get_image_data(0.0, 0.0, 4.0, 4.0)
        .expect("image data");
    assert_eq!(&image.data()[..4], &[255, 0, 0, 255]);
}

#[wasm_bindgen_test]
fn present_reuses_image_data() {
    let mut canvas = Canvas2d::new_with_size(4, 4).expect("canvas");
    assert!(canvas.image_data().is_none());

    canvas.present().expect("present");
    let first = canvas.image_data().expect("image data");
    canvas
        .surface()
        .borrow_mut()
        .clear(Color::from_rgba8(0, 0, 255, 255));
    canvas.present().expect("present");
    let second = canvas.image_data().expect("image data");
    assert_eq!(JsValue::from(first), JsValue::from(second.clone()));

    let pixel = canvas
        .context()
        .get_image_data(0.0, 0.0, 1.0, 1.0)
        .expect("image data");
    assert_eq!(&pixel.data()[..], &[0, 0, 255, 255]);

    canvas.resize(8, 2).expect("resize");
    canvas.present().expect("present");
    let resized = canvas.image_data().expect("image data");
    assert_eq!((resized.width(), resized.height()), (8, 2));
    assert_ne!(JsValue::from(resized), JsValue::from(second));
}

#[wasm_bindgen_test]
fn draws_text_with_default_font() {
    let canvas = Canvas2d::new_with_size(48, 24).expect("canvas");
    canvas
        .surface()
        .borrow_mut()
        .fill_text("Hg", 2.0, 2.0, Color::BLACK)
        .expect("text");
    canvas.present().expect("present");

    let image = canvas
        .context()
        .get_image_data(0.0, 0.0, 48.0, 24.0)
        .expect("image data");
    assert!(image.data().chunks_exact(4).any(|pixel| pixel[3] > 0));
}

#[wasm_bindgen_test]
fn resize_keeps_buffer_in_sync() {
    let mut canvas = Canvas2d::new_with_size(8, 8).expect("canvas");
    canvas.resize(16, 4).expect("resize");
    assert_eq!((canvas.width(), canvas.height()), (16, 4));
    assert_eq!(canvas.surface().borrow().width(), 16);
    assert!(canvas.resize(0, 4).is_err());
}

#[wasm_bindgen_test]
async fn frame_loop_runs_until_stopped() {
    let mut canvas = Canvas2d::new_with_size(8, 8).expect("canvas");
    let frames = Rc::new(Cell::new(0u32));
    canvas
        .start(0.0, {
            let frames = frames.clone();
            move |surface, _timing| {
                frames.set(frames.get() + 1);
                surface.clear(Color::WHITE);
                true
            }
        })
        .expect("start");
    assert!(canvas.is_running());

    sleep(300).await;
    canvas.stop();
    assert!(!canvas.is_running());

    let seen = frames.get();
    assert!(seen > 0);
    assert_eq!(canvas.stats().presented, u64::from(seen));

    sleep(100).await;
    assert_eq!(frames.get(), seen);
}

#[wasm_bindgen_test]
async fn unchanged_frames_are_not_presented() {
    let mut canvas = Canvas2d::new_with_size(8, 8).expect("canvas");
    canvas.start(0.0, |_, _| false).expect("start");
    sleep(200).await;
    canvas.stop();

    let stats = canvas.stats();
    assert!(stats.rendered > 0);
    assert_eq!(stats.presented, 0);
}

#[wasm_bindgen_test]
fn webgl_canvas_reports_size() {
    match CanvasWebGl::new_with_options(WebGlOptions::new().size((32, 16))) {
        Ok(canvas) => assert_eq!((canvas.width(), canvas.height()), (32, 16)),
        // Headless browsers may run without a GPU.
        Err(Error::UnableToRetrieveWebGlContext) => {}
        Err(err) => panic!("unexpected error: {err}"),
    }
}
