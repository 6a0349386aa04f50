//! Icon generation.
//!
//! The tray and notification icons are a blue disc drawn at runtime, so the
//! binary carries no image assets.

use image::{Rgba, RgbaImage};

/// Icon size in pixels.
pub const ICON_SIZE: u32 = 32;

/// Disc fill color.
pub const DISC_COLOR: [u8; 3] = [30, 80, 220];

/// Draw a filled disc with an anti-aliased edge on a transparent background.
pub fn disc_image(size: u32) -> RgbaImage {
    let center = size as f32 / 2.0;
    // Leaves the same margin as an 8px inset on a 64px canvas.
    let radius = size as f32 * 0.375;
    let [r, g, b] = DISC_COLOR;

    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let dist = (dx * dx + dy * dy).sqrt();

        let alpha = if dist <= radius {
            255
        } else if dist < radius + 1.0 {
            ((radius + 1.0 - dist) * 255.0) as u8
        } else {
            0
        };
        Rgba([r, g, b, alpha])
    })
}

/// Disc pixels as BGRA rows, the layout `CreateIcon` expects.
pub fn disc_bgra(size: u32) -> Vec<u8> {
    let mut pixels = disc_image(size).into_raw();
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    pixels
}

/// Tray icon built from [`disc_image`].
#[cfg(windows)]
pub fn tray_icon() -> Result<tray_icon::Icon, String> {
    let image = disc_image(ICON_SIZE);
    let (width, height) = image.dimensions();
    tray_icon::Icon::from_rgba(image.into_raw(), width, height).map_err(|e| e.to_string())
}
