//! Visualization helpers
//!
//! Turns generated batches into PNG grids and draws loss curves,
//! both with the `image` crate.

use std::path::Path;

use anyhow::{bail, Context};
use image::{Rgb, RgbImage};
use tch::{Device, Kind, Tensor};

use crate::data::denormalize_pixel;
use crate::training::TrainingMetrics;

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const LIGHT_GRAY: Rgb<u8> = Rgb([200, 200, 200]);
    pub const BLUE: Rgb<u8> = Rgb([33, 150, 243]);
    pub const ORANGE: Rgb<u8> = Rgb([255, 152, 0]);
}

/// Copy a batch of images to host memory as a flat `f32` buffer
///
/// # Returns
///
/// The pixel values and the shape `[n, c, h, w]`
pub fn tensor_to_pixels(images: &Tensor) -> anyhow::Result<(Vec<f32>, [usize; 4])> {
    let dims = images.size();
    let shape = match dims.as_slice() {
        [c, h, w] => [1, *c, *h, *w],
        [n, c, h, w] => [*n, *c, *h, *w],
        _ => bail!("expected images of shape (N, C, H, W), got {:?}", dims),
    };
    if shape.iter().any(|&d| d <= 0) {
        bail!("cannot render an empty batch of shape {:?}", dims);
    }

    let flat = images
        .detach()
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .contiguous()
        .view([-1]);
    let pixels = Vec::<f32>::try_from(&flat)?;
    let shape = shape.map(|d| d as usize);
    Ok((pixels, shape))
}

/// Tile images in [-1, 1] into one RGB image
///
/// Tiles are laid out in rows of `nrow`, separated and surrounded by
/// `padding` black pixels. Single channel images are replicated to RGB.
///
/// # Arguments
///
/// * `pixels` - Values in CHW order, image after image
/// * `shape` - `[n, c, h, w]`, with `c` equal to 1 or 3
pub fn make_grid(pixels: &[f32], shape: [usize; 4], nrow: usize, padding: u32) -> anyhow::Result<RgbImage> {
    let [n, c, h, w] = shape;
    if c != 1 && c != 3 {
        bail!("images must have 1 or 3 channels, got {}", c);
    }
    if pixels.len() != n * c * h * w {
        bail!("{} pixel values do not match shape {:?}", pixels.len(), shape);
    }

    let cols = nrow.clamp(1, n.max(1));
    let rows = (n + cols - 1) / cols;
    let (tile_w, tile_h) = (w as u32 + padding, h as u32 + padding);
    let mut grid = RgbImage::from_pixel(
        cols as u32 * tile_w + padding,
        rows as u32 * tile_h + padding,
        colors::BLACK,
    );

    let plane = h * w;
    for idx in 0..n {
        let x0 = (idx % cols) as u32 * tile_w + padding;
        let y0 = (idx / cols) as u32 * tile_h + padding;
        let image = &pixels[idx * c * plane..(idx + 1) * c * plane];

        for y in 0..h {
            for x in 0..w {
                let offset = y * w + x;
                let channel = |ch: usize| denormalize_pixel(image[(ch % c) * plane + offset]);
                grid.put_pixel(x0 + x as u32, y0 + y as u32, Rgb([channel(0), channel(1), channel(2)]));
            }
        }
    }

    Ok(grid)
}

/// Save a batch of images in [-1, 1] as a single PNG grid
///
/// # Arguments
///
/// * `images` - Tensor of shape (N, C, H, W)
/// * `nrow` - Images per row
/// * `padding` - Pixels between and around tiles
/// * `path` - Output file
pub fn save_image_grid<P: AsRef<Path>>(images: &Tensor, nrow: i64, padding: u32, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let (pixels, shape) = tensor_to_pixels(images)?;
    let grid = make_grid(&pixels, shape, nrow.max(1) as usize, padding)?;
    grid.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Save every image of a batch as its own PNG
///
/// Files are named `{prefix}_{index:04}.png`.
///
/// # Returns
///
/// Number of files written
pub fn save_images_individually(images: &Tensor, dir: &Path, prefix: &str) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir)?;
    let (pixels, [n, c, h, w]) = tensor_to_pixels(images)?;
    let stride = c * h * w;

    for idx in 0..n {
        let image = make_grid(&pixels[idx * stride..(idx + 1) * stride], [1, c, h, w], 1, 0)?;
        let path = dir.join(format!("{}_{:04}.png", prefix, idx));
        image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(n)
}

/// Draw a line segment with Bresenham's algorithm, clipped to the image
pub fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Render generator and discriminator losses as line charts on a shared scale
///
/// Generator loss is drawn in blue, discriminator loss in orange.
pub fn render_loss_plot(gen_losses: &[f64], disc_losses: &[f64], width: u32, height: u32) -> RgbImage {
    const MARGIN: i64 = 20;

    let mut img = RgbImage::from_pixel(width, height, colors::WHITE);
    let (w, h) = (width as i64, height as i64);
    let (left, right, top, bottom) = (MARGIN, w - MARGIN, MARGIN, h - MARGIN);

    // Axes
    draw_line(&mut img, (left, top), (left, bottom), colors::BLACK);
    draw_line(&mut img, (left, bottom), (right, bottom), colors::BLACK);

    let finite = gen_losses
        .iter()
        .chain(disc_losses)
        .copied()
        .filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || right <= left || bottom <= top {
        return img;
    }
    let span = if hi - lo > 1e-12 { hi - lo } else { 1.0 };

    // Horizontal guides at quarters of the range
    for q in 1..4 {
        let y = bottom - (bottom - top) * q / 4;
        draw_line(&mut img, (left + 1, y), (right, y), colors::LIGHT_GRAY);
    }

    let len = gen_losses.len().max(disc_losses.len());
    let to_point = |i: usize, v: f64| {
        let x = if len > 1 {
            left + ((right - left) as f64 * i as f64 / (len - 1) as f64).round() as i64
        } else {
            left
        };
        let y = bottom - ((bottom - top) as f64 * (v - lo) / span).round() as i64;
        (x, y)
    };

    for (series, color) in [(gen_losses, colors::BLUE), (disc_losses, colors::ORANGE)] {
        let mut prev: Option<(i64, i64)> = None;
        for (i, &v) in series.iter().enumerate() {
            if !v.is_finite() {
                prev = None;
                continue;
            }
            let point = to_point(i, v);
            draw_line(&mut img, prev.unwrap_or(point), point, color);
            prev = Some(point);
        }
    }

    img
}

/// Plot the per-iteration losses of a training run to a PNG file
pub fn plot_losses<P: AsRef<Path>>(metrics: &TrainingMetrics, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if metrics.num_iterations() == 0 {
        bail!("no iterations recorded, nothing to plot");
    }

    let img = render_loss_plot(&metrics.gen_losses(), &metrics.disc_losses(), 800, 400);
    img.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Saved loss plot to {}", path.display());
    Ok(())
}
