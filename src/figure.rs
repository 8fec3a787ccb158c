use crate::utils::AccessError;
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const DPI: u32 = 300;
pub const FONT: &str = "sans-serif";
pub const FONT_PT: f64 = 10.;
pub const SMALL_FONT_PT: f64 = 8.33;
pub const TITLE_FONT_PT: f64 = 12.;

/// Blank margin kept around the content when trimming, in inches.
pub const TRIM_PAD_IN: f64 = 0.1;

/// Drawing area backed by the in-memory rgb buffer of a figure.
pub type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

pub fn inches_to_px(inches: f64) -> u32 {
    (inches * DPI as f64).round() as u32
}

pub fn pt_to_px(pt: f64) -> f64 {
    pt * DPI as f64 / 72.
}

/// `DPI` as stored in the png pHYs chunk.
pub fn pixels_per_meter() -> u32 {
    (DPI as f64 / 0.0254).round() as u32
}

/// How a legend entry marks its color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegendMarker {
    Dot,
    Patch,
}

/// Draw a figure of the given size in inches and save it as png,
/// trimmed to its content.
/// Nothing is written unless the whole figure was drawn.
pub fn render_png<P, F>(fout: P, size: (f64, f64), draw: F) -> Result<(), AccessError>
where
    P: AsRef<Path>,
    F: for<'b> FnOnce(&Canvas<'b>) -> Result<(), Box<dyn Error>>,
{
    let path = fout.as_ref();
    let (width, height) = (inches_to_px(size.0), inches_to_px(size.1));
    let mut buf = vec![0u8; width as usize * height as usize * 3];
    draw_on_buffer(&mut buf, (width, height), draw).map_err(|e| AccessError::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let img = RgbImage::from_raw(width, height, buf).ok_or_else(|| AccessError::Render {
        path: path.to_path_buf(),
        message: String::from("figure buffer does not match its size"),
    })?;
    let trimmed = trim_to_content(&img, inches_to_px(TRIM_PAD_IN));
    save_png(path, &trimmed)
}

/// Write an rgb image as png, recording `DPI` as its pixel density.
pub fn save_png<P>(fout: P, img: &RgbImage) -> Result<(), AccessError>
where
    P: AsRef<Path>,
{
    let path = fout.as_ref();
    encode_png(path, img).map_err(|source| AccessError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn encode_png(path: &Path, img: &RgbImage) -> Result<(), png::EncodingError> {
    let buf = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(buf, img.width(), img.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let ppm = pixels_per_meter();
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(img.as_raw())?;
    writer.finish()
}

fn draw_on_buffer<F>(buf: &mut [u8], size: (u32, u32), draw: F) -> Result<(), Box<dyn Error>>
where
    F: for<'b> FnOnce(&Canvas<'b>) -> Result<(), Box<dyn Error>>,
{
    let root = BitMapBackend::with_buffer(buf, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw(&root)?;
    root.present()?;
    Ok(())
}

/// Crop the white border around the drawn content, keeping `pad` pixels
/// of margin where the image allows it.
/// A blank image is returned unchanged.
pub fn trim_to_content(img: &RgbImage, pad: u32) -> RgbImage {
    let white = image::Rgb([255u8, 255, 255]);
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in img.enumerate_pixels() {
        if *p == white {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    let (x0, y0, x1, y1) = match bounds {
        Some(b) => b,
        None => return img.clone(),
    };
    let x0 = x0.saturating_sub(pad);
    let y0 = y0.saturating_sub(pad);
    let x1 = (x1 + pad).min(img.width() - 1);
    let y1 = (y1 + pad).min(img.height() - 1);
    image::imageops::crop_imm(img, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
}

/// Draw a vertically centered legend, one colored marker and label per row,
/// with an optional title row on top.
pub fn draw_legend(
    area: &Canvas,
    title: Option<&str>,
    entries: &[(String, RGBColor)],
    marker: LegendMarker,
    font_px: f64,
) -> Result<(), Box<dyn Error>> {
    let (_, height) = area.dim_in_pixel();
    let row = (font_px * 1.5).round() as i32;
    let rows = entries.len() as i32 + i32::from(title.is_some());
    let mut y = ((height as i32 - rows * row) / 2).max(0) + row / 2;
    let x = (font_px * 0.5).round() as i32;
    let mark = (font_px * 0.7).round() as i32;
    let style = (FONT, font_px)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    if let Some(t) = title {
        area.draw(&Text::new(t.to_owned(), (x, y), style.clone()))?;
        y += row;
    }
    for (label, color) in entries {
        match marker {
            LegendMarker::Dot => area.draw(&Circle::new(
                (x + mark / 2, y),
                mark / 3,
                color.filled(),
            ))?,
            LegendMarker::Patch => area.draw(&Rectangle::new(
                [(x, y - mark / 2), (x + mark, y + mark / 2)],
                color.filled(),
            ))?,
        }
        area.draw(&Text::new(
            label.clone(),
            (x + mark + mark / 2, y),
            style.clone(),
        ))?;
        y += row;
    }
    Ok(())
}
