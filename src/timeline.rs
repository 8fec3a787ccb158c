use crate::figure::*;
use crate::utils::*;
use crate::AccessLog;
use chrono::prelude::*;
use plotters::coord::ranged1d::SegmentedCoord;
use plotters::coord::types::RangedCoordi32;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

/// Figure size in inches.
pub const TIMELINE_SIZE: (f64, f64) = (16., 6.);
/// Share of the figure width used by the plot, the rest holds the legend.
pub const PLOT_WIDTH_SHARE: f64 = 0.85;
pub const MAX_X_LABELS: usize = 10;
pub const MARKER_PT: f64 = 4.;
pub const XFMT: &str = "%Y-%m-%d %H:%M:%S";

/// Time axis range: exactly the earliest and latest access.
/// A single instant is widened by one second on each side,
/// a time axis needs a nonzero span.
pub fn timeline_bounds(log: &AccessLog) -> Result<(DateTime<Utc>, DateTime<Utc>), AccessError> {
    let (xmin, xmax) = log.time_bounds()?;
    if xmin == xmax {
        let pad = chrono::Duration::seconds(1);
        return Ok((xmin - pad, xmax + pad));
    }
    Ok((xmin, xmax))
}

/// Plot every access as a dot at (time, category row), colored by app,
/// and save the figure as png.
pub fn plot_timeline<P>(log: &AccessLog, title: &str, fout: P) -> Result<(), AccessError>
where
    P: AsRef<Path>,
{
    let (xmin, xmax) = timeline_bounds(log)?;
    let categories = log.categories();
    let rows = category_rows(log);
    let colors = app_colors(log);
    let legend = app_legend(log, &colors);

    render_png(fout, TIMELINE_SIZE, |root| {
        let (width, _) = root.dim_in_pixel();
        let (plot_area, legend_area) =
            root.split_horizontally((width as f64 * PLOT_WIDTH_SHARE) as i32);
        let font_px = pt_to_px(FONT_PT);
        let mut chart = ChartBuilder::on(&plot_area)
            .caption(title, (FONT, pt_to_px(TITLE_FONT_PT)))
            .margin(pt_to_px(FONT_PT) as i32)
            .x_label_area_size((font_px * 12.) as i32)
            .y_label_area_size(y_label_area(&categories, font_px))
            .build_cartesian_2d(xmin..xmax, row_axis(categories.len()))?;
        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(100, 100, 100).mix(0.3).stroke_width(2))
            .label_style((FONT, font_px))
            .x_label_style(
                (FONT, font_px)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_labels(MAX_X_LABELS)
            .y_labels(categories.len())
            .x_label_formatter(&|x| x.format(XFMT).to_string())
            .y_label_formatter(&|y| match y {
                SegmentValue::CenterOf(i) => categories
                    .get(*i as usize)
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .draw()?;

        let radius = (pt_to_px(MARKER_PT) / 2.).round() as i32;
        for (key, times) in log.events.iter() {
            let color = colors[key.app.as_str()];
            let row = rows[key.category.as_str()];
            chart.draw_series(times.iter().map(|t| {
                Circle::new(
                    (t.with_timezone(&Utc), SegmentValue::CenterOf(row)),
                    radius,
                    color.filled(),
                )
            }))?;
        }

        draw_legend(
            &legend_area,
            None,
            &legend,
            LegendMarker::Dot,
            pt_to_px(SMALL_FONT_PT),
        )?;
        Ok::<(), Box<dyn Error>>(())
    })
}

/// Timeline row of each category, in lexical order.
pub fn category_rows(log: &AccessLog) -> HashMap<&str, i32> {
    log.categories()
        .into_iter()
        .enumerate()
        .map(|(i, c)| (c, i as i32))
        .collect()
}

/// Color of each app: the palette entry of its lexical rank.
pub fn app_colors(log: &AccessLog) -> HashMap<&str, RGBColor> {
    log.apps()
        .into_iter()
        .enumerate()
        .map(|(i, a)| (a, palette_color(i)))
        .collect()
}

/// One legend entry per app, in order of first appearance.
pub fn app_legend(log: &AccessLog, colors: &HashMap<&str, RGBColor>) -> Vec<(String, RGBColor)> {
    log.apps_by_first_appearance()
        .into_iter()
        .map(|a| (a.to_owned(), colors[a]))
        .collect()
}

/// Discrete y axis with one segment per row.
/// The segmented i32 range includes its end, so `0..n - 1` gives `n` segments.
pub fn row_axis(n_rows: usize) -> SegmentedCoord<RangedCoordi32> {
    (0..n_rows.max(1) as i32 - 1).into_segmented()
}

/// Room for the longest category label.
fn y_label_area(categories: &[&str], font_px: f64) -> i32 {
    let longest = categories
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0);
    (font_px * (0.6 * longest as f64 + 1.)) as i32
}
