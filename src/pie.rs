use crate::figure::*;
use crate::utils::*;
use crate::Counts;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::cmp::Reverse;
use std::error::Error;
use std::f64::consts::PI;
use std::path::Path;

/// Figure size in inches.
pub const PIE_SIZE: (f64, f64) = (10., 8.);
/// Share of the figure width used by the pie, the rest holds the legend.
pub const PIE_WIDTH_SHARE: f64 = 0.7;
/// Slices below this percentage get no label on the slice itself.
pub const MIN_LABEL_PCT: f64 = 1.;
pub const START_ANGLE_DEG: f64 = 140.;
/// Distance of the percentage text from the center, relative to the radius.
pub const PCT_DISTANCE: f64 = 0.6;
pub const PCT_FONT_PT: f64 = 8.;
pub const LEGEND_TITLE: &str = "Categories";

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
    pub pct: f64,
}

impl PieSlice {
    /// Text drawn on the slice, only for slices of at least 1%.
    pub fn slice_label(&self) -> Option<String> {
        if self.pct >= MIN_LABEL_PCT {
            Some(format!("{:.1}%", self.pct))
        } else {
            None
        }
    }

    pub fn legend_label(&self) -> String {
        if self.pct >= MIN_LABEL_PCT {
            format!("{} ({:.1}%)", self.label, self.pct)
        } else {
            format!("{} (<1%)", self.label)
        }
    }
}

/// Slices with their percentage of the total,
/// largest first; equal counts are ordered by label, descending.
pub fn pie_slices(counts: &Counts) -> Result<Vec<PieSlice>, AccessError> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return Err(AccessError::EmptyMapping);
    }
    let mut slices: Vec<PieSlice> = counts
        .iter()
        .map(|(label, count)| PieSlice {
            label: label.clone(),
            count: *count,
            pct: 100. * *count as f64 / total as f64,
        })
        .collect();
    slices.sort_by_key(|s| Reverse((s.count, s.label.clone())));
    Ok(slices)
}

/// Plot the counts as a percentage pie with a legend on the right
/// and save the figure as png.
pub fn plot_pie<P>(counts: &Counts, title: &str, fout: P) -> Result<(), AccessError>
where
    P: AsRef<Path>,
{
    let slices = pie_slices(counts)?;
    let legend: Vec<(String, RGBColor)> = slices
        .iter()
        .enumerate()
        .map(|(i, s)| (s.legend_label(), palette_color(i)))
        .collect();

    render_png(fout, PIE_SIZE, |root| {
        let root = root.titled(title, (FONT, pt_to_px(TITLE_FONT_PT)))?;
        let (width, height) = root.dim_in_pixel();
        let (pie_area, legend_area) =
            root.split_horizontally((width as f64 * PIE_WIDTH_SHARE) as i32);
        let (pie_width, _) = pie_area.dim_in_pixel();
        let center = (pie_width as f64 / 2., height as f64 / 2.);
        let radius = 0.42 * pie_width.min(height) as f64;
        let pct_style = (FONT, pt_to_px(PCT_FONT_PT))
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));

        let mut start = START_ANGLE_DEG;
        for (i, slice) in slices.iter().enumerate() {
            let sweep = 360. * slice.pct / 100.;
            pie_area.draw(&Polygon::new(
                wedge(center, radius, start, sweep),
                palette_color(i).filled(),
            ))?;
            if let Some(text) = slice.slice_label() {
                let at = polar(center, radius * PCT_DISTANCE, start + sweep / 2.);
                pie_area.draw(&Text::new(text, at, pct_style.clone()))?;
            }
            start += sweep;
        }

        draw_legend(
            &legend_area,
            Some(LEGEND_TITLE),
            &legend,
            LegendMarker::Patch,
            pt_to_px(SMALL_FONT_PT),
        )?;
        Ok::<(), Box<dyn Error>>(())
    })
}

/// Pixel position at the angle in degrees, counter-clockwise from 3 o'clock.
fn polar(center: (f64, f64), r: f64, deg: f64) -> (i32, i32) {
    let rad = deg * PI / 180.;
    (
        (center.0 + r * rad.cos()).round() as i32,
        (center.1 - r * rad.sin()).round() as i32,
    )
}

/// Outline of a counter-clockwise wedge, one arc point per degree at most.
fn wedge(center: (f64, f64), r: f64, start_deg: f64, sweep_deg: f64) -> Vec<(i32, i32)> {
    let steps = sweep_deg.ceil().max(1.) as usize;
    let mut points = Vec::with_capacity(steps + 2);
    points.push((center.0.round() as i32, center.1.round() as i32));
    for k in 0..=steps {
        points.push(polar(center, r, start_deg + sweep_deg * k as f64 / steps as f64));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> Counts {
        pairs.iter().map(|(l, n)| (l.to_string(), *n)).collect()
    }

    #[test]
    fn percentages_sum_to_100() {
        let c = counts(&[("Location", 7), ("Contacts", 3), ("Photos", 1), ("Camera", 13)]);
        let total: f64 = pie_slices(&c).unwrap().iter().map(|s| s.pct).sum();
        assert!((total - 100.).abs() < 1e-9);
    }

    #[test]
    fn largest_first_and_ties_by_label() {
        let c = counts(&[("b", 2), ("a", 2), ("c", 5), ("d", 1)]);
        let labels: Vec<String> = pie_slices(&c).unwrap().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["c", "b", "a", "d"]);
        // same input, same order
        let again: Vec<String> = pie_slices(&c).unwrap().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, again);
    }

    #[test]
    fn small_slices_have_no_slice_label() {
        let c = counts(&[("big", 199), ("tiny", 1)]);
        let slices = pie_slices(&c).unwrap();
        assert_eq!(slices[0].slice_label().as_deref(), Some("99.5%"));
        assert_eq!(slices[0].legend_label(), "big (99.5%)");
        assert_eq!(slices[1].pct, 0.5);
        assert_eq!(slices[1].slice_label(), None);
        assert_eq!(slices[1].legend_label(), "tiny (<1%)");
    }

    #[test]
    fn one_percent_is_labeled() {
        let c = counts(&[("big", 99), ("edge", 1)]);
        let slices = pie_slices(&c).unwrap();
        assert_eq!(slices[1].slice_label().as_deref(), Some("1.0%"));
        assert_eq!(slices[1].legend_label(), "edge (1.0%)");
    }

    #[test]
    fn empty_counts_are_an_error() {
        assert!(matches!(
            pie_slices(&Counts::new()),
            Err(AccessError::EmptyMapping)
        ));
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("empty.png");
        assert!(plot_pie(&Counts::new(), "empty", &fout).is_err());
        assert!(!fout.exists());
    }

    #[test]
    fn wedge_follows_the_arc() {
        let points = wedge((100., 100.), 50., 0., 90.);
        assert_eq!(points.len(), 92);
        assert_eq!(points[0], (100, 100));
        assert_eq!(points[1], (150, 100));
        assert_eq!(points[91], (100, 50));
    }

    #[test]
    fn plot_category_pie() {
        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("pie.png");
        let c = counts(&[("Location", 3), ("Contacts", 1)]);
        plot_pie(&c, "fixture Percentage of Accesses by Category", &fout).unwrap();
        let img = image::open(&fout).unwrap();
        assert!(img.width() <= 3000 && img.height() <= 2400);
    }
}
