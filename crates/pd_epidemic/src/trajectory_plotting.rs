use std::error::Error;
use std::path::Path;
use plotters::prelude::*;
use plotters::style::Palette99;

use pd_tree::TimedTree;

use crate::EpidemicTrajectory;

/// Number of points used to trace the lineages-through-time curve.
const LTT_RESOLUTION: usize = 200;

/// Draw the S, I and R counts of a reconstructed trajectory together with
/// the lineages-through-time curve of the tree, over forward time from the
/// origin. Compartments are drawn as step functions.
pub fn plot_trajectory<T: TimedTree + ?Sized, P: AsRef<Path>>(
    trajectory: &EpidemicTrajectory,
    tree: &T,
    filename: P,
) -> Result<(), Box<dyn Error>> {
    let t_max = trajectory.origin_time.max(f64::MIN_POSITIVE);
    let y_max = trajectory.compartments.iter()
        .map(|c| c.susceptible.max(c.infected).max(c.recovered))
        .max()
        .unwrap_or(1)
        .max(tree.leaf_count() as i64)
        .max(1) as f64 * 1.05;

    let title = format!("BDSIR trajectory ({} intervals, {} taxa)",
        trajectory.birth.len(), trajectory.ntaxa);

    let root = SVGBackend::new(filename.as_ref(), (1024, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..t_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("time since origin")
        .y_desc("individuals")
        .light_line_style(RGBColor(220, 220, 220))
        .axis_desc_style(("sans-serif", 18))
        .label_style(("sans-serif", 16))
        .draw()?;

    let step = |values: Vec<f64>| -> Vec<(f64, f64)> {
        let mut series = Vec::with_capacity(2 * values.len());
        for (k, &v) in values.iter().enumerate() {
            let start = trajectory.times[k];
            let end = trajectory.times.get(k + 1).copied().unwrap_or(t_max);
            series.push((start, v));
            series.push((end, v));
        }
        series
    };

    let compartments = [
        ("S", step(trajectory.compartments.iter().map(|c| c.susceptible as f64).collect())),
        ("I", step(trajectory.compartments.iter().map(|c| c.infected as f64).collect())),
        ("R", step(trajectory.compartments.iter().map(|c| c.recovered as f64).collect())),
    ];

    for (i, (name, series)) in compartments.into_iter().enumerate() {
        let color = Palette99::pick(i).mix(0.9);
        chart.draw_series(LineSeries::new(series, color.stroke_width(2)))?
            .label(name)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    let ltt: Vec<(f64, f64)> = (0..=LTT_RESOLUTION)
        .map(|k| {
            let t = t_max * k as f64 / LTT_RESOLUTION as f64;
            let backward = (trajectory.origin_time - t).max(0.0);
            (t, tree.lineage_count_at_time(backward) as f64)
        })
        .collect();
    chart.draw_series(LineSeries::new(ltt, BLACK.stroke_width(1)))?
        .label("lineages")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", 16).into_font())
        .draw()?;

    root.present()?;
    Ok(())
}
