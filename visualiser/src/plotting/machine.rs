use super::{PlotSettings, Visualiser};
use crate::analyze::histogram_counts;
use crate::error::{PlotRenderError, VisualiseError};
use crate::iteration::IterationState;
use crate::model::{IterationWorkloads, Quantile};
use balancer_simulation_model::SimulationConfig;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type Root<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Renders every plot as an SVG file into one output directory
pub struct PlotMachine {
    out_dir: PathBuf,
    settings: PlotSettings,
}

impl PlotMachine {
    /// Create the machine, creating `out_dir` if needed.
    pub fn new(out_dir: impl Into<PathBuf>, settings: PlotSettings) -> std::io::Result<Self> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir, settings })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn overview_file(&self, plot: &str) -> PathBuf {
        self.out_dir.join(format!("{plot}.svg"))
    }

    pub fn iteration_file(&self, iteration: usize, plot: &str) -> PathBuf {
        self.out_dir.join(format!("{iteration}_{plot}.svg"))
    }

    fn render<F>(&self, plot: &'static str, path: PathBuf, draw: F) -> Result<(), PlotRenderError>
    where
        F: FnOnce(&Root<'_>) -> Result<(), BoxError>,
    {
        log::debug!("Rendering {plot} to {}", path.display());

        let result = (|| -> Result<(), BoxError> {
            let root = SVGBackend::new(&path, self.settings.size).into_drawing_area();
            root.fill(&WHITE)?;
            draw(&root)?;
            root.present()?;
            Ok(())
        })();

        result.map_err(|source| PlotRenderError { plot, path, source })
    }

    fn chart<'a, 'b>(
        &self,
        root: &'a Root<'b>,
        caption: &str,
        x_range: Range<f64>,
        y_range: Range<f64>,
    ) -> Result<Chart<'a, 'b>, BoxError> {
        let chart = ChartBuilder::on(root)
            .caption(caption, ("sans-serif", self.settings.font_size))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;
        Ok(chart)
    }

    fn draw_sorted(
        &self,
        root: &Root<'_>,
        caption: &str,
        y_desc: &str,
        sorted: &[f64],
        y_range: Range<f64>,
        mean: Option<f64>,
    ) -> Result<(), BoxError> {
        let x_max = sorted.len().max(2) as f64 - 1.0;
        let mut chart = self.chart(root, caption, 0.0..x_max, y_range)?;
        chart
            .configure_mesh()
            .x_desc("workers, sorted")
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(LineSeries::new(
            sorted.iter().enumerate().map(|(i, &v)| (i as f64, v)),
            BLUE.stroke_width(2),
        ))?;
        if let Some(mean) = mean {
            chart
                .draw_series(LineSeries::new(
                    [(0.0, mean), (x_max, mean)],
                    RED.stroke_width(1),
                ))?
                .label(format!("mean = {mean:.3}"))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(1)));
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        Ok(())
    }

    fn draw_quantiles(
        &self,
        root: &Root<'_>,
        caption: &str,
        y_desc: &str,
        quantiles: &[Quantile],
        y_range: Range<f64>,
    ) -> Result<(), BoxError> {
        let mut chart = self.chart(root, caption, 0.0..100.0, y_range)?;
        chart
            .configure_mesh()
            .x_desc("quantile [%]")
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(LineSeries::new(
            quantiles.iter().map(|q| (q.level, q.value)),
            BLUE.stroke_width(2),
        ))?;
        chart.draw_series(
            quantiles
                .iter()
                .map(|q| Circle::new((q.level, q.value), 4, BLUE.filled())),
        )?;

        Ok(())
    }

    fn workload_range(state: &IterationState) -> Range<f64> {
        let global = state.global();
        padded_range(global.min_workload, global.max_workload)
    }

    fn delta_range(state: &IterationState) -> Range<f64> {
        let bound = state.global().max_abs_delta;
        padded_range(-bound, bound)
    }
}

impl Visualiser for PlotMachine {
    fn plot_all_sorted_workloads(
        &mut self,
        _sim: &SimulationConfig,
        samples: &[IterationWorkloads],
    ) -> Result<(), VisualiseError> {
        let path = self.overview_file("all_sorted_workloads");
        let x_max = samples.iter().map(|s| s.sample.len()).max().unwrap_or(0).max(2) as f64 - 1.0;
        let y_range = overview_range(samples);

        self.render("all sorted workloads", path, |root| {
            let mut chart = self.chart(
                root,
                "Sorted workloads of all iterations",
                0.0..x_max,
                y_range,
            )?;
            chart
                .configure_mesh()
                .x_desc("workers, sorted")
                .y_desc("workload")
                .draw()?;

            for (idx, s) in samples.iter().enumerate() {
                let color = Palette99::pick(idx).to_rgba();
                chart
                    .draw_series(LineSeries::new(
                        s.sample
                            .sorted_values()
                            .into_iter()
                            .enumerate()
                            .map(|(i, v)| (i as f64, v)),
                        color.stroke_width(2),
                    ))?
                    .label(format!("iteration {}", s.iteration))
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
            Ok(())
        })?;

        Ok(())
    }

    fn plot_all_boxplot_workloads(
        &mut self,
        sim: &SimulationConfig,
        samples: &[IterationWorkloads],
    ) -> Result<(), VisualiseError> {
        let plot = "all boxplot workloads";
        let path = self.overview_file("all_boxplot_workloads");
        let y_range = overview_range(samples);
        let y_range = (y_range.start as f32)..(y_range.end as f32);

        // The segmented axis is keyed by u32 and ends one past the last iteration
        let axis_err = |iteration: usize| PlotRenderError {
            plot,
            path: path.clone(),
            source: format!("iteration {iteration} does not fit on the boxplot axis").into(),
        };
        let axis_key = |iteration: usize| u32::try_from(iteration).map_err(|_| axis_err(iteration));
        let start = axis_key(sim.iteration_0())?;
        let end = sim
            .iteration_max()
            .checked_add(1)
            .and_then(|end| u32::try_from(end).ok())
            .ok_or_else(|| axis_err(sim.iteration_max()))?;
        let boxes = samples
            .iter()
            .map(|s| Ok((axis_key(s.iteration)?, Quartiles::new(s.sample.values()))))
            .collect::<Result<Vec<_>, PlotRenderError>>()?;

        self.render(plot, path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(
                    "Workloads per iteration",
                    ("sans-serif", self.settings.font_size),
                )
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((start..end).into_segmented(), y_range)?;
            chart
                .configure_mesh()
                .x_desc("iteration")
                .y_desc("workload")
                .draw()?;

            chart.draw_series(boxes.iter().map(|(key, quartiles)| {
                Boxplot::new_vertical(SegmentValue::CenterOf(*key), quartiles)
                    .width(20)
                    .style(BLUE)
            }))?;
            Ok(())
        })?;

        Ok(())
    }

    fn plot_workloads(
        &mut self,
        _sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError> {
        let iteration = state.iteration().ok_or(VisualiseError::NoIterationLoaded)?;
        let sorted = state.sorted_workloads()?;
        let mean = state.current()?.stats().mean;
        let path = self.iteration_file(iteration, "workloads");

        self.render("workloads", path, |root| {
            self.draw_sorted(
                root,
                &format!("Iteration {iteration}: sorted workloads"),
                "workload",
                &sorted,
                Self::workload_range(state),
                Some(mean),
            )
        })?;
        Ok(())
    }

    fn plot_workload_quantiles(
        &mut self,
        _sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError> {
        let iteration = state.iteration().ok_or(VisualiseError::NoIterationLoaded)?;
        let quantiles = state.workload_quantiles()?;
        let path = self.iteration_file(iteration, "workload_quantiles");

        self.render("workload quantiles", path, |root| {
            self.draw_quantiles(
                root,
                &format!("Iteration {iteration}: workload quantiles"),
                "workload",
                &quantiles,
                Self::workload_range(state),
            )
        })?;
        Ok(())
    }

    fn plot_delta_workloads(
        &mut self,
        _sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError> {
        let iteration = state.iteration().ok_or(VisualiseError::NoIterationLoaded)?;
        let sorted = state.sorted_deltas()?;
        let path = self.iteration_file(iteration, "delta_workloads");

        self.render("delta workloads", path, |root| {
            self.draw_sorted(
                root,
                &format!("Iteration {iteration}: sorted workload deltas"),
                "workload delta",
                &sorted,
                Self::delta_range(state),
                None,
            )
        })?;
        Ok(())
    }

    fn plot_delta_workload_quantiles(
        &mut self,
        _sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError> {
        let iteration = state.iteration().ok_or(VisualiseError::NoIterationLoaded)?;
        let quantiles = state.delta_quantiles()?;
        let path = self.iteration_file(iteration, "delta_workload_quantiles");

        self.render("delta workload quantiles", path, |root| {
            self.draw_quantiles(
                root,
                &format!("Iteration {iteration}: workload delta quantiles"),
                "workload delta",
                &quantiles,
                Self::delta_range(state),
            )
        })?;
        Ok(())
    }

    fn plot_workload_histogram(
        &mut self,
        _sim: &SimulationConfig,
        state: &IterationState,
    ) -> Result<(), VisualiseError> {
        let iteration = state.iteration().ok_or(VisualiseError::NoIterationLoaded)?;
        let x_range = Self::workload_range(state);
        let counts = histogram_counts(
            state.current()?.values(),
            x_range.start,
            x_range.end,
            self.settings.histogram_bins,
        );
        let bin_width = (x_range.end - x_range.start) / self.settings.histogram_bins.max(1) as f64;
        let y_max = counts.iter().map(|&(_, c)| c).max().unwrap_or(0).max(1) as f64 * 1.1;
        let path = self.iteration_file(iteration, "workload_histogram");

        self.render("workload histogram", path, |root| {
            let mut chart = self.chart(
                root,
                &format!("Iteration {iteration}: workload histogram"),
                x_range,
                0.0..y_max,
            )?;
            chart
                .configure_mesh()
                .x_desc("workload")
                .y_desc("workers")
                .draw()?;

            chart.draw_series(counts.iter().map(|&(start, count)| {
                Rectangle::new(
                    [(start, 0.0), (start + bin_width, count as f64)],
                    BLUE.mix(0.6).filled(),
                )
            }))?;
            Ok(())
        })?;
        Ok(())
    }
}

fn overview_range(samples: &[IterationWorkloads]) -> Range<f64> {
    let min = samples
        .iter()
        .map(|s| s.sample.stats().min)
        .fold(f64::INFINITY, f64::min);
    let max = samples
        .iter()
        .map(|s| s.sample.stats().max)
        .fold(f64::NEG_INFINITY, f64::max);
    padded_range(min, max)
}

/// Axis range around `[min, max]` with a small margin, never empty
fn padded_range(min: f64, max: f64) -> Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    if span <= f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let margin = span * 0.05;
    (min - margin)..(max + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_of_flat_data() {
        assert_eq!(padded_range(3.0, 3.0), 2.0..4.0);
        assert_eq!(padded_range(0.0, 0.0), -1.0..1.0);
    }

    #[test]
    fn padded_range_adds_margin() {
        let range = padded_range(0.0, 10.0);
        assert_eq!(range, -0.5..10.5);
    }

    #[test]
    fn padded_range_of_no_data() {
        assert_eq!(padded_range(f64::INFINITY, f64::NEG_INFINITY), 0.0..1.0);
    }

    #[test]
    fn boxplot_axis_beyond_u32_is_a_render_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut machine = PlotMachine::new(dir.path(), PlotSettings::default())?;
        let sim = SimulationConfig::new(dir.path(), 1, u32::MAX as usize)?;

        let result = machine.plot_all_boxplot_workloads(&sim, &[]);
        assert!(matches!(
            result,
            Err(VisualiseError::PlotRender(PlotRenderError {
                plot: "all boxplot workloads",
                ..
            }))
        ));
        assert!(!machine.overview_file("all_boxplot_workloads").exists());
        Ok(())
    }

    #[test]
    fn file_names() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let machine = PlotMachine::new(dir.path().join("plots"), PlotSettings::default())?;
        assert!(machine.out_dir().is_dir());
        assert_eq!(
            machine.iteration_file(3, "workloads"),
            dir.path().join("plots").join("3_workloads.svg")
        );
        assert_eq!(
            machine.overview_file("all_sorted_workloads"),
            dir.path().join("plots").join("all_sorted_workloads.svg")
        );
        Ok(())
    }
}
