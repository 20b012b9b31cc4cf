// PNG implementation of the slide deck.
//
// Deck primitives arrive in arbitrary order relative to drawing (fonts
// and axis flags come after insert_chart), so each slide is buffered as
// plain state and rasterized only on save.

use anyhow::{anyhow, bail, Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::path::{Path, PathBuf};

use crate::deck::{
    AxisId, BubblePointData, ChartPayload, ChartTypeId, FontTarget, SlideDeck,
};
use crate::layout::{FontSpec, LabelPosition, LegendStyle, Rgb, StyleConfig};
use crate::RenderOptions;

const HEADER_HEIGHT: i32 = 96;
const LEGEND_HEIGHT: i32 = 36;

/// Buffered state of one slide.
#[derive(Debug, Clone)]
struct SlideState {
    layout: usize,
    title: Option<String>,
    caption: Option<(String, String)>,
    chart_title: Option<String>,
    chart: Option<(ChartTypeId, ChartPayload)>,
    category_font: FontSpec,
    value_font: FontSpec,
    data_label_font: Option<FontSpec>,
    data_labels: Option<(String, LabelPosition)>,
    value_axis_visible: bool,
    value_gridlines_visible: bool,
    legend: Option<LegendStyle>,
    gap_width: Option<u32>,
}

impl SlideState {
    fn new(layout: usize, style: &StyleConfig) -> Self {
        Self {
            layout,
            title: None,
            caption: None,
            chart_title: None,
            chart: None,
            category_font: FontSpec {
                size: 12,
                bold: false,
                color: style.category_label,
            },
            value_font: FontSpec {
                size: 12,
                bold: false,
                color: style.axis_tick_label,
            },
            data_label_font: None,
            data_labels: None,
            value_axis_visible: true,
            value_gridlines_visible: true,
            legend: None,
            gap_width: None,
        }
    }

    fn slug(&self) -> &'static str {
        self.chart
            .as_ref()
            .map(|(chart_type, _)| chart_type.slug())
            .unwrap_or("slide")
    }
}

pub struct PngDeck {
    options: RenderOptions,
    style: StyleConfig,
    slides: Vec<SlideState>,
}

impl PngDeck {
    pub fn new(options: RenderOptions, style: StyleConfig) -> Self {
        Self {
            options,
            style,
            slides: Vec::new(),
        }
    }

    fn current(&mut self) -> Result<&mut SlideState> {
        self.slides
            .last_mut()
            .ok_or_else(|| anyhow!("no slide to configure"))
    }

    /// Rasterize every slide into `dir`, one PNG per slide with a
    /// deterministic `NN_<chart>.png` name.
    pub fn save(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;

        let mut paths = Vec::new();
        for (idx, slide) in self.slides.iter().enumerate() {
            let bytes = self.render_slide(slide)?;
            let path = dir.join(format!("{:02}_{}.png", idx + 1, slide.slug()));
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            paths.push(path);
        }
        Ok(paths)
    }

    fn render_slide(&self, slide: &SlideState) -> Result<Vec<u8>> {
        let (width, height) = (self.options.width, self.options.height);
        let mut buffer = vec![0u8; (width * height * 3) as usize];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| anyhow!("Failed to fill background: {}", e))?;

            self.draw_header(&root, slide)?;

            let (_, body) = root.split_vertically(HEADER_HEIGHT);
            let (chart_area, legend_area) = if slide.legend.is_some() {
                let body_height = body.dim_in_pixel().1 as i32;
                let (upper, lower) = body.split_vertically(body_height - LEGEND_HEIGHT);
                (upper, Some(lower))
            } else {
                (body, None)
            };

            if let Some((chart_type, payload)) = &slide.chart {
                match (chart_type, payload) {
                    (ChartTypeId::Pie | ChartTypeId::Doughnut, ChartPayload::Category { categories, series }) => {
                        self.draw_pie(&chart_area, slide, *chart_type, categories, series)?;
                        if let (Some(area), Some(legend)) = (&legend_area, &slide.legend) {
                            self.draw_legend(area, legend, categories)?;
                        }
                    }
                    (ChartTypeId::Line, ChartPayload::Category { categories, series }) => {
                        self.draw_line(&chart_area, slide, categories, series)?;
                        self.draw_series_legend(&legend_area, slide, series)?;
                    }
                    (
                        ChartTypeId::ColumnClustered
                        | ChartTypeId::ColumnStacked
                        | ChartTypeId::ColumnStacked100,
                        ChartPayload::Category { categories, series },
                    ) => {
                        let stacked = !matches!(chart_type, ChartTypeId::ColumnClustered);
                        self.draw_columns(&chart_area, slide, categories, series, stacked)?;
                        self.draw_series_legend(&legend_area, slide, series)?;
                    }
                    (
                        ChartTypeId::BarClustered | ChartTypeId::BarStacked,
                        ChartPayload::Category { categories, series },
                    ) => {
                        let stacked = matches!(chart_type, ChartTypeId::BarStacked);
                        self.draw_bars(&chart_area, slide, categories, series, stacked)?;
                        self.draw_series_legend(&legend_area, slide, series)?;
                    }
                    (ChartTypeId::Bubble, ChartPayload::Bubble { points }) => {
                        self.draw_bubbles(&chart_area, slide, points)?;
                    }
                    _ => bail!("chart payload does not match chart type"),
                }
            }

            root.present()
                .map_err(|e| anyhow!("Failed to present drawing: {}", e))?;
        }

        let mut png_bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
        Ok(png_bytes)
    }

    fn draw_header<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        slide: &SlideState,
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        if let Some(title) = &slide.title {
            let style = font_style(&FontSpec {
                size: self.style.title_size,
                bold: true,
                color: self.style.title,
            });
            root.draw(&Text::new(title.clone(), (24, 14), style))
                .map_err(|e| anyhow!("Failed to draw title: {}", e))?;
        }
        if let Some((axis_label, unit_line)) = &slide.caption {
            let label_style = font_style(&FontSpec {
                size: 12,
                bold: false,
                color: self.style.category_label,
            });
            root.draw(&Text::new(axis_label.clone(), (24, 48), label_style))
                .map_err(|e| anyhow!("Failed to draw caption: {}", e))?;
            if !unit_line.is_empty() {
                let unit_style = font_style(&FontSpec {
                    size: 12,
                    bold: false,
                    color: self.style.caption_unit,
                });
                root.draw(&Text::new(unit_line.clone(), (24, 66), unit_style))
                    .map_err(|e| anyhow!("Failed to draw unit line: {}", e))?;
            }
        }
        if let Some(chart_title) = &slide.chart_title {
            let style = font_style(&FontSpec {
                size: 12,
                bold: false,
                color: self.style.axis_tick_label,
            });
            root.draw(&Text::new(chart_title.clone(), (24, 66), style))
                .map_err(|e| anyhow!("Failed to draw chart title: {}", e))?;
        }
        Ok(())
    }

    fn draw_columns<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        slide: &SlideState,
        categories: &[String],
        series: &[crate::deck::SeriesData],
        stacked: bool,
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let n = categories.len().max(1);
        let (y_min, y_max) = value_range(series, stacked);

        let mut chart = ChartBuilder::on(area)
            .margin(12)
            .x_label_area_size(32)
            .y_label_area_size(if slide.value_axis_visible { 52 } else { 8 })
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
            .map_err(|e| anyhow!("Failed to build chart: {}", e))?;

        self.configure_category_mesh(&mut chart, slide, categories, false)?;

        let gap = slide.gap_width.unwrap_or(150) as f64;
        let slot_width = 1.0 / (1.0 + gap / 100.0);

        if stacked {
            for (cat_idx, _) in categories.iter().enumerate() {
                let x = cat_idx as f64;
                let mut cumulative = 0.0;
                for (series_idx, data) in series.iter().enumerate() {
                    let value = data.values.get(cat_idx).copied().unwrap_or(0.0);
                    let color = self.series_color(series_idx);
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [
                                (x - slot_width / 2.0, cumulative),
                                (x + slot_width / 2.0, cumulative + value),
                            ],
                            color.filled(),
                        )))
                        .map_err(|e| anyhow!("Failed to draw column: {}", e))?;
                    if let Some((format, LabelPosition::Center)) = &slide.data_labels {
                        let label = format_directive(value, format, None);
                        let style = self
                            .data_label_style(slide)
                            .pos(Pos::new(HPos::Center, VPos::Center));
                        chart
                            .draw_series(std::iter::once(Text::new(
                                label,
                                (x, cumulative + value / 2.0),
                                style,
                            )))
                            .map_err(|e| anyhow!("Failed to draw data label: {}", e))?;
                    }
                    cumulative += value;
                }
            }
        } else {
            let bar_width = slot_width / series.len() as f64;
            for (series_idx, data) in series.iter().enumerate() {
                let color = self.series_color(series_idx);
                for (cat_idx, &value) in data.values.iter().enumerate() {
                    let offset =
                        (series_idx as f64 - (series.len() as f64 - 1.0) / 2.0) * bar_width;
                    let x = cat_idx as f64 + offset;
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [(x - bar_width / 2.0, 0.0), (x + bar_width / 2.0, value)],
                            color.filled(),
                        )))
                        .map_err(|e| anyhow!("Failed to draw column: {}", e))?;
                    if let Some((format, LabelPosition::OutsideEnd)) = &slide.data_labels {
                        let label = format_directive(value, format, None);
                        let style = self
                            .data_label_style(slide)
                            .pos(Pos::new(HPos::Center, VPos::Bottom));
                        let pad = (y_max - y_min) * 0.01;
                        chart
                            .draw_series(std::iter::once(Text::new(label, (x, value + pad), style)))
                            .map_err(|e| anyhow!("Failed to draw data label: {}", e))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        slide: &SlideState,
        categories: &[String],
        series: &[crate::deck::SeriesData],
        stacked: bool,
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let n = categories.len().max(1);
        let (v_min, v_max) = value_range(series, stacked);

        let mut chart = ChartBuilder::on(area)
            .margin(12)
            .x_label_area_size(if slide.value_axis_visible { 32 } else { 8 })
            .y_label_area_size(110)
            .build_cartesian_2d(v_min..v_max, -0.5f64..(n as f64 - 0.5))
            .map_err(|e| anyhow!("Failed to build chart: {}", e))?;

        self.configure_category_mesh(&mut chart, slide, categories, true)?;

        let gap = slide.gap_width.unwrap_or(150) as f64;
        let slot_width = 1.0 / (1.0 + gap / 100.0);

        if stacked {
            for (cat_idx, _) in categories.iter().enumerate() {
                let y = cat_idx as f64;
                let mut cumulative = 0.0;
                for (series_idx, data) in series.iter().enumerate() {
                    let value = data.values.get(cat_idx).copied().unwrap_or(0.0);
                    let color = self.series_color(series_idx);
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [
                                (cumulative, y - slot_width / 2.0),
                                (cumulative + value, y + slot_width / 2.0),
                            ],
                            color.filled(),
                        )))
                        .map_err(|e| anyhow!("Failed to draw bar: {}", e))?;
                    if let Some((format, LabelPosition::Center)) = &slide.data_labels {
                        let label = format_directive(value, format, None);
                        let style = self
                            .data_label_style(slide)
                            .pos(Pos::new(HPos::Center, VPos::Center));
                        chart
                            .draw_series(std::iter::once(Text::new(
                                label,
                                (cumulative + value / 2.0, y),
                                style,
                            )))
                            .map_err(|e| anyhow!("Failed to draw data label: {}", e))?;
                    }
                    cumulative += value;
                }
            }
        } else {
            let bar_width = slot_width / series.len() as f64;
            for (series_idx, data) in series.iter().enumerate() {
                let color = self.series_color(series_idx);
                for (cat_idx, &value) in data.values.iter().enumerate() {
                    let offset =
                        (series_idx as f64 - (series.len() as f64 - 1.0) / 2.0) * bar_width;
                    let y = cat_idx as f64 + offset;
                    chart
                        .draw_series(std::iter::once(Rectangle::new(
                            [(0.0, y - bar_width / 2.0), (value, y + bar_width / 2.0)],
                            color.filled(),
                        )))
                        .map_err(|e| anyhow!("Failed to draw bar: {}", e))?;
                    if let Some((format, LabelPosition::OutsideEnd)) = &slide.data_labels {
                        let label = format_directive(value, format, None);
                        let style = self
                            .data_label_style(slide)
                            .pos(Pos::new(HPos::Left, VPos::Center));
                        let pad = (v_max - v_min) * 0.01;
                        chart
                            .draw_series(std::iter::once(Text::new(label, (value + pad, y), style)))
                            .map_err(|e| anyhow!("Failed to draw data label: {}", e))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_line<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        slide: &SlideState,
        categories: &[String],
        series: &[crate::deck::SeriesData],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let n = categories.len().max(1);
        let (y_min, y_max) = value_range(series, false);

        let mut chart = ChartBuilder::on(area)
            .margin(12)
            .x_label_area_size(32)
            .y_label_area_size(52)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
            .map_err(|e| anyhow!("Failed to build chart: {}", e))?;

        self.configure_category_mesh(&mut chart, slide, categories, false)?;

        for (series_idx, data) in series.iter().enumerate() {
            let color = self.series_color(series_idx);
            let points: Vec<(f64, f64)> = data
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as f64, v))
                .collect();
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(|e| anyhow!("Failed to draw line: {}", e))?;
        }
        Ok(())
    }

    fn draw_pie<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        slide: &SlideState,
        chart_type: ChartTypeId,
        _categories: &[String],
        series: &[crate::deck::SeriesData],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let values = series.first().map(|s| s.values.as_slice()).unwrap_or(&[]);
        let total: f64 = values.iter().sum();
        if total == 0.0 {
            bail!("pie chart has no data");
        }

        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = (width.min(height) as i32 / 2 - 24).max(10) as f64;

        let mut angle = -90.0f64;
        for (idx, &value) in values.iter().enumerate() {
            let sweep = value / total * 360.0;
            let mut points = vec![center];
            let steps = (sweep.abs().ceil() as usize).max(2);
            for step in 0..=steps {
                let theta = (angle + sweep * step as f64 / steps as f64).to_radians();
                points.push((
                    center.0 + (radius * theta.cos()) as i32,
                    center.1 + (radius * theta.sin()) as i32,
                ));
            }
            area.draw(&Polygon::new(points, self.series_color(idx).filled()))
                .map_err(|e| anyhow!("Failed to draw slice: {}", e))?;

            if let Some((format, _)) = &slide.data_labels {
                let mid = (angle + sweep / 2.0).to_radians();
                let label = format_directive(value, format, Some(total));
                let style = self
                    .data_label_style(slide)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                area.draw(&Text::new(
                    label,
                    (
                        center.0 + (radius * 0.65 * mid.cos()) as i32,
                        center.1 + (radius * 0.65 * mid.sin()) as i32,
                    ),
                    style,
                ))
                .map_err(|e| anyhow!("Failed to draw slice label: {}", e))?;
            }
            angle += sweep;
        }

        if matches!(chart_type, ChartTypeId::Doughnut) {
            area.draw(&Circle::new(center, (radius * 0.45) as i32, WHITE.filled()))
                .map_err(|e| anyhow!("Failed to draw doughnut hole: {}", e))?;
        }
        Ok(())
    }

    fn draw_bubbles<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        slide: &SlideState,
        points: &[BubblePointData],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        if points.is_empty() {
            bail!("bubble chart has no data");
        }

        let (x_min, x_max) = pad_range(
            points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
            points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max),
        );
        let (y_min, y_max) = pad_range(
            points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
            points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
        );
        let max_size = points.iter().map(|p| p.size).fold(0.0f64, f64::max);

        let mut chart = ChartBuilder::on(area)
            .margin(12)
            .x_label_area_size(32)
            .y_label_area_size(52)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| anyhow!("Failed to build chart: {}", e))?;

        let grid = rgb(self.style.gridline);
        let value_style = font_style(&slide.value_font);
        chart
            .configure_mesh()
            .axis_style(grid)
            .light_line_style(grid.mix(0.5))
            .bold_line_style(grid)
            .x_label_style(value_style.clone())
            .y_label_style(value_style)
            .draw()
            .map_err(|e| anyhow!("Failed to draw mesh: {}", e))?;

        let label_style = font_style(&slide.category_font).pos(Pos::new(HPos::Center, VPos::Bottom));
        for point in points {
            let radius = if max_size > 0.0 {
                6.0 + 22.0 * (point.size / max_size).sqrt()
            } else {
                6.0
            };
            chart
                .draw_series(std::iter::once(Circle::new(
                    (point.x, point.y),
                    radius as i32,
                    rgb(self.style.series_fill).mix(0.75).filled(),
                )))
                .map_err(|e| anyhow!("Failed to draw bubble: {}", e))?;
            chart
                .draw_series(std::iter::once(Text::new(
                    point.label.clone(),
                    (point.x, point.y),
                    label_style.clone(),
                )))
                .map_err(|e| anyhow!("Failed to draw bubble label: {}", e))?;
        }
        Ok(())
    }

    /// Shared mesh configuration for category charts. `horizontal` flips
    /// which axis carries the categories.
    fn configure_category_mesh<'a, 'b, DB: DrawingBackend>(
        &self,
        chart: &mut ChartContext<'a, DB, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
        slide: &'b SlideState,
        categories: &'b [String],
        horizontal: bool,
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let n = categories.len().max(1);
        let grid = rgb(self.style.gridline);
        let category_style = font_style(&slide.category_font);
        let value_style = font_style(&slide.value_font);
        let category_label = |v: &f64| -> String {
            let idx = v.round() as usize;
            if (v - idx as f64).abs() < 1e-6 {
                categories.get(idx).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        };

        let mut mesh = chart.configure_mesh();
        mesh.axis_style(grid);

        if horizontal {
            mesh.disable_y_mesh()
                .y_labels(n)
                .y_label_formatter(&category_label)
                .y_label_style(category_style);
            if slide.value_axis_visible {
                mesh.x_labels(5).x_label_style(value_style);
            } else {
                mesh.x_labels(0);
            }
            if !slide.value_gridlines_visible {
                mesh.disable_x_mesh();
            } else {
                mesh.light_line_style(grid.mix(0.5)).bold_line_style(grid);
            }
        } else {
            mesh.disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&category_label)
                .x_label_style(category_style);
            if slide.value_axis_visible {
                mesh.y_labels(5).y_label_style(value_style);
            } else {
                mesh.y_labels(0);
            }
            if !slide.value_gridlines_visible {
                mesh.disable_y_mesh();
            } else {
                mesh.light_line_style(grid.mix(0.5)).bold_line_style(grid);
            }
        }

        mesh.draw().map_err(|e| anyhow!("Failed to draw mesh: {}", e))?;
        Ok(())
    }

    fn draw_series_legend<DB: DrawingBackend>(
        &self,
        legend_area: &Option<DrawingArea<DB, plotters::coord::Shift>>,
        slide: &SlideState,
        series: &[crate::deck::SeriesData],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        if let (Some(area), Some(legend)) = (legend_area, &slide.legend) {
            let names: Vec<String> = series.iter().map(|s| s.name.clone()).collect();
            self.draw_legend(area, legend, &names)?;
        }
        Ok(())
    }

    fn draw_legend<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        legend: &LegendStyle,
        names: &[String],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let (width, _) = area.dim_in_pixel();
        let slot = (width as i32 / names.len().max(1) as i32).max(1);
        let style = font_style(&FontSpec {
            size: legend.size,
            bold: false,
            color: self.style.category_label,
        });
        for (idx, name) in names.iter().enumerate() {
            let x = slot * idx as i32 + slot / 2;
            area.draw(&Rectangle::new(
                [(x - 40, 12), (x - 28, 24)],
                self.series_color(idx).filled(),
            ))
            .map_err(|e| anyhow!("Failed to draw legend swatch: {}", e))?;
            area.draw(&Text::new(name.clone(), (x - 22, 13), style.clone()))
                .map_err(|e| anyhow!("Failed to draw legend entry: {}", e))?;
        }
        Ok(())
    }

    fn series_color(&self, idx: usize) -> RGBColor {
        const SHADES: [Rgb; 6] = [
            Rgb(3, 90, 65),
            Rgb(70, 130, 102),
            Rgb(137, 169, 140),
            Rgb(89, 89, 89),
            Rgb(140, 140, 140),
            Rgb(191, 191, 191),
        ];
        if idx == 0 {
            rgb(self.style.series_fill)
        } else {
            rgb(SHADES[idx % SHADES.len()])
        }
    }

    fn data_label_style(&self, slide: &SlideState) -> TextStyle<'static> {
        let font = slide.data_label_font.unwrap_or(FontSpec {
            size: 12,
            bold: true,
            color: self.style.series_fill,
        });
        font_style(&font)
    }
}

impl SlideDeck for PngDeck {
    fn append_slide(&mut self, layout: usize) -> Result<()> {
        self.slides.push(SlideState::new(layout, &self.style));
        Ok(())
    }

    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn remove_last_slide(&mut self) -> Result<()> {
        if self.slides.pop().is_none() {
            bail!("no slide to remove");
        }
        Ok(())
    }

    fn set_slide_title(&mut self, text: &str) -> Result<()> {
        self.current()?.title = Some(text.to_string());
        Ok(())
    }

    fn set_caption(&mut self, axis_label: &str, unit_line: &str) -> Result<()> {
        self.current()?.caption = Some((axis_label.to_string(), unit_line.to_string()));
        Ok(())
    }

    fn set_chart_title(&mut self, text: &str) -> Result<()> {
        self.current()?.chart_title = Some(text.to_string());
        Ok(())
    }

    fn insert_chart(
        &mut self,
        _placeholder: usize,
        chart_type: ChartTypeId,
        payload: ChartPayload,
    ) -> Result<()> {
        let slide = self.current()?;
        if slide.chart.is_some() {
            bail!("slide already contains a chart");
        }
        match &payload {
            ChartPayload::Category { categories, series } => {
                if categories.is_empty() || series.is_empty() {
                    bail!("chart data is empty");
                }
            }
            ChartPayload::Bubble { points } => {
                if points.is_empty() {
                    bail!("chart data is empty");
                }
            }
        }
        slide.chart = Some((chart_type, payload));
        Ok(())
    }

    fn set_font(&mut self, target: FontTarget, font: FontSpec) -> Result<()> {
        let slide = self.current()?;
        match target {
            FontTarget::CategoryLabels => slide.category_font = font,
            FontTarget::ValueAxisLabels => slide.value_font = font,
            FontTarget::DataLabels => slide.data_label_font = Some(font),
        }
        Ok(())
    }

    fn set_axis_visibility(&mut self, axis: AxisId, visible: bool) -> Result<()> {
        if matches!(axis, AxisId::Value) {
            self.current()?.value_axis_visible = visible;
        }
        Ok(())
    }

    fn set_gridlines(&mut self, axis: AxisId, visible: bool) -> Result<()> {
        if matches!(axis, AxisId::Value) {
            self.current()?.value_gridlines_visible = visible;
        }
        Ok(())
    }

    fn set_data_labels(&mut self, format: &str, position: LabelPosition) -> Result<()> {
        self.current()?.data_labels = Some((format.to_string(), position));
        Ok(())
    }

    fn set_legend(&mut self, legend: LegendStyle) -> Result<()> {
        self.current()?.legend = Some(legend);
        Ok(())
    }

    fn set_gap_width(&mut self, width: u32) -> Result<()> {
        self.current()?.gap_width = Some(width);
        Ok(())
    }
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn font_style(font: &FontSpec) -> TextStyle<'static> {
    let weight = if font.bold {
        FontStyle::Bold
    } else {
        FontStyle::Normal
    };
    let desc = FontDesc::new(FontFamily::SansSerif, font.size as f64, weight);
    let mut style = TextStyle::from(desc);
    style.color = rgb(font.color).to_backend_color();
    style
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.1;
        (min - padding, max + padding)
    }
}

/// Min/max of the plotted value axis: stacked charts need the cumulative
/// height, everything is anchored at zero like the slide charts.
fn value_range(series: &[crate::deck::SeriesData], stacked: bool) -> (f64, f64) {
    let point_count = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let mut min = 0.0f64;
    let mut max = 0.0f64;
    for idx in 0..point_count {
        let mut stack = 0.0;
        for data in series {
            let value = data.values.get(idx).copied().unwrap_or(0.0);
            if stacked {
                stack += value;
            } else {
                min = min.min(value);
                max = max.max(value);
            }
        }
        if stacked {
            min = min.min(stack);
            max = max.max(stack);
        }
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    // Headroom for outside-end data labels
    (
        if min < 0.0 { min * 1.1 } else { min },
        if max > 0.0 { max * 1.1 } else { max },
    )
}

/// Interpret the number-format directive: each trailing comma divides by
/// a thousand, ".0" keeps one decimal, "%" renders the value (or its
/// share of `total`, when given) as a whole percentage.
fn format_directive(value: f64, directive: &str, total: Option<f64>) -> String {
    if directive.ends_with('%') {
        let percent = match total {
            Some(t) if t != 0.0 => value / t * 100.0,
            _ => value,
        };
        return format!("{}%", percent.round() as i64);
    }
    let commas = directive.matches(',').count();
    let scaled = value / 1000f64.powi(commas as i32);
    if directive.contains(".0") {
        format!("{:.1}", scaled)
    } else {
        format!("{}", scaled.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_directive() {
        assert_eq!(format_directive(1234.0, "0", None), "1234");
        assert_eq!(format_directive(1500.0, "0.0,", None), "1.5");
        assert_eq!(format_directive(2_500_000.0, "0,,", None), "3");
        assert_eq!(format_directive(0.25, "0%", Some(1.0)), "25%");
        assert_eq!(format_directive(40.0, "0%", None), "40%");
    }

    #[test]
    fn test_value_range_stacked_uses_cumulative_height() {
        let series = vec![
            crate::deck::SeriesData {
                name: "a".into(),
                values: vec![10.0, 20.0],
            },
            crate::deck::SeriesData {
                name: "b".into(),
                values: vec![5.0, 30.0],
            },
        ];
        let (_, max_clustered) = value_range(&series, false);
        let (_, max_stacked) = value_range(&series, true);
        assert!(max_clustered < max_stacked);
        assert!((max_stacked - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_slide_state_tracks_mutations() {
        let mut deck = PngDeck::new(RenderOptions::default(), StyleConfig::default());
        assert!(deck.set_slide_title("no slide yet").is_err());

        deck.append_slide(1).unwrap();
        deck.set_slide_title("title").unwrap();
        deck.set_axis_visibility(AxisId::Value, false).unwrap();
        deck.set_gap_width(100).unwrap();
        assert_eq!(deck.slide_count(), 1);
        assert!(!deck.slides[0].value_axis_visible);
        assert_eq!(deck.slides[0].gap_width, Some(100));

        deck.remove_last_slide().unwrap();
        assert_eq!(deck.slide_count(), 0);
        assert!(deck.remove_last_slide().is_err());
    }

    #[test]
    fn test_empty_chart_payload_rejected() {
        let mut deck = PngDeck::new(RenderOptions::default(), StyleConfig::default());
        deck.append_slide(1).unwrap();
        let err = deck.insert_chart(
            13,
            ChartTypeId::ColumnClustered,
            ChartPayload::Category {
                categories: vec![],
                series: vec![],
            },
        );
        assert!(err.is_err());
    }
}
