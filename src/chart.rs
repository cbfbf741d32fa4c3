//! Enrollment trend chart
//!
//! Renders an ordered sequence of data points as an SVG line chart. The layout
//! switches between a desktop and a mobile variant depending on the viewport
//! width. Data is drawn as given, only the y-axis domain is derived from it.
//!
//! The HTTP route renders once for a requested width. A long-lived UI shell
//! owns a [`Viewport`], calls [`Viewport::resize`] from its window resize
//! handler and re-renders each [`MountedChart`] it holds.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Viewports narrower than this use the mobile layout
pub const MOBILE_BREAKPOINT_PX: u32 = 640;
pub const DEFAULT_WIDTH_PX: u32 = 800;
pub const CHART_HEIGHT_PX: u32 = 300;

const Y_TICK_COUNT: u32 = 5;
const LINE_COLOR: &str = "#8884d8";
const GRID_COLOR: &str = "#e5e7eb";
const AXIS_COLOR: &str = "#6b7280";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChartDatum {
    pub name: String,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    Desktop,
    Mobile,
}

impl LayoutMode {
    pub fn for_width(width: u32) -> Self {
        if width < MOBILE_BREAKPOINT_PX {
            LayoutMode::Mobile
        } else {
            LayoutMode::Desktop
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Presentational constants of one layout mode
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartLayout {
    pub margins: Margins,
    pub font_size: f64,
    pub tick_angle: f64,
    pub tick_anchor: &'static str,
    pub x_axis_height: f64,
    pub y_axis_width: f64,
    pub stroke_width: f64,
    pub point_radius: f64,
}

impl ChartLayout {
    pub const fn for_mode(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Desktop => ChartLayout {
                margins: Margins {
                    top: 20.0,
                    right: 30.0,
                    bottom: 20.0,
                    left: 20.0,
                },
                font_size: 12.0,
                tick_angle: 0.0,
                tick_anchor: "middle",
                x_axis_height: 30.0,
                y_axis_width: 60.0,
                stroke_width: 3.0,
                point_radius: 5.0,
            },
            LayoutMode::Mobile => ChartLayout {
                margins: Margins {
                    top: 10.0,
                    right: 10.0,
                    bottom: 40.0,
                    left: 0.0,
                },
                font_size: 10.0,
                tick_angle: -45.0,
                tick_anchor: "end",
                x_axis_height: 60.0,
                y_axis_width: 40.0,
                stroke_width: 2.0,
                point_radius: 3.0,
            },
        }
    }
}

/// Upper bound of the y-axis
///
/// 100 when no value is above zero, otherwise the maximum plus 20% headroom
/// rounded up to the next multiple of 100.
pub fn y_max(data: &[ChartDatum]) -> f64 {
    let max = data
        .iter()
        .map(|datum| datum.value)
        .fold(f64::NEG_INFINITY, f64::max);

    if max <= 0.0 || !max.is_finite() {
        return 100.0;
    }

    (max * 1.2 / 100.0).ceil() * 100.0
}

/// Publishes the current viewport width to mounted charts
pub struct Viewport {
    width: watch::Sender<u32>,
}

impl Viewport {
    pub fn new(width: u32) -> Self {
        let (width, _) = watch::channel(width);
        Self { width }
    }

    pub fn resize(&self, width: u32) {
        self.width.send_replace(width);
    }

    pub fn width(&self) -> u32 {
        *self.width.borrow()
    }

    /// Number of charts currently mounted on this viewport
    pub fn listener_count(&self) -> usize {
        self.width.receiver_count()
    }
}

#[derive(Clone, Debug)]
pub struct EnrollmentTrendChart {
    data: Vec<ChartDatum>,
}

impl EnrollmentTrendChart {
    pub fn new(data: Vec<ChartDatum>) -> Self {
        Self { data }
    }

    /// Subscribe to viewport resizes until the returned chart is dropped
    pub fn mount(self, viewport: &Viewport) -> MountedChart {
        MountedChart {
            chart: self,
            width: viewport.width.subscribe(),
        }
    }

    pub fn render(&self, width: u32) -> String {
        let mode = LayoutMode::for_width(width);
        SvgRenderer::new(width, ChartLayout::for_mode(mode)).render(&self.data)
    }
}

/// Chart attached to a viewport, the subscription ends on drop
pub struct MountedChart {
    chart: EnrollmentTrendChart,
    width: watch::Receiver<u32>,
}

impl MountedChart {
    pub fn width(&self) -> u32 {
        *self.width.borrow()
    }

    pub fn layout_mode(&self) -> LayoutMode {
        LayoutMode::for_width(self.width())
    }

    pub fn render(&self) -> String {
        self.chart.render(self.width())
    }
}

struct SvgRenderer {
    width: f64,
    height: f64,
    layout: ChartLayout,
}

impl SvgRenderer {
    fn new(width: u32, layout: ChartLayout) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(CHART_HEIGHT_PX),
            layout,
        }
    }

    fn plot_left(&self) -> f64 {
        self.layout.margins.left + self.layout.y_axis_width
    }

    fn plot_right(&self) -> f64 {
        (self.width - self.layout.margins.right).max(self.plot_left())
    }

    fn plot_top(&self) -> f64 {
        self.layout.margins.top
    }

    fn plot_bottom(&self) -> f64 {
        (self.height - self.layout.margins.bottom - self.layout.x_axis_height).max(self.plot_top())
    }

    fn x_at(&self, index: usize, count: usize) -> f64 {
        let span = self.plot_right() - self.plot_left();

        if count <= 1 {
            return self.plot_left() + span / 2.0;
        }

        self.plot_left() + span * index as f64 / (count - 1) as f64
    }

    fn y_at(&self, value: f64, y_max: f64) -> f64 {
        let span = self.plot_bottom() - self.plot_top();
        self.plot_bottom() - span * value / y_max
    }

    fn render(&self, data: &[ChartDatum]) -> String {
        let y_max = y_max(data);
        let layout = &self.layout;
        let mut svg = String::new();

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" font-size="{}">"#,
            self.width, self.height, self.width, self.height, layout.font_size
        ));

        for tick in 0..Y_TICK_COUNT {
            let value = y_max * f64::from(tick) / f64::from(Y_TICK_COUNT - 1);
            let y = self.y_at(value, y_max);
            svg.push_str(&format!(
                r#"<line class="grid" x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{GRID_COLOR}" stroke-dasharray="3 3"/>"#,
                self.plot_left(),
                self.plot_right(),
            ));
            svg.push_str(&format!(
                r#"<text class="y-tick" x="{:.1}" y="{y:.1}" text-anchor="end" dominant-baseline="middle" fill="{AXIS_COLOR}">{value}</text>"#,
                self.plot_left() - 8.0,
            ));
        }

        svg.push_str(&format!(
            r#"<line class="x-axis" x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{AXIS_COLOR}"/>"#,
            self.plot_left(),
            self.plot_bottom(),
            self.plot_right(),
            self.plot_bottom(),
        ));

        let points: Vec<(f64, f64)> = data
            .iter()
            .enumerate()
            .map(|(index, datum)| (self.x_at(index, data.len()), self.y_at(datum.value, y_max)))
            .collect();

        for ((x, _), datum) in points.iter().zip(data) {
            let y = self.plot_bottom() + layout.font_size + 4.0;
            let rotation = if layout.tick_angle == 0.0 {
                String::new()
            } else {
                format!(r#" transform="rotate({} {x:.1} {y:.1})""#, layout.tick_angle)
            };
            svg.push_str(&format!(
                r#"<text class="x-tick" x="{x:.1}" y="{y:.1}" text-anchor="{}"{rotation} fill="{AXIS_COLOR}">{}</text>"#,
                layout.tick_anchor,
                escape(&datum.name),
            ));
        }

        if !points.is_empty() {
            let path = points
                .iter()
                .enumerate()
                .map(|(index, (x, y))| {
                    let command = if index == 0 { 'M' } else { 'L' };
                    format!("{command}{x:.1},{y:.1}")
                })
                .collect::<Vec<_>>()
                .join(" ");
            svg.push_str(&format!(
                r#"<path class="line" d="{path}" fill="none" stroke="{LINE_COLOR}" stroke-width="{}"/>"#,
                layout.stroke_width
            ));
        }

        for ((x, y), datum) in points.iter().zip(data) {
            svg.push_str(&format!(
                r#"<circle class="point" cx="{x:.1}" cy="{y:.1}" r="{}" fill="{LINE_COLOR}"><title>{}: {}</title></circle>"#,
                layout.point_radius,
                escape(&datum.name),
                datum.value,
            ));
        }

        svg.push_str("</svg>");
        svg
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }

    escaped
}
