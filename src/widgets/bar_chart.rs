use iced::{
    Color, Point, Rectangle, Renderer, Size, Theme, mouse,
    widget::canvas::{self, Path, Stroke, Text},
};

use crate::{
    analysis::ValueUnit,
    format::{ChartView, format_value},
    style,
};

/// Vertical bar chart for one payload series.
pub struct BarChartWidget<'a> {
    pub chart: &'a ChartView,
    pub cache: &'a canvas::Cache,
    pub tooltip_cache: &'a canvas::Cache,
}

impl<'a, Message> canvas::Program<Message> for BarChartWidget<'a> {
    type State = ();

    fn draw(
        &self,
        _: &Self::State,
        renderer: &Renderer,
        _: &Theme,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let pad_left = 70.0;
        let pad_right = 20.0;
        let pad_top = 30.0;
        let pad_bottom = 40.0;

        let chart_width = bounds.width - pad_left - pad_right;
        let chart_height = bounds.height - pad_top - pad_bottom;
        let bars = &self.chart.bars;

        let chart_geo = self.cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_text(Text {
                content: self.chart.title.to_string(),
                position: Point::new(pad_left, 10.0),
                color: style::TEXT_BRIGHT,
                size: 13.0.into(),
                align_y: iced::alignment::Vertical::Center,
                ..Default::default()
            });

            if bars.is_empty() {
                frame.fill_text(Text {
                    content: "No data".to_string(),
                    position: Point::new(bounds.width / 2.0, bounds.height / 2.0),
                    color: style::TEXT_MUTED,
                    size: 16.0.into(),
                    align_x: iced::alignment::Horizontal::Center.into(),
                    align_y: iced::alignment::Vertical::Center,
                    ..Default::default()
                });
                return;
            }

            let max_val = self.chart.max_value().max(1.0);
            let slot_width = chart_width / bars.len() as f32;
            let bar_width = (slot_width * 0.7).min(48.0);

            // Y-axis labels and grid
            for i in 0..=4 {
                let y_val = (max_val / 4.0) * i as f64;
                let y_pos = pad_top + chart_height - (chart_height * (y_val / max_val) as f32);

                frame.fill_text(Text {
                    content: axis_label(y_val, self.chart.unit),
                    position: Point::new(pad_left - 8.0, y_pos),
                    color: style::TEXT_MUTED,
                    size: 10.0.into(),
                    align_x: iced::alignment::Horizontal::Right.into(),
                    align_y: iced::alignment::Vertical::Center,
                    ..Default::default()
                });

                let line = Path::line(
                    Point::new(pad_left, y_pos),
                    Point::new(bounds.width - pad_right, y_pos),
                );
                frame.stroke(
                    &line,
                    Stroke::default()
                        .with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.1))
                        .with_width(1.0),
                );
            }

            // Skip labels so they don't overlap on dense series
            let label_every = ((bars.len() as f32 * 40.0) / chart_width.max(1.0)).ceil().max(1.0) as usize;

            for (i, bar) in bars.iter().enumerate() {
                let center_x = pad_left + i as f32 * slot_width + slot_width / 2.0;
                let height = (bar.value.max(0.0) / max_val) as f32 * chart_height;

                if height > 0.0 {
                    let rect = Path::rounded_rectangle(
                        Point::new(center_x - bar_width / 2.0, pad_top + chart_height - height),
                        Size::new(bar_width, height),
                        2.0.into(),
                    );
                    frame.fill(&rect, bar_color(self.chart.unit));
                }

                if i % label_every == 0 {
                    frame.fill_text(Text {
                        content: truncate(&bar.label, 10),
                        position: Point::new(center_x, bounds.height - pad_bottom + 15.0),
                        color: style::TEXT_MUTED,
                        size: 10.0.into(),
                        align_x: iced::alignment::Horizontal::Center.into(),
                        align_y: iced::alignment::Vertical::Center,
                        ..Default::default()
                    });
                }
            }

            frame.fill_text(Text {
                content: self.chart.x_label.to_string(),
                position: Point::new(pad_left + chart_width / 2.0, bounds.height - 8.0),
                color: style::TEXT_MUTED,
                size: 10.0.into(),
                align_x: iced::alignment::Horizontal::Center.into(),
                align_y: iced::alignment::Vertical::Center,
                ..Default::default()
            });
        });

        // Tooltip (dynamic)
        self.tooltip_cache.clear();

        let tooltip_geo = self.tooltip_cache.draw(renderer, bounds.size(), |frame| {
            if bars.is_empty() {
                return;
            }

            let Some(cursor_pos) = cursor.position_in(bounds) else {
                return;
            };

            if cursor_pos.x <= pad_left
                || cursor_pos.x >= bounds.width - pad_right
                || cursor_pos.y <= pad_top
                || cursor_pos.y >= bounds.height - pad_bottom
            {
                return;
            }

            let slot_width = chart_width / bars.len() as f32;
            let index = ((cursor_pos.x - pad_left) / slot_width) as usize;
            let Some(bar) = bars.get(index) else {
                return;
            };

            let lines = [bar.label.clone(), format_value(bar.value, self.chart.unit)];

            let tooltip_width = 140.0;
            let tooltip_height = 40.0;
            let mut tooltip_x = cursor_pos.x + 15.0;
            let mut tooltip_y = cursor_pos.y - tooltip_height - 10.0;

            if tooltip_x + tooltip_width > bounds.width {
                tooltip_x = cursor_pos.x - tooltip_width - 15.0;
            }
            if tooltip_y < 0.0 {
                tooltip_y = cursor_pos.y + 15.0;
            }

            let tooltip_bg = Path::rounded_rectangle(
                Point::new(tooltip_x, tooltip_y),
                Size::new(tooltip_width, tooltip_height),
                6.0.into(),
            );
            frame.fill(&tooltip_bg, style::TOOLTIP_BG);
            frame.stroke(
                &tooltip_bg,
                Stroke::default()
                    .with_color(style::STROKE_DIM)
                    .with_width(1.0),
            );

            for (i, line) in lines.iter().enumerate() {
                frame.fill_text(Text {
                    content: line.clone(),
                    position: Point::new(tooltip_x + 8.0, tooltip_y + 12.0 + i as f32 * 14.0),
                    color: if i == 0 {
                        style::TEXT_BRIGHT
                    } else {
                        style::TEXT_MUTED
                    },
                    size: 11.0.into(),
                    ..Default::default()
                });
            }
        });

        vec![chart_geo, tooltip_geo]
    }
}

fn bar_color(unit: ValueUnit) -> Color {
    match unit {
        ValueUnit::Count => style::ACCENT_BLUE,
        ValueUnit::Currency => style::ACCENT_GREEN,
        ValueUnit::Percent => style::ACCENT_ORANGE,
        ValueUnit::Score => style::ACCENT_CYAN,
    }
}

/// Compact axis label; currency axes drop the LKR prefix and decimals.
fn axis_label(value: f64, unit: ValueUnit) -> String {
    match unit {
        ValueUnit::Percent => format!("{:.0}%", value),
        _ if value >= 1_000_000.0 => format!("{:.1}M", value / 1_000_000.0),
        _ if value >= 1_000.0 => format!("{:.1}k", value / 1_000.0),
        _ => format!("{:.0}", value),
    }
}

fn truncate(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_chars - 1).collect();
        format!("{}…", head)
    }
}
