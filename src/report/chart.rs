//! Price-evolution charts rendered to RGB buffers
//!
//! Geometry only: price line, initial-price reference, local max/min
//! markers, and the first TP/SL event. Labels live in the PDF layer.

use crate::error::PipelineError;
use crate::record::PriceObservation;
use plotters::prelude::*;

pub const CHART_WIDTH: u32 = 1200;
pub const CHART_HEIGHT: u32 = 600;

/// Raw RGB8 pixels, row-major
pub struct ChartImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn render_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Render(e.to_string())
}

/// Chart one token's observations (assumed sorted by time, non-empty)
pub fn render_price_chart(obs: &[&PriceObservation]) -> Result<ChartImage, PipelineError> {
    if obs.is_empty() {
        return render_placeholder();
    }

    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let x_max = obs
            .last()
            .map(|o| o.seconds_since_detection)
            .unwrap_or(0)
            .max(1);
        let (mut y_min, mut y_max) = obs.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), o| (lo.min(o.price), hi.max(o.price)),
        );
        if y_min == y_max {
            // Flat series; give the axis some height
            y_min *= 0.95;
            y_max = y_max * 1.05 + f64::MIN_POSITIVE;
        }
        let margin = (y_max - y_min) * 0.05;

        let mut chart = ChartBuilder::on(&root)
            .margin(24)
            .build_cartesian_2d(0i64..x_max, (y_min - margin)..(y_max + margin))
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(
                obs.iter().map(|o| (o.seconds_since_detection, o.price)),
                BLACK.stroke_width(2),
            ))
            .map_err(render_err)?;

        // Initial-price reference line
        let start_price = obs[0].price;
        chart
            .draw_series(LineSeries::new(
                [(0i64, start_price), (x_max, start_price)],
                GREEN.stroke_width(1),
            ))
            .map_err(render_err)?;

        // Local max / min markers
        if let Some(max_obs) = obs
            .iter()
            .max_by(|a, b| a.price.total_cmp(&b.price))
        {
            chart
                .draw_series(std::iter::once(TriangleMarker::new(
                    (max_obs.seconds_since_detection, max_obs.price),
                    9,
                    BLUE.filled(),
                )))
                .map_err(render_err)?;
        }
        if let Some(min_obs) = obs
            .iter()
            .min_by(|a, b| a.price.total_cmp(&b.price))
        {
            chart
                .draw_series(std::iter::once(TriangleMarker::new(
                    (min_obs.seconds_since_detection, min_obs.price),
                    9,
                    RED.filled(),
                )))
                .map_err(render_err)?;
        }

        // First exit event, if any
        if let Some(event) = obs.iter().find(|o| o.trigger.is_event()) {
            let style = match event.trigger {
                crate::record::Trigger::TakeProfit => GREEN.stroke_width(3),
                _ => RED.stroke_width(3),
            };
            chart
                .draw_series(std::iter::once(Circle::new(
                    (event.seconds_since_detection, event.price),
                    8,
                    style,
                )))
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
    }

    Ok(ChartImage {
        pixels,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
    })
}

/// Empty frame drawn for tokens with no usable price history
pub fn render_placeholder() -> Result<ChartImage, PipelineError> {
    let mut pixels = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let w = CHART_WIDTH as i32;
        let h = CHART_HEIGHT as i32;
        let border = RGBColor(160, 160, 160);
        root.draw(&Rectangle::new(
            [(8, 8), (w - 8, h - 8)],
            border.stroke_width(2),
        ))
        .map_err(render_err)?;
        root.draw(&PathElement::new(vec![(8, 8), (w - 8, h - 8)], border))
            .map_err(render_err)?;
        root.draw(&PathElement::new(vec![(w - 8, 8), (8, h - 8)], border))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }
    Ok(ChartImage {
        pixels,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
    })
}
