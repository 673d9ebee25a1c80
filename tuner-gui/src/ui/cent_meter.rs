//! # Cent Meter Widget
//!
//! Horizontal meter showing how far the current pitch sits from its target,
//! from -50 (flat) to +50 (sharp) cents.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Length, Point, Rectangle, Renderer, Size, Theme};

/// Half-width of the meter in cents.
const METER_RANGE: f32 = 50.0;

/// Deviation treated as in tune.
const IN_TUNE_CENTS: f32 = 5.0;

/// Deviation that is close but still audible.
const NEAR_CENTS: f32 = 20.0;

pub struct CentMeter {
    /// Deviation of the current reading, `None` when no note is shown.
    cents: Option<f32>,
}

impl CentMeter {
    pub fn new(cents: Option<f32>) -> Self {
        Self { cents }
    }

    pub fn view<'a, Message: 'a>(self) -> Element<'a, Message> {
        container(
            canvas::Canvas::new(self)
                .width(Length::Fill)
                .height(Length::Fixed(60.0)),
        )
        .into()
    }
}

/// Maps a cent value to an x position inside `width`.
fn cents_to_x(cents: f32, width: f32) -> f32 {
    let clamped = cents.clamp(-METER_RANGE, METER_RANGE);
    (clamped + METER_RANGE) / (2.0 * METER_RANGE) * width
}

fn zone_color(cents: f32) -> Color {
    let deviation = cents.abs();
    if deviation < IN_TUNE_CENTS {
        Color::from_rgb8(0x34, 0xDB, 0x98)
    } else if deviation < NEAR_CENTS {
        Color::from_rgb8(0xFF, 0xC3, 0x00)
    } else {
        Color::from_rgb8(0xFF, 0x33, 0x33)
    }
}

impl<Message> canvas::Program<Message> for CentMeter {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let palette = theme.extended_palette();

        let background = Path::rectangle(Point::ORIGIN, bounds.size());
        frame.fill(&background, palette.background.weak.color);

        // In-tune band
        let band_left = cents_to_x(-IN_TUNE_CENTS, bounds.width);
        let band_right = cents_to_x(IN_TUNE_CENTS, bounds.width);
        let band = Path::rectangle(
            Point::new(band_left, 0.0),
            Size::new(band_right - band_left, bounds.height),
        );
        frame.fill(&band, Color::from_rgba8(0x34, 0xDB, 0x98, 0.25));

        // Ticks every 10 cents, the centre one full height
        for step in -5..=5 {
            let x = cents_to_x(step as f32 * 10.0, bounds.width);
            let top = if step == 0 { 0.0 } else { bounds.height * 0.6 };
            let tick = Path::line(Point::new(x, top), Point::new(x, bounds.height));
            frame.stroke(
                &tick,
                Stroke::default()
                    .with_width(if step == 0 { 2.0 } else { 1.0 })
                    .with_color(palette.background.base.text),
            );
        }

        if let Some(cents) = self.cents {
            let x = cents_to_x(cents, bounds.width);
            let needle = Path::rectangle(Point::new(x - 2.0, 0.0), Size::new(4.0, bounds.height));
            frame.fill(&needle, zone_color(cents));
        }

        vec![frame.into_geometry()]
    }
}
