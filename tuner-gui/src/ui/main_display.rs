//! # Main Display Module
//!
//! Builds the single tuner screen: instrument and string pickers, status
//! captions, the note readout with its cent meter and the microphone button.

use iced::widget::{button, column, container, horizontal_space, pick_list, row, text, Space};
use iced::{Alignment, Background, Color, Element, Length};
use tuner_core::Instrument;

use super::cent_meter::CentMeter;
use crate::{AppDisplayData, Message};

/// Shown in place of a note name when nothing is detected.
const NOTE_PLACEHOLDER: &str = "NOTE";

/// Creates the complete main application view.
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    let header = row![
        text("Multi-Instrument Tuner").size(28),
        horizontal_space(),
        create_theme_button(data.dark_mode),
    ]
    .align_y(Alignment::Center);

    let mut content = column![
        header,
        Space::with_height(10),
        create_pickers(data),
        text(format!("Selected: {}", data.instrument)).size(22),
    ]
    .spacing(10)
    .align_x(Alignment::Center);

    if let Some(string) = data.selected_string {
        content = content.push(text(format!("Tuning String: {string}")).size(18));
    }
    let microphone = if data.listening { "Active" } else { "Stopped" };
    content = content.push(text(format!("Microphone: {microphone}")).size(18));

    content = content
        .push(Space::with_height(20))
        .push(create_reading_panel(data))
        .push(Space::with_height(20))
        .push(create_listen_button(data.listening));

    if let Some(error) = &data.error {
        content = content.push(
            text(error.clone())
                .size(16)
                .color(Color::from_rgb(0.9, 0.3, 0.3)),
        );
    }

    container(content.max_width(520))
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .padding(20)
        .into()
}

/// Instrument picker, followed by a string picker for stringed instruments.
fn create_pickers(data: &AppDisplayData) -> Element<'static, Message> {
    let instruments = pick_list(
        Instrument::ALL,
        Some(data.instrument),
        Message::InstrumentSelected,
    )
    .width(Length::Fixed(180.0));

    let mut pickers = row![instruments].spacing(10);

    if data.instrument.is_stringed() {
        let strings = pick_list(
            data.instrument.strings(),
            data.selected_string,
            Message::StringSelected,
        )
        .placeholder("Select string")
        .width(Length::Fixed(180.0));
        pickers = pickers.push(strings);
    }

    pickers.into()
}

/// Note name, cent deviation and the meter.
fn create_reading_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let note = data
        .reading
        .note
        .clone()
        .unwrap_or_else(|| NOTE_PLACEHOLDER.to_string());
    let meter_cents = data.reading.note.as_ref().map(|_| data.reading.cents);

    let panel = column![
        text(note).size(72),
        CentMeter::new(meter_cents).view(),
        text(format!("{:.1} cents", data.reading.cents)).size(20),
    ]
    .spacing(10)
    .align_x(Alignment::Center);

    container(panel).width(Length::Fill).padding(15).into()
}

fn create_listen_button(listening: bool) -> Element<'static, Message> {
    let (label, color) = if listening {
        ("Stop Microphone", Color::from_rgb(0.8, 0.2, 0.2))
    } else {
        ("Start Microphone", Color::from_rgb(0.2, 0.6, 0.3))
    };

    button(text(label).size(18))
        .padding([12, 20])
        .style(move |_theme, _status| button::Style {
            background: Some(Background::Color(color)),
            text_color: Color::WHITE,
            ..button::Style::default()
        })
        .on_press(Message::ToggleListening)
        .into()
}

fn create_theme_button(dark_mode: bool) -> Element<'static, Message> {
    let label = if dark_mode { "Light Mode" } else { "Dark Mode" };
    button(text(label).size(14))
        .padding([6, 10])
        .on_press(Message::ToggleDarkMode)
        .into()
}
