//! Conversation transcript view

use crate::messages::{Entry, Sender, Transcript};
use crate::ui::theme::Theme;
use egui::{self, Align, Color32, RichText};

pub struct MessageList<'a> {
    transcript: &'a Transcript,
    error: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(transcript: &'a Transcript, error: Option<&'a str>, theme: &'a Theme) -> Self {
        Self {
            transcript,
            error,
            theme,
        }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.add_space(self.theme.spacing);

                for entry in self.transcript.entries() {
                    // egui ids must stay stable while a reply streams in
                    ui.push_id(entry.id(), |ui| self.show_entry(ui, entry));
                    ui.add_space(self.theme.spacing_sm);
                }

                if let Some(error) = self.error {
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new(error).size(13.0).color(self.theme.error));
                    });
                }

                ui.add_space(self.theme.spacing);
            });
    }

    fn show_entry(&self, ui: &mut egui::Ui, entry: Entry<'_>) {
        let is_user = entry.sender() == Sender::User;
        let (bubble, text_color, align) = if is_user {
            (self.theme.user_bubble, Color32::WHITE, Align::RIGHT)
        } else {
            (self.theme.assistant_bubble, self.theme.text_primary, Align::LEFT)
        };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            ui.label(
                RichText::new(entry.sender().to_string())
                    .size(12.0)
                    .color(self.theme.text_muted),
            );

            let max_width = ui.available_width() * 0.75;
            egui::Frame::none()
                .fill(bubble)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);
                    if entry.is_pending() && entry.text().is_empty() {
                        self.show_typing_indicator(ui);
                    } else {
                        ui.label(RichText::new(entry.text()).color(text_color));
                    }
                });
        });
    }

    fn show_typing_indicator(&self, ui: &mut egui::Ui) {
        let t = ui.ctx().input(|i| i.time);
        ui.horizontal(|ui| {
            for i in 0..3 {
                let alpha = ((t * 3.0 + i as f64 * 0.5).sin() * 0.5 + 0.5) as f32;
                ui.label(
                    RichText::new("●")
                        .size(10.0)
                        .color(self.theme.text_muted.gamma_multiply(alpha)),
                );
            }
        });
        ui.ctx().request_repaint();
    }
}
