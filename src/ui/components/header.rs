//! Title bar with voice output controls

use crate::integration::ConversationController;
use crate::speech::VoiceGender;
use crate::ui::theme::Theme;
use egui::{self, RichText, Vec2};

pub struct Header<'a> {
    controller: &'a mut ConversationController,
    theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(controller: &'a mut ConversationController, theme: &'a Theme) -> Self {
        Self { controller, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new("Echo")
                    .size(20.0)
                    .strong()
                    .color(self.theme.text_primary),
            );
            ui.label(
                RichText::new("AI English Tutor")
                    .size(14.0)
                    .color(self.theme.text_muted),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let output = self.controller.voice_output().clone();

                let (icon, tooltip) = if output.enabled {
                    ("🔊", "Mute spoken replies")
                } else {
                    ("🔇", "Speak replies aloud")
                };
                let toggle = egui::Button::new(RichText::new(icon).size(18.0))
                    .min_size(Vec2::splat(36.0))
                    .rounding(self.theme.button_rounding);
                if ui.add(toggle).on_hover_text(tooltip).clicked() {
                    self.controller.toggle_voice_output();
                }

                if output.enabled && self.controller.has_voice_options() {
                    for gender in [VoiceGender::Male, VoiceGender::Female] {
                        let selected = output.gender == gender;
                        if ui
                            .selectable_label(selected, gender.to_string())
                            .on_hover_text("Tutor voice")
                            .clicked()
                            && !selected
                        {
                            self.controller.set_voice_gender(gender);
                        }
                    }
                }

                if output.speaking {
                    ui.label(
                        RichText::new("Speaking…")
                            .size(12.0)
                            .color(self.theme.speaking),
                    );
                    ui.ctx().request_repaint();
                }
            });
        });
    }
}
