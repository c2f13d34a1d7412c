//! Message field with microphone and send controls

use crate::integration::ConversationController;
use crate::ui::state::InputState;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};
use tracing::warn;

pub struct InputBar<'a> {
    controller: &'a mut ConversationController,
    input: &'a mut InputState,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(
        controller: &'a mut ConversationController,
        input: &'a mut InputState,
        theme: &'a Theme,
    ) -> Self {
        Self {
            controller,
            input,
            theme,
        }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let voice = self.controller.voice_input().clone();
        self.input.sync_with_voice(voice.listening, &voice.transcript);

        if let Some(error) = &voice.last_error {
            ui.label(RichText::new(error).size(12.0).color(self.theme.error));
        }

        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.bubble_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if self.controller.voice_input_supported() {
                        self.show_mic_button(ui, voice.listening);
                    }
                    self.show_text_input(ui, voice.listening);
                    self.show_send_button(ui);
                });
            });
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui, listening: bool) {
        let (tooltip, color) = if listening {
            ("Stop listening", self.theme.listening)
        } else {
            ("Speak your message", self.theme.text_muted)
        };

        let button = egui::Button::new(RichText::new("🎤").size(18.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);
        let button = if listening {
            button.fill(self.theme.listening.gamma_multiply(0.2))
        } else {
            button
        };

        let clicked = ui
            .add_enabled(!self.controller.is_loading(), button)
            .on_hover_text(tooltip)
            .clicked();
        if !clicked {
            return;
        }

        if listening {
            self.controller.stop_listening();
        } else {
            self.input.clear();
            if let Err(e) = self.controller.start_listening() {
                warn!("Could not start listening: {}", e);
            }
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui, listening: bool) {
        let hint = if listening {
            "Listening..."
        } else {
            "Type your message..."
        };
        let width = ui.available_width() - 56.0;

        let response = ui.add_enabled(
            !self.controller.is_loading(),
            egui::TextEdit::singleline(&mut self.input.draft)
                .hint_text(hint)
                .desired_width(width)
                .margin(egui::Margin::symmetric(10.0, 8.0)),
        );

        if response.changed() && listening {
            self.input.detach_from_voice();
            self.controller.input_edited();
        }
        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            self.submit();
            response.request_focus();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let can_send = !self.input.draft.trim().is_empty() && !self.controller.is_loading();
        let button = egui::Button::new(RichText::new("➤").size(18.0))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding)
            .fill(if can_send {
                self.theme.primary
            } else {
                self.theme.bg_tertiary
            });

        if ui.add_enabled(can_send, button).on_hover_text("Send (Enter)").clicked() {
            self.submit();
        }
    }

    fn submit(&mut self) {
        if self.controller.is_loading() {
            return;
        }
        if self.controller.voice_input().listening {
            self.input.detach_from_voice();
            self.controller.stop_listening();
        }
        if let Some(text) = self.input.take_submission() {
            if let Err(e) = self.controller.send_message(&text) {
                warn!("Send failed: {}", e);
            }
        }
    }
}
