//! Colors and styling for the tutor window

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Vec2, Visuals};

#[derive(Clone, Debug)]
pub struct Theme {
    pub primary: Color32,
    pub error: Color32,
    pub speaking: Color32,
    pub listening: Color32,

    pub bg_primary: Color32,
    pub bg_secondary: Color32,
    pub bg_tertiary: Color32,

    pub text_primary: Color32,
    pub text_muted: Color32,

    pub user_bubble: Color32,
    pub assistant_bubble: Color32,

    pub button_rounding: Rounding,
    pub bubble_rounding: Rounding,

    pub spacing: f32,
    pub spacing_sm: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            primary: Color32::from_rgb(56, 189, 248),    // Sky
            error: Color32::from_rgb(248, 113, 113),     // Red
            speaking: Color32::from_rgb(52, 211, 153),   // Emerald
            listening: Color32::from_rgb(239, 68, 68),   // Red

            bg_primary: Color32::from_rgb(15, 23, 42),   // Slate 900
            bg_secondary: Color32::from_rgb(30, 41, 59), // Slate 800
            bg_tertiary: Color32::from_rgb(51, 65, 85),  // Slate 700

            text_primary: Color32::from_rgb(241, 245, 249),
            text_muted: Color32::from_rgb(148, 163, 184),

            user_bubble: Color32::from_rgb(2, 132, 199),
            assistant_bubble: Color32::from_rgb(30, 41, 59),

            button_rounding: Rounding::same(8.0),
            bubble_rounding: Rounding::same(14.0),

            spacing: 16.0,
            spacing_sm: 8.0,
        }
    }

    /// Apply this theme to egui
    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = Visuals::dark();

        visuals.panel_fill = self.bg_primary;
        visuals.window_fill = self.bg_secondary;
        visuals.extreme_bg_color = self.bg_tertiary;

        visuals.widgets.inactive.bg_fill = self.bg_tertiary;
        visuals.widgets.hovered.bg_fill = self.primary.gamma_multiply(0.8);
        visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, self.text_primary);
        visuals.widgets.active.bg_fill = self.primary;

        visuals.selection.bg_fill = self.primary.gamma_multiply(0.3);
        visuals.selection.stroke = Stroke::new(1.0, self.primary);

        ctx.set_visuals(visuals);

        let mut style = (*ctx.style()).clone();
        style.spacing.item_spacing = Vec2::splat(self.spacing_sm);
        style.spacing.button_padding = Vec2::new(self.spacing_sm * 1.5, self.spacing_sm);
        style.text_styles.insert(
            egui::TextStyle::Heading,
            FontId::new(22.0, FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Body,
            FontId::new(15.0, FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            FontId::new(15.0, FontFamily::Proportional),
        );
        ctx.set_style(style);
    }
}
