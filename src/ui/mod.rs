//! Desktop user interface with egui/eframe

mod app;
mod components;
mod state;
mod theme;

pub use app::TutorApp;
pub use state::InputState;
pub use theme::Theme;

use crate::integration::ConversationController;

/// Open the tutor window. Blocks until it is closed.
pub fn run(controller: ConversationController) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 760.0])
            .with_min_inner_size([360.0, 420.0])
            .with_title("Echo - AI English Tutor"),
        ..Default::default()
    };

    eframe::run_native(
        "Echo",
        options,
        Box::new(move |cc| Ok(Box::new(TutorApp::new(cc, controller)))),
    )
}
