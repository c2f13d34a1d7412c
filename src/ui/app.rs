//! Main application struct and eframe integration

use crate::integration::{ControllerEvent, ConversationController};
use crate::ui::components::{Header, InputBar, MessageList};
use crate::ui::state::InputState;
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, TopBottomPanel};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How often the backends are polled while nothing is happening
const IDLE_POLL: Duration = Duration::from_millis(250);
const BUSY_POLL: Duration = Duration::from_millis(30);

pub struct TutorApp {
    controller: ConversationController,
    input: InputState,
    theme: Theme,
    backgrounded: bool,
}

impl TutorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, controller: ConversationController) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);

        Self {
            controller,
            input: InputState::new(),
            theme,
            backgrounded: false,
        }
    }

    fn handle_events(&mut self, events: Vec<ControllerEvent>) {
        for event in events {
            match event {
                ControllerEvent::AutoSent(text) => {
                    debug!("Voice input sent: {:?}", text);
                    self.input.clear();
                }
                ControllerEvent::Error(error) => debug!("Conversation error: {}", error),
                ControllerEvent::StateChanged => {}
            }
        }
    }

    fn track_background(&mut self, ctx: &egui::Context) {
        let hidden = ctx.input(|i| {
            let viewport = i.viewport();
            viewport.minimized.unwrap_or(false) || viewport.focused == Some(false)
        });
        if hidden && !self.backgrounded {
            self.controller.on_background();
        }
        self.backgrounded = hidden;
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                Header::new(&mut self.controller, &self.theme).show(ui);
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context) {
        TopBottomPanel::bottom("input_area")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing),
            )
            .show(ctx, |ui| {
                InputBar::new(&mut self.controller, &mut self.input, &self.theme).show(ui);
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(egui::Margin::symmetric(self.theme.spacing, 0.0)),
            )
            .show(ctx, |ui| {
                MessageList::new(
                    self.controller.transcript(),
                    self.controller.error(),
                    &self.theme,
                )
                .show(ui);
            });
    }
}

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let events = self.controller.poll(Instant::now());
        self.handle_events(events);
        self.track_background(ctx);

        self.show_header(ctx);
        self.show_input_area(ctx);
        self.show_content(ctx);

        // stream and speech events arrive off the UI thread
        let next_poll = if self.controller.is_busy() {
            BUSY_POLL
        } else {
            IDLE_POLL
        };
        ctx.request_repaint_after(next_poll);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Echo shutting down");
        self.controller.shutdown();
    }
}
