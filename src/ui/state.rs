//! Presentation-only state for the input bar

/// Text in the message field
#[derive(Debug, Default)]
pub struct InputState {
    pub draft: String,
    was_listening: bool,
    detached: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// While listening the field shows the live transcript
    pub fn sync_with_voice(&mut self, listening: bool, transcript: &str) {
        if listening && !self.was_listening {
            self.detached = false;
        }
        if listening && !self.detached && self.draft != transcript {
            self.draft = transcript.to_string();
        }
        self.was_listening = listening;
    }

    /// Stop mirroring until the next listening session, e.g. after the user
    /// typed or submitted while capture was still winding down
    pub fn detach_from_voice(&mut self) {
        self.detached = true;
    }

    pub fn was_listening(&self) -> bool {
        self.was_listening
    }

    /// Take the draft if there is something to send
    pub fn take_submission(&mut self) -> Option<String> {
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.draft.clear();
        Some(text)
    }

    pub fn clear(&mut self) {
        self.draft.clear();
    }
}
