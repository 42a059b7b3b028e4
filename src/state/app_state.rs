use crate::library::RecordingEntry;
use std::path::PathBuf;

/// Severity of a status line shown in the controls row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient message shown to the user
#[derive(Debug, Clone)]
pub struct StatusNotice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Root application state
///
/// Mutated only by the controller in response to user actions or drained
/// capture events; background threads never touch it directly.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub is_recording: bool,
    pub elapsed_seconds: f64,
    /// The just-recorded temp file or a selected saved file
    pub current_file: Option<PathBuf>,
    /// Whether the current file already lives in the library
    pub current_is_saved: bool,
    pub recordings: Vec<RecordingEntry>,
    pub selected: Option<String>,
    /// Recording armed for delete confirmation (second click deletes)
    pub pending_delete: Option<String>,
    pub status: Option<StatusNotice>,
    pub show_help: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the Recording state, discarding the previous current file.
    pub fn start_recording(&mut self) {
        self.is_recording = true;
        self.elapsed_seconds = 0.0;
        self.current_file = None;
        self.current_is_saved = false;
        self.selected = None;
        self.pending_delete = None;
        self.status = None;
    }

    /// Leave the Recording state. A finalized temp file becomes the current
    /// file, eligible for playback and saving.
    pub fn finish_recording(&mut self, temp_file: Option<PathBuf>) {
        self.is_recording = false;
        self.current_is_saved = false;
        self.current_file = temp_file;
    }

    /// Point the current file at a saved recording. Save is disabled since
    /// it is already persisted.
    pub fn select_saved(&mut self, name: String, path: PathBuf) {
        self.selected = Some(name);
        self.current_file = Some(path);
        self.current_is_saved = true;
        self.pending_delete = None;
    }

    pub fn mark_saved(&mut self) {
        self.current_is_saved = true;
    }

    pub fn can_play(&self) -> bool {
        !self.is_recording && self.current_file.is_some()
    }

    pub fn can_save(&self) -> bool {
        !self.is_recording && self.current_file.is_some() && !self.current_is_saved
    }

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.status = Some(StatusNotice {
            kind: NoticeKind::Info,
            message: message.into(),
        });
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = Some(StatusNotice {
            kind: NoticeKind::Error,
            message: message.into(),
        });
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cycle() {
        let mut state = AppState::new();
        assert!(!state.can_play());
        assert!(!state.can_save());

        state.start_recording();
        assert!(state.is_recording);
        assert!(!state.can_play());
        assert!(!state.can_save());

        state.finish_recording(Some(PathBuf::from("/tmp/take.wav")));
        assert!(!state.is_recording);
        assert!(state.can_play());
        assert!(state.can_save());
    }

    #[test]
    fn test_starting_again_discards_previous_result() {
        let mut state = AppState::new();
        state.finish_recording(Some(PathBuf::from("/tmp/old.wav")));
        state.start_recording();
        assert!(state.current_file.is_none());
        assert!(!state.can_save());
    }

    #[test]
    fn test_selecting_saved_disables_save() {
        let mut state = AppState::new();
        state.select_saved("take.wav".into(), PathBuf::from("recordings/take.wav"));
        assert!(state.can_play());
        assert!(!state.can_save());
        assert_eq!(state.selected.as_deref(), Some("take.wav"));
    }

    #[test]
    fn test_mark_saved_disables_save() {
        let mut state = AppState::new();
        state.finish_recording(Some(PathBuf::from("/tmp/take.wav")));
        assert!(state.can_save());
        state.mark_saved();
        assert!(!state.can_save());
        assert!(state.can_play());
    }

    #[test]
    fn test_failed_stop_leaves_nothing_playable() {
        let mut state = AppState::new();
        state.start_recording();
        state.finish_recording(None);
        assert!(!state.can_play());
        assert!(!state.can_save());
    }
}
