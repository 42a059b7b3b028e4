//! Application state owned by the controller

mod app_state;

pub use app_state::{AppState, NoticeKind, StatusNotice};
