pub mod expanded;
pub mod mirror;
pub mod panel;

pub use expanded::{ ExpandedChat, MirrorMode };
pub use mirror::TranscriptView;
pub use panel::{ ChatPanel, Hook, PanelHooks };
