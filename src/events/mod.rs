pub mod anr;
pub mod input;

pub use anr::{AnrEvent, AppBundleInfo, AppInfo};
pub use input::{InputEvent, InputEventKind};
