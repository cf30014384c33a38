use std::error::Error;

pub type SceneError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// A mountable unit the frame loop drives.
pub trait Scene {
    fn load(&mut self) -> Result<(), SceneError>;
    fn update(&mut self, fixed_dt_seconds: f32) -> SceneCommand;
    fn unload(&mut self);
    fn actor_count(&self) -> usize;
    fn cycle_index(&self) -> u64 {
        0
    }
    fn steps_skipped(&self) -> u64 {
        0
    }
    fn debug_title(&self) -> Option<String> {
        None
    }
}
