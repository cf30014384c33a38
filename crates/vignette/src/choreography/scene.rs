/// Mounts the vignette into the frame loop.
pub struct ConstructionScene {
    config: VignetteConfig,
    cast: Option<ActorRegistry>,
    handle: Option<VignetteHandle>,
}

impl ConstructionScene {
    /// Plays against `cast` on load, or against [`default_registry`] when no
    /// cast is supplied.
    pub fn new(config: VignetteConfig, cast: Option<ActorRegistry>) -> Self {
        Self {
            config,
            cast,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<&VignetteHandle> {
        self.handle.as_ref()
    }
}

impl Scene for ConstructionScene {
    fn load(&mut self) -> Result<(), SceneError> {
        let actors = match self.cast.take() {
            Some(actors) => actors,
            None => default_registry(&self.config)?,
        };
        let handle = start(actors, &self.config)?;
        info!(
            floors = self.config.floors,
            actor_count = handle.actors().len(),
            seed = handle.seed(),
            "scene_loaded"
        );
        self.handle = Some(handle);
        Ok(())
    }

    fn update(&mut self, fixed_dt_seconds: f32) -> SceneCommand {
        match self.handle.as_mut() {
            Some(handle) => {
                handle.advance(fixed_dt_seconds);
                SceneCommand::None
            }
            None => SceneCommand::Quit,
        }
    }

    fn unload(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            stop(&mut handle);
        }
    }

    fn actor_count(&self) -> usize {
        self.handle
            .as_ref()
            .map(|handle| handle.actors().len())
            .unwrap_or_default()
    }

    fn cycle_index(&self) -> u64 {
        self.handle
            .as_ref()
            .map(VignetteHandle::cycle_index)
            .unwrap_or_default()
    }

    fn steps_skipped(&self) -> u64 {
        self.handle
            .as_ref()
            .map(|handle| handle.stats().steps_skipped)
            .unwrap_or_default()
    }

    fn debug_title(&self) -> Option<String> {
        let handle = self.handle.as_ref()?;
        Some(format!(
            "construction | cycle {} | {} | hook {}",
            handle.cycle_index(),
            handle.phase(),
            handle.hook_load()
        ))
    }
}
