/// What hangs from the crane hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookLoad {
    #[default]
    Empty,
    /// A block destined for the given floor.
    Block(usize),
    Ball,
}

impl fmt::Display for HookLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Block(floor) => write!(f, "block({floor})"),
            Self::Ball => f.write_str("ball"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hook cannot go from {from} to {to}")]
pub struct HookTransitionError {
    pub from: HookLoad,
    pub to: HookLoad,
}

impl HookLoad {
    pub fn can_become(self, next: HookLoad) -> bool {
        matches!(
            (self, next),
            (Self::Empty, Self::Block(_))
                | (Self::Block(_), Self::Empty)
                | (Self::Empty, Self::Ball)
                | (Self::Ball, Self::Empty)
        )
    }
}

/// The actors whose visibility follows the hook load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRig {
    pub claw: ActorId,
    pub carried_block: ActorId,
    pub carried_ball: ActorId,
}

impl HookRig {
    /// Moves `load` to `next` and writes all three visibilities together, so
    /// the carried block and the carried ball are never shown at once.
    pub fn transition(
        self,
        load: &mut HookLoad,
        next: HookLoad,
        actors: &mut ActorRegistry,
    ) -> Result<(), HookTransitionError> {
        if !load.can_become(next) {
            return Err(HookTransitionError {
                from: *load,
                to: next,
            });
        }
        Self::show(self, next, actors);
        *load = next;
        Ok(())
    }

    fn show(self, load: HookLoad, actors: &mut ActorRegistry) {
        let (block, ball, claw) = match load {
            HookLoad::Empty => (false, false, true),
            HookLoad::Block(_) => (true, false, true),
            HookLoad::Ball => (false, true, false),
        };
        actors.set_visible(self.carried_block, block);
        actors.set_visible(self.carried_ball, ball);
        actors.set_visible(self.claw, claw);
    }
}
