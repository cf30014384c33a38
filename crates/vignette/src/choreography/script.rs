#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Reset,
    Arrival,
    Construction(usize),
    TruckExit,
    Equip,
    Demolition,
    Return,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => f.write_str("reset"),
            Self::Arrival => f.write_str("arrival"),
            Self::Construction(floor) => write!(f, "construction({floor})"),
            Self::TruckExit => f.write_str("truck-exit"),
            Self::Equip => f.write_str("equip"),
            Self::Demolition => f.write_str("demolition"),
            Self::Return => f.write_str("return"),
        }
    }
}

/// Script-owned state that callbacks read and write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptState {
    pub hook: HookLoad,
    pub phase: Phase,
    pub floors_placed: usize,
    /// Landing spots chosen for the debris of the latest impact.
    pub debris_targets: Vec<Vec3>,
}

impl ScriptState {
    fn reset(&mut self) {
        self.hook = HookLoad::Empty;
        self.phase = Phase::Reset;
        self.floors_placed = 0;
        self.debris_targets.clear();
    }
}

/// Crane headings toward each site landmark, solved once from the config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteBearings {
    pub truck: f32,
    pub building: f32,
    pub ball_rest: f32,
}

impl SiteBearings {
    pub fn solve(config: &VignetteConfig) -> Self {
        let crane = Xz::from(config.crane_position);
        let truck = bearing_to(crane, Xz::new(config.truck_stop_x, config.truck_lane_z));
        let building = bearing_or(crane, Xz::from(config.building_position), truck);
        let ball_rest = bearing_or(crane, Xz::from(config.ball_rest_position), building);
        Self {
            truck,
            building,
            ball_rest,
        }
    }
}

/// Hook travel for every stop in the script, as cable lengths below the jib.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SitePlan {
    bearings: SiteBearings,
    anchor: f32,
    block_height: f32,
    truck_bed_height: f32,
    base_offset: f32,
    safe_drop: f32,
    ball_drop: f32,
    smash_drop: f32,
}

impl SitePlan {
    fn new(config: &VignetteConfig) -> Self {
        let anchor = config.crane_anchor_height;
        Self {
            bearings: SiteBearings::solve(config),
            anchor,
            block_height: config.block_size.y,
            truck_bed_height: config.truck_bed_height,
            base_offset: config.base_offset,
            safe_drop: drop_distance(anchor, config.hook_safe_height),
            ball_drop: drop_distance(anchor, config.ball_rest_height + BALL_HANG),
            smash_drop: drop_distance(anchor, config.smash_height + BALL_HANG),
        }
    }

    /// The hook grips a block by its top face.
    fn cargo_drop(&self, slot: usize) -> f32 {
        let center = stack_pickup_height(self.truck_bed_height, slot, self.block_height);
        drop_distance(self.anchor, center + self.block_height / 2.0)
    }

    fn floor_drop(&self, floor: usize) -> f32 {
        let center = floor_drop_height(self.base_offset, floor, self.block_height);
        drop_distance(self.anchor, center + self.block_height / 2.0)
    }
}

/// Running crane heading while authoring, so each turn takes the short way.
#[derive(Debug, Clone, Copy)]
struct Slew {
    heading: f32,
}

impl Slew {
    fn toward(&mut self, bearing: f32) -> f32 {
        self.heading = nearest_heading(self.heading, bearing);
        self.heading
    }

    fn partway(&mut self, bearing: f32, fraction: f32) -> f32 {
        let target = nearest_heading(self.heading, bearing);
        self.heading += (target - self.heading) * fraction;
        self.heading
    }
}

#[derive(Debug, Clone)]
struct DebrisPlan {
    center: Vec3,
    half_footprint: f32,
    lowest: f32,
    highest: f32,
    flight: f32,
    shrink_delay: f32,
    shrink: f32,
    stagger: f32,
}

type Script = TimelineBuilder<ScriptState>;

fn author_construction(
    scope: &mut AuthoringScope<'_, ScriptState>,
    rig: &ConstructionRig,
    config: &VignetteConfig,
) -> Result<(), StartError> {
    let site = SitePlan::new(config);
    rig.pose_at_rest(scope.actors_mut(), config, &site);

    let mut timeline = scope.timeline(TIMELINE_NAME);
    timeline.on_cycle_start(reset_cycle);
    timeline.repeat(Repeat::Infinite, config.seconds(config.repeat_delay))?;

    let mut slew = Slew {
        heading: site.bearings.truck,
    };
    author_arrival(&mut timeline, rig, config)?;
    for floor in 0..rig.floors.len() {
        author_floor(&mut timeline, rig, config, &site, &mut slew, floor)?;
    }
    author_truck_exit(&mut timeline, rig, config)?;
    author_equip(&mut timeline, rig, config, &site, &mut slew)?;
    author_demolition(&mut timeline, rig, config, &site, &mut slew)?;
    author_return(&mut timeline, rig, config, &site, &mut slew)?;

    scope.adopt(timeline)?;
    Ok(())
}

fn reset_cycle(cue: &mut Cue<'_, ScriptState>) {
    cue.actors.restore_rest_pose();
    cue.state.reset();
}

fn enter(timeline: &mut Script, phase: Phase) -> Result<(), TimelineError> {
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        debug!(
            cycle = cue.cycle_index(),
            from = %cue.state.phase,
            to = %phase,
            "phase_entered"
        );
        cue.state.phase = phase;
    })?;
    Ok(())
}

fn turn(rig: &ConstructionRig, heading: f32, seconds: f32, ease: Easing) -> Tween {
    Tween::to(rig.pivot, Field::RotationY, heading)
        .duration(seconds)
        .ease(ease)
}

/// Pays the cable out to `drop`; the hook rides the cable end.
fn hoist(rig: &ConstructionRig, drop: f32, seconds: f32) -> Tween {
    Tween::drive(rig.hook, Field::PositionY, -1.0, drop)
        .linked(rig.cable, Field::ScaleY, 1.0)
        .duration(seconds)
        .ease(Easing::PowerInOut(2))
}

fn shift_hook(cue: &mut Cue<'_, ScriptState>, rig: HookRig, next: HookLoad) -> bool {
    match rig.transition(&mut cue.state.hook, next, cue.actors) {
        Ok(()) => true,
        Err(error) => {
            warn!(cycle = cue.cycle_index(), error = %error, "hook_transition_rejected");
            false
        }
    }
}

fn author_arrival(
    timeline: &mut Script,
    rig: &ConstructionRig,
    config: &VignetteConfig,
) -> Result<(), TimelineError> {
    let truck = rig.truck;
    enter(timeline, Phase::Arrival)?;
    timeline.tween(
        Tween::to(truck, Field::PositionX, config.truck_stop_x)
            .duration(config.seconds(ARRIVAL_SECONDS))
            .ease(Easing::PowerOut(2)),
    )?;
    timeline.label(ARRIVAL_LABEL)?;
    timeline.tween_at(
        Tween::to(truck, Field::PositionY, TRUCK_BOUNCE_HEIGHT)
            .duration(config.seconds(BOUNCE_SECONDS))
            .repeat(BOUNCE_REPEATS)
            .yoyo(true)
            .ease(Easing::SineInOut),
        0.0,
    )?;
    let (stretch, squash) = TRUCK_SQUASH;
    timeline.sequence([
        Tween::to(truck, Field::ScaleX, stretch)
            .and(truck, Field::ScaleY, squash)
            .duration(config.seconds(SQUASH_SECONDS))
            .ease(Easing::PowerOut(2))
            .into(),
        Tween::to(truck, Field::ScaleX, 1.0)
            .and(truck, Field::ScaleY, 1.0)
            .duration(config.seconds(RECOVER_SECONDS))
            .ease(Easing::BackOut(1.5))
            .into(),
    ])?;
    Ok(())
}

/// One pick-and-place round trip for `floor`, using the topmost cargo block
/// still on the truck.
fn author_floor(
    timeline: &mut Script,
    rig: &ConstructionRig,
    config: &VignetteConfig,
    site: &SitePlan,
    slew: &mut Slew,
    floor: usize,
) -> Result<(), StartError> {
    let (slot, cargo) = rig.cargo_for_floor(floor)?;
    let floor_id = rig
        .floors
        .get(floor)
        .ok_or_else(|| LookupError {
            name: choreo::group_member_name(FLOOR_ROLE, floor),
        })?;
    let hook_rig = rig.hook_rig();
    let carried = rig.carried_block;
    let color = config.floor_color(floor);
    let rotate = config.seconds(ROTATE_SECONDS);
    let travel = config.seconds(HOIST_SECONDS);
    let block = config.block_size;

    enter(timeline, Phase::Construction(floor))?;
    timeline.tween(turn(
        rig,
        slew.toward(site.bearings.truck),
        rotate,
        Easing::PowerInOut(2),
    ))?;
    timeline.tween(hoist(rig, site.cargo_drop(slot), travel))?;
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        cue.actors.set_color(carried, color);
        if shift_hook(cue, hook_rig, HookLoad::Block(floor)) {
            cue.actors.set_visible(cargo, false);
        }
    })?;
    timeline.tween(hoist(rig, site.safe_drop, travel))?;
    timeline.tween(turn(
        rig,
        slew.toward(site.bearings.building),
        rotate,
        Easing::PowerInOut(2),
    ))?;
    timeline.tween(hoist(rig, site.floor_drop(floor), travel))?;
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        shift_hook(cue, hook_rig, HookLoad::Empty);
        cue.actors.set_visible(floor_id, true);
        cue.state.floors_placed = floor + 1;
    })?;
    timeline.label(floor_label(floor))?;
    timeline.tween(
        Tween::to(floor_id, Field::ScaleX, block.x)
            .and(floor_id, Field::ScaleY, block.y)
            .and(floor_id, Field::ScaleZ, block.z)
            .duration(config.seconds(SETTLE_SECONDS))
            .ease(Easing::BackOut(1.5)),
    )?;
    timeline.tween_at(hoist(rig, site.safe_drop, travel), "<")?;
    Ok(())
}

fn author_truck_exit(
    timeline: &mut Script,
    rig: &ConstructionRig,
    config: &VignetteConfig,
) -> Result<(), TimelineError> {
    enter(timeline, Phase::TruckExit)?;
    timeline.tween(
        Tween::to(rig.truck, Field::RotationY, TRUCK_OUTBOUND_HEADING)
            .duration(config.seconds(TRUCK_TURN_SECONDS))
            .ease(Easing::PowerInOut(2)),
    )?;
    timeline.tween(
        Tween::to(rig.truck, Field::PositionX, config.truck_start_x)
            .duration(config.seconds(TRUCK_EXIT_SECONDS))
            .ease(Easing::PowerIn(2)),
    )?;
    Ok(())
}

fn author_equip(
    timeline: &mut Script,
    rig: &ConstructionRig,
    config: &VignetteConfig,
    site: &SitePlan,
    slew: &mut Slew,
) -> Result<(), TimelineError> {
    let hook_rig = rig.hook_rig();
    let stand = rig.ball_stand;
    let travel = config.seconds(HOIST_SECONDS);

    enter(timeline, Phase::Equip)?;
    timeline.tween(turn(
        rig,
        slew.toward(site.bearings.ball_rest),
        config.seconds(STORAGE_SWING_SECONDS),
        Easing::PowerInOut(2),
    ))?;
    timeline.tween(hoist(rig, site.ball_drop, travel))?;
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        if shift_hook(cue, hook_rig, HookLoad::Ball) {
            cue.actors.set_visible(stand, false);
        }
    })?;
    timeline.wait(config.seconds(GRAB_PAUSE_SECONDS))?;
    timeline.tween(hoist(rig, site.smash_drop, travel))?;
    Ok(())
}

fn author_demolition(
    timeline: &mut Script,
    rig: &ConstructionRig,
    config: &VignetteConfig,
    site: &SitePlan,
    slew: &mut Slew,
) -> Result<(), TimelineError> {
    let floors = rig.floors.members().to_vec();
    let debris = rig.debris.members().to_vec();
    let plan = DebrisPlan {
        center: config.building_position,
        half_footprint: config.block_size.x / 2.0,
        lowest: config.base_offset,
        highest: config.base_offset + floors.len() as f32 * config.block_size.y,
        flight: config.seconds(DEBRIS_FLIGHT_SECONDS),
        shrink_delay: config.seconds(DEBRIS_SHRINK_DELAY_SECONDS),
        shrink: config.seconds(DEBRIS_SHRINK_SECONDS),
        stagger: config.seconds(DEBRIS_STAGGER_SECONDS),
    };

    enter(timeline, Phase::Demolition)?;
    timeline.tween(turn(
        rig,
        slew.partway(site.bearings.building, WIND_UP_FRACTION),
        config.seconds(WIND_UP_SECONDS),
        Easing::PowerInOut(2),
    ))?;
    timeline.tween(turn(
        rig,
        slew.toward(site.bearings.building),
        config.seconds(SWING_SECONDS),
        Easing::PowerIn(1),
    ))?;
    timeline.wait(config.seconds(IMPACT_PAUSE_SECONDS))?;
    timeline.label(IMPACT_LABEL)?;
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        for &floor in &floors {
            cue.actors.set_visible(floor, false);
        }
        scatter_debris(cue, &debris, &plan);
    })?;
    timeline.wait(config.seconds(GRAB_PAUSE_SECONDS))?;
    Ok(())
}

fn scatter_debris(cue: &mut Cue<'_, ScriptState>, debris: &[ActorId], plan: &DebrisPlan) {
    cue.state.debris_targets.clear();
    for &piece in debris {
        let rng = cue.rng();
        let start = Vec3::new(
            plan.center.x + rng.gen_range(-plan.half_footprint..=plan.half_footprint),
            rng.gen_range(plan.lowest..=plan.highest),
            plan.center.z + rng.gen_range(-plan.half_footprint..=plan.half_footprint),
        );
        let target = Vec3::new(
            start.x + rng.gen_range(-DEBRIS_SCATTER..=DEBRIS_SCATTER),
            DEBRIS_REST_HEIGHT,
            start.z + rng.gen_range(-DEBRIS_SCATTER..=DEBRIS_SCATTER),
        );
        let spin = rng.gen_range(-PI..=PI);
        let stagger = rng.gen_range(0.0..=plan.stagger);

        cue.actors.set_position(piece, start);
        cue.actors.set_rotation(piece, Vec3::ZERO);
        cue.actors.set_scale(piece, Vec3::new(DEBRIS_SIZE, DEBRIS_SIZE, DEBRIS_SIZE));
        cue.actors.set_visible(piece, true);

        let flight = Tween::to(piece, Field::PositionX, target.x)
            .and(piece, Field::PositionY, target.y)
            .and(piece, Field::PositionZ, target.z)
            .duration(plan.flight)
            .ease(Easing::PowerOut(2));
        let tumble = Tween::to(piece, Field::RotationX, spin)
            .and(piece, Field::RotationZ, spin)
            .duration(plan.flight);
        let shrink = Tween::to(piece, Field::ScaleX, 0.0)
            .and(piece, Field::ScaleY, 0.0)
            .and(piece, Field::ScaleZ, 0.0)
            .delay(plan.shrink_delay)
            .duration(plan.shrink)
            .ease(Easing::PowerIn(2));
        for tween in [flight, tumble, shrink] {
            let anchor = Position::Label {
                name: IMPACT_LABEL.to_string(),
                offset: stagger,
            };
            if let Err(error) = cue.spawn(tween, anchor) {
                warn!(error = %error, "debris_spawn_failed");
            }
        }
        cue.state.debris_targets.push(target);
    }
    debug!(
        cycle = cue.cycle_index(),
        pieces = debris.len(),
        "debris_scattered"
    );
}

fn author_return(
    timeline: &mut Script,
    rig: &ConstructionRig,
    config: &VignetteConfig,
    site: &SitePlan,
    slew: &mut Slew,
) -> Result<(), TimelineError> {
    let hook_rig = rig.hook_rig();
    let stand = rig.ball_stand;
    let debris = rig.debris.members().to_vec();
    let swing = config.seconds(RETURN_SWING_SECONDS);
    let travel = config.seconds(HOIST_SECONDS);

    enter(timeline, Phase::Return)?;
    timeline.tween(turn(
        rig,
        slew.toward(site.bearings.ball_rest),
        swing,
        Easing::PowerInOut(1),
    ))?;
    timeline.tween(hoist(rig, site.ball_drop, travel))?;
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        if shift_hook(cue, hook_rig, HookLoad::Empty) {
            cue.actors.set_visible(stand, true);
        }
    })?;
    timeline.tween(hoist(rig, site.safe_drop, travel))?;
    timeline.tween(turn(
        rig,
        slew.toward(site.bearings.truck),
        swing,
        Easing::PowerInOut(1),
    ))?;
    timeline.call(move |cue: &mut Cue<'_, ScriptState>| {
        for &piece in &debris {
            cue.actors.set_visible(piece, false);
        }
    })?;
    Ok(())
}
