/// Handles for every actor the construction script drives.
///
/// Hook, cable, claw and carried pieces are positioned relative to the crane
/// jib; cargo blocks relative to the truck. Everything else is in site space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionRig {
    pub truck: ActorId,
    pub pivot: ActorId,
    pub hook: ActorId,
    pub cable: ActorId,
    pub claw: ActorId,
    pub carried_block: ActorId,
    pub carried_ball: ActorId,
    pub ball_stand: ActorId,
    pub cargo: ActorGroup,
    pub floors: ActorGroup,
    pub debris: ActorGroup,
}

impl ConstructionRig {
    pub fn resolve(actors: &ActorRegistry, config: &VignetteConfig) -> Result<Self, LookupError> {
        let floors = config.floors as usize;
        Ok(Self {
            truck: actors.get(TRUCK)?,
            pivot: actors.get(CRANE_PIVOT)?,
            hook: actors.get(CRANE_HOOK)?,
            cable: actors.get(CRANE_CABLE)?,
            claw: actors.get(CRANE_CLAW)?,
            carried_block: actors.get(CARRIED_BLOCK)?,
            carried_ball: actors.get(CARRIED_BALL)?,
            ball_stand: actors.get(BALL_STAND)?,
            cargo: actors.group(CARGO_ROLE, floors)?,
            floors: actors.group(FLOOR_ROLE, floors)?,
            debris: actors.group(DEBRIS_ROLE, config.debris_count as usize)?,
        })
    }

    pub fn hook_rig(&self) -> HookRig {
        HookRig {
            claw: self.claw,
            carried_block: self.carried_block,
            carried_ball: self.carried_ball,
        }
    }

    /// Cargo slot picked for `floor`: the stack is emptied from the top.
    pub fn cargo_for_floor(&self, floor: usize) -> Result<(usize, ActorId), LookupError> {
        self.cargo
            .len()
            .checked_sub(floor + 1)
            .and_then(|slot| self.cargo.get(slot).map(|id| (slot, id)))
            .ok_or_else(|| LookupError {
                name: choreo::group_member_name(CARGO_ROLE, floor),
            })
    }

    /// Writes the pose every cycle starts from.
    fn pose_at_rest(&self, actors: &mut ActorRegistry, config: &VignetteConfig, site: &SitePlan) {
        let block = config.block_size;

        actors.set_position(
            self.truck,
            Vec3::new(config.truck_start_x, 0.0, config.truck_lane_z),
        );
        actors.set_rotation(self.truck, Vec3::new(0.0, TRUCK_INBOUND_HEADING, 0.0));
        actors.set_scale(self.truck, Vec3::ONE);
        actors.set_visible(self.truck, true);

        actors.set_position(
            self.pivot,
            Vec3::new(
                config.crane_position.x,
                config.crane_anchor_height,
                config.crane_position.z,
            ),
        );
        actors.set_rotation(self.pivot, Vec3::new(0.0, site.bearings.truck, 0.0));

        actors.set_position(self.hook, Vec3::new(0.0, -site.safe_drop, 0.0));
        actors.set_visible(self.hook, true);
        actors.set_scale(self.cable, Vec3::new(1.0, site.safe_drop, 1.0));
        actors.set_visible(self.cable, true);

        actors.set_position(self.carried_block, Vec3::new(0.0, -block.y / 2.0, 0.0));
        actors.set_scale(self.carried_block, block);
        actors.set_position(self.carried_ball, Vec3::new(0.0, -BALL_HANG, 0.0));
        actors.set_scale(self.carried_ball, Vec3::new(BALL_SIZE, BALL_SIZE, BALL_SIZE));
        HookRig::show(self.hook_rig(), HookLoad::Empty, actors);

        actors.set_position(
            self.ball_stand,
            Vec3::new(
                config.ball_rest_position.x,
                config.ball_rest_height,
                config.ball_rest_position.z,
            ),
        );
        actors.set_scale(self.ball_stand, Vec3::new(BALL_SIZE, BALL_SIZE, BALL_SIZE));
        actors.set_visible(self.ball_stand, true);

        let floors = self.floors.len();
        for (slot, cargo) in self.cargo.iter().enumerate() {
            actors.set_position(
                cargo,
                Vec3::new(0.0, stack_pickup_height(config.truck_bed_height, slot, block.y), 0.0),
            );
            actors.set_rotation(cargo, Vec3::ZERO);
            actors.set_scale(cargo, block);
            actors.set_color(cargo, config.floor_color(floors - 1 - slot));
            actors.set_visible(cargo, true);
        }

        for (floor, id) in self.floors.iter().enumerate() {
            actors.set_position(
                id,
                Vec3::new(
                    config.building_position.x,
                    floor_drop_height(config.base_offset, floor, block.y),
                    config.building_position.z,
                ),
            );
            actors.set_rotation(id, Vec3::ZERO);
            actors.set_scale(id, Vec3::ZERO);
            actors.set_color(id, config.floor_color(floor));
            actors.set_visible(id, false);
        }

        for piece in self.debris.iter() {
            actors.set_position(piece, config.building_position);
            actors.set_rotation(piece, Vec3::ZERO);
            actors.set_scale(piece, Vec3::new(DEBRIS_SIZE, DEBRIS_SIZE, DEBRIS_SIZE));
            actors.set_visible(piece, false);
        }
    }
}

/// Registers the full cast for `config` with placeholder transforms. Stands in
/// for a renderer that owns the real scene nodes.
pub fn default_registry(config: &VignetteConfig) -> Result<ActorRegistry, RegistryError> {
    let mut actors = ActorRegistry::new();
    for name in [
        TRUCK,
        CRANE_PIVOT,
        CRANE_HOOK,
        CRANE_CABLE,
        CRANE_CLAW,
        CARRIED_BLOCK,
        CARRIED_BALL,
        BALL_STAND,
    ] {
        actors.register(name)?;
    }
    for floor in 0..config.floors as usize {
        actors.register(choreo::group_member_name(CARGO_ROLE, floor))?;
    }
    for floor in 0..config.floors as usize {
        actors.register_with(
            choreo::group_member_name(FLOOR_ROLE, floor),
            Transform::at(config.building_position),
            false,
        )?;
    }
    for piece in 0..config.debris_count as usize {
        actors.register_with(
            choreo::group_member_name(DEBRIS_ROLE, piece),
            Transform::at(config.building_position),
            false,
        )?;
    }
    debug!(actor_count = actors.len(), "default_registry_built");
    Ok(actors)
}
