use std::collections::HashMap;

use thiserror::Error;

use super::types::{Color, Field, Transform, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    name: String,
    pub transform: Transform,
    pub visible: bool,
    pub color: Option<Color>,
}

impl Actor {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("actor '{name}' is not registered")]
pub struct LookupError {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("actor name '{name}' is already registered")]
    DuplicateName { name: String },
    #[error("actor name cannot be empty")]
    EmptyName,
}

/// Ordered set of actors sharing a role, e.g. `building.floor.0..4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorGroup {
    role: String,
    members: Vec<ActorId>,
}

impl ActorGroup {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ActorId> {
        self.members.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.members.iter().copied()
    }

    pub fn members(&self) -> &[ActorId] {
        &self.members
    }
}

pub fn group_member_name(role: &str, index: usize) -> String {
    format!("{role}.{index}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrySnapshot {
    pub actors: Vec<ActorState>,
}

impl RegistrySnapshot {
    pub fn visibility(&self) -> Vec<(String, bool)> {
        self.actors
            .iter()
            .map(|actor| (actor.name.clone(), actor.visible))
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&ActorState> {
        self.actors.iter().find(|actor| actor.name == name)
    }
}

#[derive(Debug, Clone)]
struct RestPose {
    transform: Transform,
    visible: bool,
    color: Option<Color>,
}

/// Name-addressed transform state for every moving part of a scene.
///
/// Handles are stable for the registry's lifetime; names are unique. The
/// registry never animates anything itself.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: Vec<Actor>,
    by_name: HashMap<String, ActorId>,
    rest_pose: Vec<RestPose>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>) -> Result<ActorId, RegistryError> {
        self.register_with(name, Transform::default(), true)
    }

    pub fn register_with(
        &mut self,
        name: impl Into<String>,
        transform: Transform,
        visible: bool,
    ) -> Result<ActorId, RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }
        let id = ActorId(self.actors.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.actors.push(Actor {
            name,
            transform,
            visible,
            color: None,
        });
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Result<ActorId, LookupError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| LookupError {
                name: name.to_string(),
            })
    }

    /// Resolves `role.0 .. role.{count-1}`; every member must exist.
    pub fn group(&self, role: &str, count: usize) -> Result<ActorGroup, LookupError> {
        let members = (0..count)
            .map(|index| self.get(&group_member_name(role, index)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ActorGroup {
            role: role.to_string(),
            members,
        })
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        (id.0 as usize) < self.actors.len()
    }

    pub fn actor(&self, id: ActorId) -> &Actor {
        &self.actors[id.0 as usize]
    }

    pub fn actor_mut(&mut self, id: ActorId) -> &mut Actor {
        &mut self.actors[id.0 as usize]
    }

    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &Actor)> + '_ {
        self.actors
            .iter()
            .enumerate()
            .map(|(index, actor)| (ActorId(index as u32), actor))
    }

    pub fn transform(&self, id: ActorId) -> &Transform {
        &self.actor(id).transform
    }

    pub fn transform_mut(&mut self, id: ActorId) -> &mut Transform {
        &mut self.actor_mut(id).transform
    }

    pub fn field(&self, id: ActorId, field: Field) -> f32 {
        self.transform(id).get(field)
    }

    pub fn set_field(&mut self, id: ActorId, field: Field, value: f32) {
        self.transform_mut(id).set(field, value);
    }

    pub fn position(&self, id: ActorId) -> Vec3 {
        self.transform(id).position
    }

    pub fn set_position(&mut self, id: ActorId, position: Vec3) {
        self.transform_mut(id).position = position;
    }

    pub fn set_rotation(&mut self, id: ActorId, rotation: Vec3) {
        self.transform_mut(id).rotation = rotation;
    }

    pub fn set_scale(&mut self, id: ActorId, scale: Vec3) {
        self.transform_mut(id).scale = scale;
    }

    pub fn is_visible(&self, id: ActorId) -> bool {
        self.actor(id).visible
    }

    pub fn set_visible(&mut self, id: ActorId, visible: bool) {
        self.actor_mut(id).visible = visible;
    }

    pub fn color(&self, id: ActorId) -> Option<Color> {
        self.actor(id).color
    }

    pub fn set_color(&mut self, id: ActorId, color: Color) {
        self.actor_mut(id).color = Some(color);
    }

    /// Records the current state of every actor as the authored rest pose.
    pub fn capture_rest_pose(&mut self) {
        self.rest_pose = self
            .actors
            .iter()
            .map(|actor| RestPose {
                transform: actor.transform,
                visible: actor.visible,
                color: actor.color,
            })
            .collect();
    }

    pub fn has_rest_pose(&self) -> bool {
        !self.rest_pose.is_empty()
    }

    /// Puts every actor captured by [`Self::capture_rest_pose`] back into its
    /// rest state. Actors registered after the capture are left untouched.
    pub fn restore_rest_pose(&mut self) {
        for (actor, rest) in self.actors.iter_mut().zip(&self.rest_pose) {
            actor.transform = rest.transform;
            actor.visible = rest.visible;
            actor.color = rest.color;
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            actors: self
                .actors
                .iter()
                .map(|actor| ActorState {
                    name: actor.name.clone(),
                    transform: actor.transform,
                    visible: actor.visible,
                    color: actor.color,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_allocates_sequential_handles() {
        let mut registry = ActorRegistry::new();
        let first = registry.register("truck").expect("truck");
        let second = registry.register("crane.pivot").expect("pivot");

        assert_eq!(first, ActorId(0));
        assert_eq!(second, ActorId(1));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.actor(second).name(), "crane.pivot");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ActorRegistry::new();
        registry.register("truck").expect("truck");
        let err = registry.register("truck").expect_err("duplicate");
        assert_eq!(
            err,
            RegistryError::DuplicateName {
                name: "truck".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut registry = ActorRegistry::new();
        assert_eq!(registry.register(""), Err(RegistryError::EmptyName));
    }

    #[test]
    fn get_unknown_name_is_lookup_error() {
        let registry = ActorRegistry::new();
        let err = registry.get("crane.hook").expect_err("missing");
        assert_eq!(err.name, "crane.hook");
        assert_eq!(err.to_string(), "actor 'crane.hook' is not registered");
    }

    #[test]
    fn group_resolves_members_in_index_order() {
        let mut registry = ActorRegistry::new();
        registry.register("noise").expect("noise");
        let ids: Vec<ActorId> = (0..3)
            .map(|index| {
                registry
                    .register(group_member_name("truck.cargo", index))
                    .expect("cargo")
            })
            .collect();

        let group = registry.group("truck.cargo", 3).expect("group");
        assert_eq!(group.role(), "truck.cargo");
        assert_eq!(group.members(), ids.as_slice());
        assert_eq!(group.get(2), Some(ids[2]));
        assert_eq!(group.get(3), None);
    }

    #[test]
    fn group_fails_when_cardinality_exceeds_registered_members() {
        let mut registry = ActorRegistry::new();
        for index in 0..2 {
            registry
                .register(group_member_name("debris", index))
                .expect("debris");
        }
        let err = registry.group("debris", 3).expect_err("short group");
        assert_eq!(err.name, "debris.2");
    }

    #[test]
    fn field_writes_are_visible_through_transform_accessors() {
        let mut registry = ActorRegistry::new();
        let hook = registry.register("crane.hook").expect("hook");
        registry.set_field(hook, Field::PositionY, -2.5);
        registry.set_field(hook, Field::ScaleX, 0.5);

        assert_eq!(registry.position(hook).y, -2.5);
        assert_eq!(registry.transform(hook).scale.x, 0.5);
        assert_eq!(registry.field(hook, Field::PositionY), -2.5);
    }

    #[test]
    fn restore_rest_pose_reverts_transform_visibility_and_color() {
        let mut registry = ActorRegistry::new();
        let block = registry
            .register_with("building.floor.0", Transform::at(Vec3::new(0.0, 0.5, 0.0)), false)
            .expect("block");
        registry.set_scale(block, Vec3::ZERO);
        registry.capture_rest_pose();
        let rest = registry.snapshot();

        registry.set_visible(block, true);
        registry.set_scale(block, Vec3::ONE);
        registry.set_rotation(block, Vec3::new(1.0, 0.0, 1.0));
        registry.set_color(block, Color::rgb(1, 2, 3));
        assert_ne!(registry.snapshot(), rest);

        registry.restore_rest_pose();
        assert_eq!(registry.snapshot(), rest);
    }

    #[test]
    fn restore_without_capture_is_a_no_op() {
        let mut registry = ActorRegistry::new();
        let truck = registry.register("truck").expect("truck");
        registry.set_position(truck, Vec3::new(3.0, 0.0, 2.0));
        assert!(!registry.has_rest_pose());

        registry.restore_rest_pose();
        assert_eq!(registry.position(truck), Vec3::new(3.0, 0.0, 2.0));
    }

    #[test]
    fn snapshot_visibility_preserves_registration_order() {
        let mut registry = ActorRegistry::new();
        let a = registry.register("a").expect("a");
        registry.register("b").expect("b");
        registry.set_visible(a, false);

        assert_eq!(
            registry.snapshot().visibility(),
            vec![("a".to_string(), false), ("b".to_string(), true)]
        );
    }
}
