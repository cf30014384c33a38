mod registry;
mod types;

pub use registry::{
    group_member_name, Actor, ActorGroup, ActorId, ActorRegistry, ActorState, LookupError,
    RegistryError, RegistrySnapshot,
};
pub use types::{Color, ColorParseError, Field, Transform, Vec3};
