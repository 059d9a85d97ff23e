// Shop generation: seeding, weighted draws and the generator implementations

pub mod draw;
pub mod generator;
pub mod seed;

pub use draw::draw;
pub use generator::{CommandGenerator, NativeGenerator, ShopGenerator, TimestampMode};
pub use seed::{derive_seed, slot_start};
