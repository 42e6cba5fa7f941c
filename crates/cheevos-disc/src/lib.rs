//! Disc access and game identity for oxidized-cheevos

pub mod identity;
pub mod reader;

pub use identity::{compute_game_hash, game_hash, name_for_hash, IdentityResolver, Resolution, MAX_HASH_SIZE};
pub use reader::{ExecutableReader, FolderReader, ReadError};
