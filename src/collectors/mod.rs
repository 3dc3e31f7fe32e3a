pub mod checks;
pub mod resources;
pub mod system;
