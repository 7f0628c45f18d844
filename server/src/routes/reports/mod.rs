pub mod dashboard;
pub mod enrollment;
pub mod modules;
pub mod roster;
