pub mod nav;
pub mod render;
pub mod token;
