pub mod commands;
pub mod text;
