pub mod compiler;
pub mod privileges;
pub mod runner;
