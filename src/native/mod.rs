/// Native module contains implementations of core traits
/// that launch the toolchain directly as child processes,
/// using syscalls for privilege dropping.
pub mod compiler;
pub mod privileges;
mod process;
pub mod runner;

use std::sync::Arc;

use crate::config::Config;
use crate::core::{
    artifacts::ArtifactStore, checker::Checker, pipeline::Pipeline, sanitize::Sanitizer,
};

use self::{compiler::NativeCompiler, privileges::SetuidDropper, runner::NativeRunner};

/// Wires a pipeline that compiles and runs submissions on this host.
pub fn pipeline(config: &Config) -> Result<Pipeline, regex::Error> {
    let sanitizer = Sanitizer::new(&config.toolchain.source_extension)?;

    Ok(Pipeline::new(
        ArtifactStore::from_config(config),
        Arc::new(NativeCompiler::from_config(config, sanitizer.clone())),
        Arc::new(NativeRunner::from_config(
            config,
            Arc::new(SetuidDropper),
            sanitizer.clone(),
        )),
        Checker::new(config.checker),
        sanitizer,
    ))
}
