//! CLI command implementations.
//!
//! | Module | Responsibility                                        |
//! |--------|-------------------------------------------------------|
//! | `run`  | Resolve configuration, build the pipeline, run it      |

pub mod run;

pub use run::run_pipeline;
