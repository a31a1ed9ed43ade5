//! Host provisioning runtime.
//!
//! Steps run in order through the `orchestrator`; `gate`, `subnet` and
//! `remote` supply the decisions individual step bodies make, and `plan`
//! wires a JSON plan from `config` into runnable steps.
pub mod config;
pub mod error;
pub mod exec;
pub mod gate;
pub mod orchestrator;
pub mod plan;
pub mod prompt;
pub mod remote;
pub mod subnet;
