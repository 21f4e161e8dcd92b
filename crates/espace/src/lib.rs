//! Cadastre registration core.

pub mod caller;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod geography;
pub mod ids;
pub mod pagination;
pub mod registry;
pub mod storage;
pub mod telemetry;
pub mod validation;
