//! Lifecycle Module
//!
//! Generation naming, installation, and the install/activate state machine.

mod controller;
mod generation;
mod installer;


pub use controller::{ActivationReport, LifecycleController, LifecycleState};
pub use generation::GenerationManager;
pub use installer::{InstallReport, Installer};
