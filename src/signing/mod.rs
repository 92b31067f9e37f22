//! Code-signing setup around project generation
//!
//! - `profile` - `TARGET=PROFILE` mappings and their file names
//! - `stager` - staging the signing directory and restoring it afterwards

mod profile;
mod stager;

pub use profile::ProvisioningProfile;
pub use stager::{SigningStager, StageRequest, StageState, StagedSigning};
