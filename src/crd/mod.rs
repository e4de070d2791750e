//! # Custom Resource Definitions
//!
//! Resource model used by the dispatcher.
//!
//! ## Module Structure
//!
//! - `resource.rs` - Resource identity and finalizer/generation/deletion bookkeeping
//! - `sample.rs` - `Sample` CRD served by the bundled controller binary

mod resource;
mod sample;

pub use resource::{
    add_finalizer, generation, has_finalizer, is_marked_for_deletion, remove_finalizer,
    resource_type_name, ResourceKey,
};
pub use sample::{Sample, SampleSpec, SampleState, SampleStatus};
