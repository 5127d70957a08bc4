//! NSO load planning
//!
//! Decides which images of a title are loaded together and where each of
//! them, plus the argument region, is placed in the new process' address
//! space. A load request runs three stages in order:
//!
//! 1. [`cache::load_headers`] reads the header of every slot.
//! 2. [`validate::validate`] checks that the set is loadable.
//! 3. [`extents::compute_extents`] packs the set into an address space.
//!
//! Every request owns its own [`HeaderCache`]; nothing is shared between
//! requests.

pub mod aslr;
pub mod cache;
pub mod config;
pub mod error;
pub mod extents;
pub mod header;
pub mod kernel;
pub mod logger;
pub mod slot;
pub mod source;
pub mod validate;


pub use crate::cache::HeaderCache;
pub use crate::error::{InvalidImage, LoadError};
pub use crate::extents::{AddressSpace, AddressSpaceType, LoadExtents};
pub use crate::header::{NsoHeader, NsoSegment};
pub use crate::slot::{Slot, TitleId};

use crate::aslr::SlideSource;
use crate::kernel::KernelCapabilities;
use crate::source::ImageSource;

/// Parameters of one process creation
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest {
    pub title_id: TitleId,
    pub addspace_type: AddressSpaceType,
    /// Size of the serialized arguments, zero if none
    pub args_size: u32,
}

/// Headers and layout of a load set ready to be mapped
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub headers: HeaderCache,
    pub extents: LoadExtents,
}

pub fn plan_load<S: ImageSource>(
    source: &S,
    kernel: &dyn KernelCapabilities,
    slide_source: &mut dyn SlideSource,
    request: &LoadRequest,
) -> Result<LoadPlan, LoadError> {
    log::info!(
        "planning {} type {:#x} args {:#x}",
        request.title_id,
        request.addspace_type.bits(),
        request.args_size
    );

    let headers = cache::load_headers(source, request.title_id)?;
    validate::validate(&headers)?;
    let extents = extents::compute_extents(
        &headers,
        request.addspace_type,
        request.args_size,
        kernel,
        slide_source,
    )?;

    for (slot, _) in headers.present() {
        log::debug!(
            "{}: {:#012x} size {:#x}",
            slot,
            extents.address_of(slot),
            extents.size_of(slot)
        );
    }

    Ok(LoadPlan { headers, extents })
}
