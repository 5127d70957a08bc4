// Load set validation

use crate::cache::HeaderCache;
use crate::error::{InvalidImage, LoadError};
use crate::slot::Slot;

/// Checks that the cached headers form a loadable set.
///
/// With an rtld present every image must place .text at offset zero,
/// since rtld relocates and dispatches the others. Without one only
/// `main` may be loaded, and it must start at offset zero itself.
pub fn validate(cache: &HeaderCache) -> Result<(), LoadError> {
    check(cache).map_err(|reason| {
        log::warn!("rejected load set: {}", reason);
        reason.into()
    })
}

fn check(cache: &HeaderCache) -> Result<(), InvalidImage> {
    let main = cache.main().ok_or(InvalidImage::NoMainImage)?;

    if cache.rtld().is_some() {
        if let Some((slot, _)) = cache
            .present()
            .find(|(_, header)| header.text().dst_offset != 0)
        {
            return Err(InvalidImage::NonZeroTextBase(slot));
        }
    } else {
        if let Some(slot) = Slot::subsdks().find(|slot| cache.is_present(*slot)) {
            return Err(InvalidImage::ModuleWithoutRtld(slot));
        }
        if main.text().dst_offset != 0 {
            return Err(InvalidImage::NonZeroTextBase(Slot::MAIN));
        }
    }

    Ok(())
}
