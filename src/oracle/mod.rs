//! Shallow-size providers.

mod layout;

pub use layout::{LayoutConfig, LayoutOracle};

use crate::model::ObjectModel;
use crate::SizeError;

/// Reports the storage footprint of a single object: its header and its own
/// fields or elements, excluding anything it references.
pub trait FootprintOracle<M: ObjectModel + ?Sized> {
    /// Shallow size of `obj` in bytes.
    ///
    /// # Errors
    /// Returns [`SizeError::OracleUnavailable`] if the capability is missing, or
    /// any host error raised while inspecting `obj`.
    fn shallow_size(&self, model: &M, obj: M::Handle) -> Result<u64, SizeError>;
}
