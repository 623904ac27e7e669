use super::{Observed, Visitor};
use crate::model::{FieldType, ObjectModel};
use crate::SizeError;

/// Forwards every hook to `tracing` at `TRACE` level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingVisitor;

impl<M: ObjectModel + ?Sized> Visitor<M> for TracingVisitor {
    fn start_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        shallow_bytes: u64,
    ) -> Result<(), SizeError> {
        tracing::trace!(object = %obj.label(), level, shallow_bytes, "start object");
        Ok(())
    }

    fn end_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        deep_bytes: u64,
    ) -> Result<(), SizeError> {
        tracing::trace!(object = %obj.label(), level, deep_bytes, "end object");
        Ok(())
    }

    fn start_field(&mut self, name: &str, declared: &FieldType, level: usize) -> Result<(), SizeError> {
        tracing::trace!(field = name, declared = %declared, level, "start field");
        Ok(())
    }

    fn end_field(&mut self, name: &str, declared: &FieldType, level: usize) -> Result<(), SizeError> {
        tracing::trace!(field = name, declared = %declared, level, "end field");
        Ok(())
    }
}
