//! An indented, human-readable trace of a measurement.
//!
//! ```text
//! Holder@f(24 bytes) {
//!   count: Integer@10(interned)
//!   label: String@12(24 bytes) {
//!     value: byte[5]@11(24 bytes)
//!     hash: int
//!   }->(48 deep bytes)
//! }->(72 deep bytes)
//! ```
//!
//! Objects charged nothing (already visited, flyweight) print as
//! `(interned)` on one line and null references as `null`; objects with
//! visited fields open a block that is closed with their deep size.

use std::io::Write;

use super::{Observed, Visitor};
use crate::model::{FieldType, ObjectModel};
use crate::SizeError;

/// Writes a measurement tree to any [`std::io::Write`].
#[derive(Debug)]
pub struct TreeDump<W> {
    out: W,
    in_field: bool,
    in_object: bool,
}

impl<W: Write> TreeDump<W> {
    /// Creates a dump writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            in_field: false,
            in_object: false,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&mut self, level: usize) -> std::io::Result<()> {
        write!(self.out, "{:width$}", "", width = level * 2)
    }

    fn open_block(&mut self) -> std::io::Result<()> {
        if self.in_object {
            writeln!(self.out, " {{")?;
        }
        Ok(())
    }
}

impl TreeDump<std::io::Stdout> {
    /// A dump to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<M: ObjectModel + ?Sized, W: Write> Visitor<M> for TreeDump<W> {
    fn start_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        shallow_bytes: u64,
    ) -> Result<(), SizeError> {
        self.open_block()?;
        if self.in_field {
            write!(self.out, ": ")?;
        } else {
            self.indent(level)?;
        }
        write!(self.out, "{}", obj.label())?;
        if !obj.is_null() {
            if shallow_bytes == 0 {
                write!(self.out, "(interned)")?;
            } else {
                write!(self.out, "({shallow_bytes} bytes)")?;
            }
        }
        self.in_field = false;
        self.in_object = true;
        Ok(())
    }

    fn end_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        deep_bytes: u64,
    ) -> Result<(), SizeError> {
        if self.in_object || obj.is_null() {
            writeln!(self.out)?;
            self.in_object = false;
        } else {
            self.indent(level)?;
            writeln!(self.out, "}}->({deep_bytes} deep bytes)")?;
        }
        Ok(())
    }

    fn start_field(&mut self, name: &str, _declared: &FieldType, level: usize) -> Result<(), SizeError> {
        self.open_block()?;
        self.indent(level)?;
        write!(self.out, "{name}")?;
        self.in_field = true;
        self.in_object = false;
        Ok(())
    }

    fn end_field(&mut self, _name: &str, declared: &FieldType, _level: usize) -> Result<(), SizeError> {
        if self.in_field {
            writeln!(self.out, ": {declared}")?;
            self.in_field = false;
        }
        Ok(())
    }
}
