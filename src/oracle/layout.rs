//! A layout-arithmetic footprint oracle.
//!
//! Sizes are computed from a small set of platform parameters: header sizes,
//! reference width and allocation alignment. Field packing is not modelled;
//! instance bodies are the plain sum of their field widths.

use serde::{Deserialize, Serialize};

use super::FootprintOracle;
use crate::model::{FieldType, Shape, TypeIntrospector};
use crate::SizeError;

/// Platform layout parameters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Header of a non-array object.
    pub object_header: u64,
    /// Header of an array object, including its length word.
    pub array_header: u64,
    /// Width of one reference.
    pub reference: u64,
    /// Every object size is rounded up to a multiple of this.
    pub alignment: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::compressed_oops()
    }
}

impl LayoutConfig {
    /// 64-bit layout with compressed references (the default).
    pub const fn compressed_oops() -> Self {
        Self {
            object_header: 12,
            array_header: 16,
            reference: 4,
            alignment: 8,
        }
    }

    /// 64-bit layout with full-width references.
    pub const fn uncompressed() -> Self {
        Self {
            object_header: 16,
            array_header: 24,
            reference: 8,
            alignment: 8,
        }
    }

    /// Parses and validates a JSON layout. Missing keys take their
    /// `compressed_oops` values.
    ///
    /// # Errors
    /// Returns [`SizeError::InvalidLayout`] on malformed JSON or a rejected value.
    pub fn from_json(json: &str) -> Result<Self, SizeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SizeError::InvalidLayout(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parameters are usable.
    ///
    /// # Errors
    /// Returns [`SizeError::InvalidLayout`] if alignment is not a non-zero power
    /// of two or the reference width is zero.
    pub fn validate(&self) -> Result<(), SizeError> {
        if !self.alignment.is_power_of_two() {
            return Err(SizeError::InvalidLayout(format!(
                "alignment must be a non-zero power of two, got {}",
                self.alignment
            )));
        }
        if self.reference == 0 {
            return Err(SizeError::InvalidLayout("reference width must be non-zero".into()));
        }
        Ok(())
    }

    #[inline]
    fn align(&self, bytes: u64) -> u64 {
        let mask = self.alignment - 1;
        (bytes + mask) & !mask
    }

    #[inline]
    fn field_width(&self, declared: &FieldType) -> u64 {
        match declared {
            FieldType::Primitive(p) => p.size(),
            FieldType::Reference(_) => self.reference,
        }
    }
}

/// Computes shallow sizes from a [`LayoutConfig`] and the host's field tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOracle {
    config: LayoutConfig,
}

impl LayoutOracle {
    /// Creates an oracle for a validated configuration.
    ///
    /// # Errors
    /// Returns [`SizeError::InvalidLayout`] if `config` does not validate.
    pub fn new(config: LayoutConfig) -> Result<Self, SizeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The layout parameters in use.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }
}

impl<M: TypeIntrospector + ?Sized> FootprintOracle<M> for LayoutOracle {
    fn shallow_size(&self, model: &M, obj: M::Handle) -> Result<u64, SizeError> {
        let c = &self.config;
        let raw = match model.shape(obj)? {
            Shape::Instance => {
                let ty = model.type_of(obj)?;
                let body: u64 = model
                    .fields_of(ty)?
                    .iter()
                    .filter(|f| !f.is_static())
                    .map(|f| c.field_width(f.declared_type()))
                    .sum();
                c.object_header + body
            }
            Shape::ReferenceArray(elements) => c.array_header + elements.len() as u64 * c.reference,
            Shape::PrimitiveArray { element, len } => c.array_header + len as u64 * element.size(),
        };
        Ok(c.align(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_rounds_up() {
        let c = LayoutConfig::compressed_oops();
        assert_eq!(c.align(0), 0);
        assert_eq!(c.align(12), 16);
        assert_eq!(c.align(16), 16);
        assert_eq!(c.align(21), 24);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let c = LayoutConfig::from_json(r#"{ "reference": 8 }"#).unwrap();
        assert_eq!(c.reference, 8);
        assert_eq!(c.object_header, 12);
        assert_eq!(c.alignment, 8);
    }

    #[test]
    fn test_from_json_rejects_bad_alignment() {
        let err = LayoutConfig::from_json(r#"{ "alignment": 12 }"#).unwrap_err();
        assert!(matches!(err, SizeError::InvalidLayout(_)));
        assert!(LayoutConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_new_rejects_zero_reference() {
        let config = LayoutConfig {
            reference: 0,
            ..LayoutConfig::default()
        };
        assert!(LayoutOracle::new(config).is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let json = serde_json::to_string(&LayoutConfig::uncompressed()).unwrap();
        assert_eq!(LayoutConfig::from_json(&json).unwrap(), LayoutConfig::uncompressed());
    }
}
