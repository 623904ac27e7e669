//! Batch measurement of independent roots on the rayon pool.
//!
//! Each root gets its own [`DeepSizer`] and therefore its own visited set;
//! nothing is shared between measurements except the read-only model and
//! oracle. An object reachable from two roots is charged to both.

use rayon::prelude::*;

use super::DeepSizer;
use crate::model::TypeIntrospector;
use crate::oracle::FootprintOracle;
use crate::SizeError;

/// Deep size of each root, in root order.
///
/// # Errors
/// Returns the first error any measurement produced.
pub fn deep_sizes<M, O>(
    model: &M,
    oracle: &O,
    roots: &[M::Handle],
    interned: &[M::Handle],
) -> Result<Vec<u64>, SizeError>
where
    M: TypeIntrospector + Sync,
    M::Handle: Send + Sync,
    O: FootprintOracle<M> + Sync,
{
    roots
        .par_iter()
        .map(|&root| {
            DeepSizer::new(model)
                .with_oracle(oracle)
                .with_interned(interned.iter().copied())
                .deep_size_of(root)
        })
        .collect()
}
