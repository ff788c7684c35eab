//! Model function identifiers.
//!
//! A model id selects one of the built-in model functions. The id determines
//! the parameter count; the evaluator itself lives in `batchfit-models` so
//! this crate stays dependency-free for binding layers.

use std::fmt;

use crate::error::Error;

/// Largest parameter count across all built-in models.
///
/// Evaluators write per-point partial derivatives into a fixed-size array of
/// this length; only the first [`ModelId::n_parameters`] entries are read.
pub const MAX_PARAMETERS: usize = 7;

/// Identifies a built-in model function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// 1-D Gaussian peak: amplitude, center, width, offset.
    Gauss1D,
    /// Symmetric 2-D Gaussian peak: amplitude, center x/y, width, offset.
    Gauss2D,
    /// Elliptic 2-D Gaussian: amplitude, center x/y, width x/y, offset.
    Gauss2DElliptic,
    /// Elliptic 2-D Gaussian with a rotation angle as the last parameter.
    Gauss2DRotated,
    /// Elliptic 2-D Cauchy (Lorentzian): amplitude, center x/y, width x/y, offset.
    Cauchy2DElliptic,
    /// Straight line: offset, slope.
    Linear1D,
}

impl ModelId {
    /// All built-in models, in wire-id order.
    pub const ALL: [ModelId; 6] = [
        ModelId::Gauss1D,
        ModelId::Gauss2D,
        ModelId::Gauss2DElliptic,
        ModelId::Gauss2DRotated,
        ModelId::Cauchy2DElliptic,
        ModelId::Linear1D,
    ];

    /// Stable numeric id for untyped boundaries.
    pub fn id(self) -> u32 {
        match self {
            ModelId::Gauss1D => 0,
            ModelId::Gauss2D => 1,
            ModelId::Gauss2DElliptic => 2,
            ModelId::Gauss2DRotated => 3,
            ModelId::Cauchy2DElliptic => 4,
            ModelId::Linear1D => 5,
        }
    }

    /// Look up a model by its numeric id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.id() == id)
    }

    /// Number of model parameters, fixed per model.
    pub fn n_parameters(self) -> usize {
        match self {
            ModelId::Gauss1D => 4,
            ModelId::Gauss2D => 5,
            ModelId::Gauss2DElliptic => 6,
            ModelId::Gauss2DRotated => 7,
            ModelId::Cauchy2DElliptic => 6,
            ModelId::Linear1D => 2,
        }
    }

    /// Short name for display.
    pub fn name(self) -> &'static str {
        match self {
            ModelId::Gauss1D => "GAUSS_1D",
            ModelId::Gauss2D => "GAUSS_2D",
            ModelId::Gauss2DElliptic => "GAUSS_2D_ELLIPTIC",
            ModelId::Gauss2DRotated => "GAUSS_2D_ROTATED",
            ModelId::Cauchy2DElliptic => "CAUCHY_2D_ELLIPTIC",
            ModelId::Linear1D => "LINEAR_1D",
        }
    }
}

impl TryFrom<u32> for ModelId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self, Error> {
        Self::from_id(id).ok_or(Error::InvalidModelId(id))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
