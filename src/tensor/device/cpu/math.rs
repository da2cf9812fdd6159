//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::tensor::HasDType;

//--------------------------------------------------------------------------------------------------

pub trait FromToF64 {
	fn from_f64(val: f64) -> Self;
	fn to_f64(&self) -> f64;
}

#[allow(clippy::use_self)]
impl FromToF64 for i32 {
	fn from_f64(val: f64) -> Self {
		// saturating, NaN becomes 0
		val.round() as i32
	}

	fn to_f64(&self) -> f64 {
		f64::from(*self)
	}
}

#[allow(clippy::use_self)]
impl FromToF64 for f32 {
	fn from_f64(val: f64) -> Self {
		val as f32
	}

	fn to_f64(&self) -> f64 {
		f64::from(*self)
	}
}

#[allow(clippy::use_self)]
impl FromToF64 for f64 {
	fn from_f64(val: f64) -> Self {
		val
	}

	fn to_f64(&self) -> f64 {
		*self
	}
}

//--------------------------------------------------------------------------------------------------

/// Element arithmetic used by the CPU kernels.
///
/// Integer addition wraps, so sums are exact regardless of evaluation order.
pub trait Element: HasDType + FromToF64 {
	fn zero() -> Self;
	fn add(self, other: Self) -> Self;
}

impl Element for i32 {
	fn zero() -> Self {
		0
	}

	fn add(self, other: Self) -> Self {
		self.wrapping_add(other)
	}
}

impl Element for f32 {
	fn zero() -> Self {
		0.0
	}

	fn add(self, other: Self) -> Self {
		self + other
	}
}

impl Element for f64 {
	fn zero() -> Self {
		0.0
	}

	fn add(self, other: Self) -> Self {
		self + other
	}
}

/// `beta * c + alpha * ab`. `beta == 0` overwrites `c` even if it holds NaN.
pub fn scale_add(c: f64, beta: f64, alpha: f64, ab: f64) -> f64 {
	if beta == 0.0 { alpha * ab } else { beta * c + alpha * ab }
}

//--------------------------------------------------------------------------------------------------
