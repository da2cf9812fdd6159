//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt;

use arrayvec::ArrayVec;
use smallvec::SmallVec;

//--------------------------------------------------------------------------------------------------

/// Maximum number of axes a `Pattern` can have.
///
/// Limited by the pattern code, which reserves 3 bits for `raxis + 1` of the contiguous axis.
pub const MAX_AXES: usize = 6;

/// Bits 0..=5: bit `r` is set if raxis `r` has `size != 1`.
pub const CODE_NONTRIVIAL_MASK: u64 = 0x03f;

/// Bits 8..=10: `r + 1` where `r` is the lowest raxis with `size > 1` and `stride == 1`.
pub const CODE_CONTIGUOUS_SHIFT: u32 = 8;
pub const CODE_CONTIGUOUS_MASK: u64 = 0x700;

/// Bit 11: some nontrivial axis has a negative stride.
pub const CODE_NEGATIVE_STRIDE: u64 = 0x800;

/// Each operand's code fits into 12 bits.
pub const CODE_BITS: u32 = 12;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TooManyAxesError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ElementsOverflowError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct InvalidShapeError;

/// Some storage index of the view does not fit into `isize`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SpanOverflowError;

//--------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SizeAndStride {
	pub size: usize,
	pub stride: isize,
}

impl SizeAndStride {
	pub const TRIVIAL: Self = Self { size: 1, stride: 0 };

	pub fn is_trivial(&self) -> bool {
		self.size == 1
	}

	pub fn is_contiguous(&self) -> bool {
		self.size <= 1 || self.stride == 1
	}

	pub fn symbol(&self) -> AxisSymbol {
		if self.size == 1 {
			AxisSymbol::Trivial
		} else if self.stride == 1 {
			AxisSymbol::Contiguous
		} else {
			AxisSymbol::Strided
		}
	}
}

impl Default for SizeAndStride {
	fn default() -> Self {
		Self::TRIVIAL
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AxisSymbol {
	/// `1`: size == 1
	Trivial,

	/// `X`: size > 1, stride == 1
	Contiguous,

	/// `x`: size > 1, stride != 1
	Strided,
}

impl fmt::Display for AxisSymbol {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let c = match self {
			Self::Trivial => '1',
			Self::Contiguous => 'X',
			Self::Strided => 'x',
		};
		write!(f, "{c}")
	}
}

//--------------------------------------------------------------------------------------------------

pub struct StrideCounter {
	pub elems: usize,
	pub nonzero_elems: usize,
}

impl Default for StrideCounter {
	fn default() -> Self {
		Self::new()
	}
}

impl StrideCounter {
	pub fn new() -> Self {
		Self { elems: 1, nonzero_elems: 1 }
	}

	/// Returns the next (higher) raxis of a contiguous layout.
	///
	/// Axes of size 1 get stride 0 so they encode as trivial.
	pub fn prepend_dim(&mut self, size: usize) -> Result<SizeAndStride, ElementsOverflowError> {
		// Ignoring zero sized axes, the element count must fit into `isize`, so
		// any permutation of the same axes also fits.
		if size != 0 {
			let Some(e) = self.nonzero_elems.checked_mul(size) else {
				return Err(ElementsOverflowError);
			};
			if e > isize::MAX as usize {
				return Err(ElementsOverflowError);
			}
			self.nonzero_elems = e;
		}

		let stride = if size == 1 { 0 } else { self.elems as isize };
		self.elems *= size;

		Ok(SizeAndStride { size, stride })
	}

	pub fn elems(&self) -> usize {
		self.elems
	}
}

//--------------------------------------------------------------------------------------------------

/// Sizes and strides of a tensor view plus its offset into the storage.
///
/// Axes are stored in raxis order: `dims[0]` is the last (fastest varying)
/// axis in the usual row-major notation, `dims[1]` the one before it, and so on.
/// Axes beyond `num_axes()` are implicitly trivial.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Pattern {
	dims: ArrayVec<SizeAndStride, MAX_AXES>,
	offset: usize,
}

impl Pattern {
	pub fn scalar(offset: usize) -> Self {
		Self { dims: ArrayVec::new(), offset }
	}

	/// `dims` are in raxis order.
	pub fn new(dims: &[SizeAndStride], offset: usize) -> Result<Self, TooManyAxesError> {
		let Ok(dims) = ArrayVec::try_from(dims) else {
			return Err(TooManyAxesError);
		};
		Ok(Self { dims, offset })
	}

	/// Contiguous row-major pattern for `shape`. Returns the pattern and the number of elements.
	pub fn contiguous(shape: &[usize]) -> Result<(Self, usize), InvalidShapeError> {
		if shape.len() > MAX_AXES {
			return Err(InvalidShapeError);
		}
		let mut dims = ArrayVec::new();
		let mut stride_counter = StrideCounter::new();
		for &size in shape.iter().rev() {
			let dim = stride_counter.prepend_dim(size).map_err(|_| InvalidShapeError)?;
			dims.push(dim);
		}
		Ok((Self { dims, offset: 0 }, stride_counter.elems()))
	}

	/// Builds a pattern from a row-major `shape` and matching `strides`.
	///
	/// Each size must fit into `isize`.
	pub fn from_shape_and_strides(
		shape: &[usize],
		strides: &[isize],
		offset: usize,
	) -> Result<Self, InvalidShapeError> {
		if shape.len() != strides.len() || shape.len() > MAX_AXES {
			return Err(InvalidShapeError);
		}
		if shape.iter().any(|&size| size > isize::MAX as usize) {
			return Err(InvalidShapeError);
		}
		let dims = shape
			.iter()
			.zip(strides)
			.rev()
			.map(|(&size, &stride)| SizeAndStride {
				size,
				stride: if size == 1 { 0 } else { stride },
			})
			.collect();
		Ok(Self { dims, offset })
	}

	pub fn num_axes(&self) -> usize {
		self.dims.len()
	}

	/// Axes in raxis order.
	pub fn dims(&self) -> &[SizeAndStride] {
		&self.dims
	}

	/// Returns trivial axis for `r >= num_axes()`.
	pub fn raxis(&self, r: usize) -> SizeAndStride {
		self.dims.get(r).copied().unwrap_or(SizeAndStride::TRIVIAL)
	}

	pub fn offset(&self) -> usize {
		self.offset
	}

	/// Sizes in row-major order.
	pub fn shape(&self) -> SmallVec<[usize; MAX_AXES]> {
		self.dims.iter().rev().map(|d| d.size).collect()
	}

	/// Number of elements, or `None` if it overflows `usize`.
	pub fn elems(&self) -> Option<usize> {
		self.dims.iter().try_fold(1_usize, |elems, d| elems.checked_mul(d.size))
	}

	/// Removes raxis `r`, which must be trivial. Higher axes shift down.
	pub fn squeeze_raxis(&self, r: usize) -> Result<Self, InvalidShapeError> {
		if r >= self.dims.len() {
			return Ok(self.clone());
		}
		if !self.dims[r].is_trivial() {
			return Err(InvalidShapeError);
		}
		let mut result = self.clone();
		result.dims.remove(r);
		Ok(result)
	}

	/// Swaps two raxes. Used to build transposed views.
	pub fn swap_raxes(&self, r0: usize, r1: usize) -> Self {
		let mut result = self.clone();
		let n = r0.max(r1) + 1;
		while result.dims.len() < n.min(MAX_AXES) {
			result.dims.push(SizeAndStride::TRIVIAL);
		}
		if r0 < result.dims.len() && r1 < result.dims.len() {
			result.dims.swap(r0, r1);
		}
		result
	}

	/// Lowest and highest storage index touched by the view.
	///
	/// Returns `Ok(None)` for a view with no elements.
	pub fn span(&self) -> Result<Option<(isize, isize)>, SpanOverflowError> {
		if self.dims.iter().any(|dim| dim.size == 0) {
			return Ok(None);
		}
		let offset = isize::try_from(self.offset).map_err(|_| SpanOverflowError)?;
		let (mut lo, mut hi) = (offset, offset);
		for dim in &self.dims {
			let last = isize::try_from(dim.size - 1).map_err(|_| SpanOverflowError)?;
			let extent = last.checked_mul(dim.stride).ok_or(SpanOverflowError)?;
			let bound = if extent < 0 { &mut lo } else { &mut hi };
			*bound = bound.checked_add(extent).ok_or(SpanOverflowError)?;
		}
		Ok(Some((lo, hi)))
	}

	/// Compact code of the pattern; see `CODE_*` constants.
	pub fn code(&self) -> u64 {
		let mut code = 0;
		let mut contiguous_found = false;
		for (r, dim) in self.dims.iter().enumerate() {
			if dim.is_trivial() {
				continue;
			}
			code |= 1 << r;
			if dim.stride == 1 && !contiguous_found {
				contiguous_found = true;
				code |= ((r as u64) + 1) << CODE_CONTIGUOUS_SHIFT;
			}
			if dim.stride < 0 {
				code |= CODE_NEGATIVE_STRIDE;
			}
		}
		code
	}
}

/// Prints the pattern in `(x,X)` notation. The rightmost symbol is raxis 0.
impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "(")?;
		for (i, dim) in self.dims.iter().rev().enumerate() {
			if i > 0 {
				write!(f, ",")?;
			}
			write!(f, "{}", dim.symbol())?;
		}
		write!(f, ")")
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
