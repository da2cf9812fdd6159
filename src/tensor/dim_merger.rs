//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use arrayvec::ArrayVec;

use super::pattern::{MAX_AXES, Pattern, SizeAndStride, TooManyAxesError};

//--------------------------------------------------------------------------------------------------

/// One axis shared by `N` operands. Broadcasted operands have stride 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergedDim<const N: usize> {
	pub size: usize,
	pub strides: [isize; N],
}

impl<const N: usize> MergedDim<N> {
	pub fn get(&self, i: usize) -> SizeAndStride {
		if self.strides[i] == 0 && self.size != 0 {
			SizeAndStride::TRIVIAL
		} else {
			SizeAndStride { size: self.size, stride: self.strides[i] }
		}
	}
}

pub type MergedDims<const N: usize> = ArrayVec<MergedDim<N>, MAX_AXES>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DimsDontMatchError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DimMergerError {
	DimsDontMatch,
	TooManyAxes,

	/// The joint iteration space has more than `isize::MAX` elements.
	ElementsOverflow,
}

impl From<DimsDontMatchError> for DimMergerError {
	fn from(_: DimsDontMatchError) -> Self {
		Self::DimsDontMatch
	}
}

impl From<TooManyAxesError> for DimMergerError {
	fn from(_: TooManyAxesError) -> Self {
		Self::TooManyAxes
	}
}

pub struct DimMerger<const N: usize>;

impl<const N: usize> DimMerger<N> {
	/// Finds common size and resets stride to 0 for broadcasted inputs
	///
	/// A size > 1 axis with stride 0 is treated the same as a broadcasted one.
	/// If there are no inputs (N == 0), this function always returns size = 1.
	pub fn merge_single_dim(dim: [SizeAndStride; N]) -> Result<MergedDim<N>, DimsDontMatchError> {
		let size = dim.iter().fold(1, |size, inp| if size == 1 { inp.size } else { size });
		let mut strides = [0; N];
		for (stride, inp) in strides.iter_mut().zip(dim.iter()) {
			if inp.size == size {
				*stride = if size == 1 { 0 } else { inp.stride };
			} else if inp.size != 1 {
				return Err(DimsDontMatchError);
			}
		}
		Ok(MergedDim { size, strides })
	}

	/// Checks that the operands are broadcast-compatible without building the merged dims.
	pub fn check_broadcast(inputs: [&Pattern; N]) -> Result<(), DimsDontMatchError> {
		let ndim = inputs.iter().map(|inp| inp.num_axes()).max().unwrap_or(0);
		for r in 0..ndim {
			Self::merge_single_dim(inputs.map(|inp| inp.raxis(r)))?;
		}
		Ok(())
	}

	/// Merges the axes of all inputs into a minimal list of dims in raxis order.
	///
	/// Shorter inputs are padded with trivial axes. Axes that are trivial for all inputs
	/// are dropped. Two neighbouring axes are merged when every input steps through
	/// them as if they were one axis.
	///
	/// If any axis has size 0, the result is a single dim with size 0.
	pub fn merge(inputs: [&Pattern; N]) -> Result<MergedDims<N>, DimMergerError> {
		let ndim = inputs.iter().map(|inp| inp.num_axes()).max().unwrap_or(0);
		let mut single = MergedDims::<N>::new();
		for r in 0..ndim {
			let dim = Self::merge_single_dim(inputs.map(|inp| inp.raxis(r)))?;
			single.try_push(dim).map_err(|_| DimMergerError::TooManyAxes)?;
		}

		let mut dims = MergedDims::<N>::new();
		if single.iter().any(|dim| dim.size == 0) {
			dims.push(MergedDim { size: 0, strides: [0; N] });
			return Ok(dims);
		}
		let elems = single.iter().try_fold(1_usize, |elems, dim| elems.checked_mul(dim.size));
		if elems.is_none_or(|e| e > isize::MAX as usize) {
			return Err(DimMergerError::ElementsOverflow);
		}

		for next_dim in single {
			if next_dim.size == 1 {
				continue;
			}

			// Can we extend previous dimension?
			if let Some(prev_dim) = dims.last_mut() {
				// `prev_dim.size` fits into `isize` because the total does
				let prev_size = prev_dim.size as isize;
				let extends = (0..N).all(|i| {
					prev_size.checked_mul(prev_dim.strides[i]) == Some(next_dim.strides[i])
				});
				if extends {
					prev_dim.size *= next_dim.size;
					continue;
				}
			}

			dims.push(next_dim);
		}

		Ok(dims)
	}

	/// Jointly normalizes the patterns of one op.
	///
	/// All results have the same number of axes, are mutually broadcast-compatible
	/// and keep their offsets. Normalizing an already normalized set is a no-op.
	pub fn normalize(inputs: [&Pattern; N]) -> Result<[Pattern; N], DimMergerError> {
		let dims = Self::merge(inputs)?;
		let mut result = inputs.map(|inp| Pattern::scalar(inp.offset()));
		for (i, pattern) in result.iter_mut().enumerate() {
			let axes: ArrayVec<SizeAndStride, MAX_AXES> = dims.iter().map(|d| d.get(i)).collect();
			*pattern = Pattern::new(&axes, pattern.offset())?;
		}
		Ok(result)
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	fn pattern(shape: &[usize], strides: &[isize]) -> Pattern {
		Pattern::from_shape_and_strides(shape, strides, 0).unwrap()
	}

	#[test]
	fn test_contiguous_matrix_merges_to_vector() {
		let a = Pattern::scalar(0);
		let (b, _) = Pattern::contiguous(&[4, 3]).unwrap();
		let [a, b] = DimMerger::normalize([&a, &b]).unwrap();
		assert_eq!(a.code(), 0x000);
		assert_eq!(b.code(), 0x101);
		assert_eq!(b.raxis(0), SizeAndStride { size: 12, stride: 1 });
		assert_eq!(a.num_axes(), b.num_axes());
	}

	#[test]
	fn test_padded_matrix_stays_matrix() {
		let a = Pattern::scalar(0);
		let b = pattern(&[4, 3], &[5, 1]);
		let [a, b] = DimMerger::normalize([&a, &b]).unwrap();
		assert_eq!(a.code(), 0x000);
		assert_eq!(b.code(), 0x103);
		assert_eq!(a.num_axes(), 2);
	}

	#[test]
	fn test_row_vector_against_matrix() {
		let (a, _) = Pattern::contiguous(&[3]).unwrap();
		let (b, _) = Pattern::contiguous(&[4, 3]).unwrap();
		let [a, b] = DimMerger::normalize([&a, &b]).unwrap();
		assert_eq!(a.to_string(), "(1,X)");
		assert_eq!(b.to_string(), "(x,X)");
		assert_eq!((a.code(), b.code()), (0x101, 0x103));
	}

	#[test]
	fn test_trivial_axes_dropped() {
		let (a, _) = Pattern::contiguous(&[1, 1, 8]).unwrap();
		let (b, _) = Pattern::contiguous(&[8]).unwrap();
		let [a, b] = DimMerger::normalize([&a, &b]).unwrap();
		assert_eq!(a.num_axes(), 1);
		assert_eq!((a.code(), b.code()), (0x101, 0x101));
	}

	#[test]
	fn test_stride_zero_is_broadcast() {
		let a = pattern(&[8], &[0]);
		let (b, _) = Pattern::contiguous(&[8]).unwrap();
		let [a, b] = DimMerger::normalize([&a, &b]).unwrap();
		assert_eq!((a.code(), b.code()), (0x000, 0x101));
	}

	#[test]
	fn test_mismatch() {
		let (a, _) = Pattern::contiguous(&[3]).unwrap();
		let (b, _) = Pattern::contiguous(&[4]).unwrap();
		assert_eq!(DimMerger::normalize([&a, &b]), Err(DimMergerError::DimsDontMatch));
		assert_eq!(DimMerger::check_broadcast([&a, &b]), Err(DimsDontMatchError));
	}

	#[test]
	fn test_normalize_is_idempotent() {
		let cases = [
			[pattern(&[4, 3], &[5, 1]), pattern(&[3], &[2]), pattern(&[4, 1], &[1, 0])],
			[pattern(&[2, 3, 4], &[12, 4, 1]), pattern(&[2, 1, 4], &[4, 0, 1]), Pattern::scalar(3)],
			[pattern(&[6], &[-1]), pattern(&[6], &[3]), pattern(&[6], &[1])],
		];
		for [a, b, c] in &cases {
			let once = DimMerger::normalize([a, b, c]).unwrap();
			let twice = DimMerger::normalize([&once[0], &once[1], &once[2]]).unwrap();
			assert_eq!(once, twice);
		}
	}

	#[test]
	fn test_broadcast_elems_overflow() {
		let a = Pattern::scalar(0);
		let b = pattern(&[1 << 40, 1 << 40], &[0, 0]);
		assert_eq!(DimMerger::merge([&a, &b]), Err(DimMergerError::ElementsOverflow));

		// each operand alone is small, the broadcast of both is not
		let c = pattern(&[1 << 40, 1], &[0, 0]);
		let d = pattern(&[1 << 40], &[0]);
		assert_eq!(DimMerger::normalize([&a, &c, &d]), Err(DimMergerError::ElementsOverflow));

		// a zero sized axis makes the space empty whatever the other sizes are
		let e = pattern(&[1 << 40, 1 << 40, 0], &[0, 0, 1]);
		let dims = DimMerger::merge([&a, &e]).unwrap();
		assert_eq!(dims.as_slice(), &[MergedDim { size: 0, strides: [0, 0] }]);
	}

	#[test]
	fn test_huge_strides_dont_merge() {
		let a = pattern(&[3, 2], &[1, isize::MAX]);
		let dims = DimMerger::merge([&a]).unwrap();
		assert_eq!(dims.len(), 2);
	}

	#[test]
	fn test_zero_size() {
		let (a, _) = Pattern::contiguous(&[0, 3]).unwrap();
		let (b, _) = Pattern::contiguous(&[3]).unwrap();
		let dims = DimMerger::merge([&a, &b]).unwrap();
		assert_eq!(dims.len(), 1);
		assert_eq!(dims[0].size, 0);
	}
}

//--------------------------------------------------------------------------------------------------
