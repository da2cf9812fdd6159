//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

#![allow(clippy::indexing_slicing)]

use std::cell::Cell;

use crate::tensor::dim_merger::MergedDim;
use crate::tensor::pattern::MAX_AXES;

//--------------------------------------------------------------------------------------------------

/// Strided walk over one axis of a buffer.
///
/// Indices are not checked against the buffer here; views are bounds checked when the
/// tensor is created.
#[derive(Clone, Copy)]
pub struct StridedVec<'a, T> {
	pub cells: &'a [Cell<T>],
	pub offset: isize,
	pub len: usize,
	pub stride: isize,
}

impl<'a, T: Copy> StridedVec<'a, T> {
	#[inline]
	pub fn cell(&self, i: usize) -> &'a Cell<T> {
		&self.cells[(self.offset + i as isize * self.stride) as usize]
	}

	#[inline]
	pub fn get(&self, i: usize) -> T {
		self.cell(i).get()
	}

	#[inline]
	pub fn set(&self, i: usize, val: T) {
		self.cell(i).set(val);
	}

	pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
		(0..self.len).map(|i| self.get(i))
	}
}

/// Strided matrix. `rows` walk raxis 1, `cols` walk raxis 0.
#[derive(Clone, Copy)]
pub struct StridedMat<'a, T> {
	pub cells: &'a [Cell<T>],
	pub offset: isize,
	pub rows: usize,
	pub cols: usize,
	pub row_stride: isize,
	pub col_stride: isize,
}

impl<'a, T: Copy> StridedMat<'a, T> {
	#[inline]
	pub fn row(&self, i: usize) -> StridedVec<'a, T> {
		StridedVec {
			cells: self.cells,
			offset: self.offset + i as isize * self.row_stride,
			len: self.cols,
			stride: self.col_stride,
		}
	}

	#[inline]
	pub fn col(&self, j: usize) -> StridedVec<'a, T> {
		StridedVec {
			cells: self.cells,
			offset: self.offset + j as isize * self.col_stride,
			len: self.rows,
			stride: self.row_stride,
		}
	}
}

//--------------------------------------------------------------------------------------------------

/// Calls `f` with the storage index of every operand, for every position of the joint
/// iteration space described by `dims` (raxis 0 varies fastest).
///
/// Operands with stride 0 on an axis see the same element along it; for an output
/// operand this means the values along that axis are reduced into one element.
pub fn zip_merged<const N: usize>(
	dims: &[MergedDim<N>],
	base: [isize; N],
	mut f: impl FnMut([usize; N]),
) {
	if dims.iter().any(|dim| dim.size == 0) {
		return;
	}
	debug_assert!(dims.len() <= MAX_AXES);

	let mut index = [0_usize; MAX_AXES];
	let mut offsets = base;
	loop {
		f(offsets.map(|o| o as usize));

		let mut r = 0;
		loop {
			let Some(dim) = dims.get(r) else {
				return;
			};
			index[r] += 1;
			for (offset, stride) in offsets.iter_mut().zip(dim.strides) {
				*offset += stride;
			}
			if index[r] < dim.size {
				break;
			}
			for (offset, stride) in offsets.iter_mut().zip(dim.strides) {
				*offset -= stride * dim.size as isize;
			}
			index[r] = 0;
			r += 1;
		}
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
