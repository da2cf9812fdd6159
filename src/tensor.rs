//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

pub mod device;
pub mod dim_merger;
pub mod error;
pub mod pattern;

pub use device::{DType, Device, DeviceKind, HasDType};
pub use error::TensorOpError;
pub use pattern::{MAX_AXES, Pattern, SizeAndStride};

use crate::ErrPack;
use device::DeviceBuffer;
use device::cpu::zip::zip_merged;
use device::dtype::DTypeMismatchError;
use dim_merger::DimMerger;

//--------------------------------------------------------------------------------------------------

/// A view into device storage: a `Pattern` plus a shared buffer.
///
/// Cloning a tensor, or re-viewing it with another pattern, never copies data.
///
/// Every view is checked when it is created: all storage indices it touches are inside
/// the buffer and its element count fits into `isize`.
#[derive(Clone)]
pub struct Tensor {
	pattern: Pattern,
	elems: usize,
	buffer: Rc<DeviceBuffer>,
}

impl Tensor {
	/// Allocate a new zero-filled contiguous tensor on the provided device.
	pub fn new_empty_on(
		shape: &[usize],
		dtype: DType,
		device: Rc<dyn Device>,
	) -> Result<Self, ErrPack<TensorOpError>> {
		let (pattern, elems) = Pattern::contiguous(shape)?;
		let buffer = device.new_buffer(dtype, elems)?;
		Ok(Self { pattern, elems, buffer })
	}

	/// Allocate a new tensor on the same device as `self`.
	pub fn new_empty(&self, shape: &[usize], dtype: DType) -> Result<Self, ErrPack<TensorOpError>> {
		Self::new_empty_on(shape, dtype, self.device())
	}

	/// Allocate a new contiguous tensor with the same shape, dtype and device as `self`.
	pub fn new_empty_like(&self) -> Result<Self, ErrPack<TensorOpError>> {
		Self::new_empty_on(&self.shape(), self.dtype(), self.device())
	}

	/// Allocate a contiguous tensor and fill it with `data` in row-major order.
	pub fn from_slice<T: HasDType>(
		shape: &[usize],
		data: &[T],
		device: Rc<dyn Device>,
	) -> Result<Self, ErrPack<TensorOpError>> {
		let tensor = Self::new_empty_on(shape, T::dtype, device)?;
		if tensor.elems() != data.len() {
			return Err(ErrPack::with_message(
				TensorOpError::InvalidShape,
				format!("shape {shape:?} needs {} elements, got {}", tensor.elems(), data.len()),
			));
		}
		for (cell, &val) in tensor.buffer.cells::<T>()?.iter().zip(data) {
			cell.set(val);
		}
		Ok(tensor)
	}

	/// Returns a view of the same storage with a different pattern.
	pub fn with_pattern(&self, pattern: Pattern) -> Result<Self, ErrPack<TensorOpError>> {
		let Some(elems) = pattern.elems().filter(|&e| e <= isize::MAX as usize) else {
			return Err(ErrPack::with_message(
				TensorOpError::InvalidShape,
				format!("view {pattern} has too many elements"),
			));
		};
		let in_bounds = match pattern.span() {
			Ok(Some((lo, hi))) => lo >= 0 && (hi as usize) < self.buffer.elems(),
			Ok(None) => true,
			Err(_) => false,
		};
		if !in_bounds {
			return Err(ErrPack::with_message(
				TensorOpError::IndexOutOfBounds,
				format!("view {pattern} at offset {} is outside the buffer", pattern.offset()),
			));
		}
		Ok(Self { pattern, elems, buffer: self.buffer.clone() })
	}

	/// Row-major `shape` and `strides`, `offset` counted in elements.
	pub fn strided_view(
		&self,
		shape: &[usize],
		strides: &[isize],
		offset: usize,
	) -> Result<Self, ErrPack<TensorOpError>> {
		let pattern = Pattern::from_shape_and_strides(shape, strides, offset)?;
		self.with_pattern(pattern)
	}

	/// Swaps the last two axes.
	pub fn transposed(&self) -> Self {
		Self {
			pattern: self.pattern.swap_raxes(0, 1),
			elems: self.elems,
			buffer: self.buffer.clone(),
		}
	}

	/// Removes raxis `r`, which must have size 1.
	pub fn squeeze_raxis(&self, r: usize) -> Result<Self, ErrPack<TensorOpError>> {
		let pattern = self.pattern.squeeze_raxis(r)?;
		Ok(Self { pattern, elems: self.elems, buffer: self.buffer.clone() })
	}

	/// Returns the device on which the tensor is allocated.
	pub fn device(&self) -> Rc<dyn Device> {
		self.buffer.device().clone()
	}

	pub fn device_kind(&self) -> DeviceKind {
		self.buffer.device().kind()
	}

	pub fn is_on_same_device(&self, other: &Self) -> bool {
		self.buffer.is_on_device(other.buffer.device().as_ref())
	}

	pub fn shares_storage(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.buffer, &other.buffer)
	}

	/// Returns the data type of the tensor elements.
	pub fn dtype(&self) -> DType {
		self.buffer.dtype()
	}

	pub fn pattern(&self) -> &Pattern {
		&self.pattern
	}

	/// Sizes in row-major order.
	pub fn shape(&self) -> SmallVec<[usize; MAX_AXES]> {
		self.pattern.shape()
	}

	/// Returns the number of dimensions in the tensor.
	pub fn ndim(&self) -> usize {
		self.pattern.num_axes()
	}

	/// Returns the total number of elements in the tensor.
	pub fn elems(&self) -> usize {
		self.elems
	}

	/// The whole underlying buffer, ignoring the pattern.
	pub fn cells<T: HasDType>(&self) -> Result<&[Cell<T>], DTypeMismatchError> {
		self.buffer.cells::<T>()
	}

	/// Copies the elements of the view out in row-major order.
	pub fn to_vec<T: HasDType>(&self) -> Result<Vec<T>, ErrPack<TensorOpError>> {
		let cells = self.cells::<T>()?;
		let dims = DimMerger::merge([&self.pattern])?;
		let mut result = Vec::with_capacity(self.elems());
		#[allow(clippy::indexing_slicing)]
		zip_merged(&dims, [self.pattern.offset() as isize], |[i]| result.push(cells[i].get()));
		Ok(result)
	}
}

impl fmt::Debug for Tensor {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Tensor")
			.field("dtype", &format_args!("{}", self.dtype()))
			.field("device", &self.buffer.device().name())
			.field("shape", &self.shape().as_slice())
			.field("pattern", &format_args!("{}", self.pattern))
			.finish()
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
