//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::cell::Cell;
use std::rc::Rc;

use super::dtype::{DType, DTypeId, DTypeMismatchError, HasDType};
use super::{DevBufAllocFailedError, Device};

//--------------------------------------------------------------------------------------------------

/// Element storage of a buffer.
///
/// Elements are `Cell`s so that views which alias the same buffer can be read and written
/// through shared references.
pub enum BufferData {
	I32(Box<[Cell<i32>]>),
	F32(Box<[Cell<f32>]>),
	F64(Box<[Cell<f64>]>),
}

fn new_zeroed_cells<T: HasDType>(elems: usize) -> Result<Box<[Cell<T>]>, DevBufAllocFailedError> {
	let mut vec = Vec::new();
	if vec.try_reserve_exact(elems).is_err() {
		return Err(DevBufAllocFailedError);
	}
	vec.resize_with(elems, || Cell::new(T::default()));
	Ok(vec.into_boxed_slice())
}

impl BufferData {
	pub fn new_zeroed(dtype: DType, elems: usize) -> Result<Self, DevBufAllocFailedError> {
		// allocations are limited to `isize::MAX` bytes
		if dtype.array_bytes(elems).is_none_or(|bytes| bytes > isize::MAX as usize) {
			return Err(DevBufAllocFailedError);
		}
		Ok(match dtype.id() {
			DTypeId::I32 => Self::I32(new_zeroed_cells(elems)?),
			DTypeId::F32 => Self::F32(new_zeroed_cells(elems)?),
			DTypeId::F64 => Self::F64(new_zeroed_cells(elems)?),
		})
	}

	pub fn dtype(&self) -> DType {
		match self {
			Self::I32(_) => i32::dtype,
			Self::F32(_) => f32::dtype,
			Self::F64(_) => f64::dtype,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::I32(cells) => cells.len(),
			Self::F32(cells) => cells.len(),
			Self::F64(cells) => cells.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

//--------------------------------------------------------------------------------------------------

pub struct DeviceBuffer {
	data: BufferData,
	device: Rc<dyn Device>,
}

impl DeviceBuffer {
	pub fn new(
		dtype: DType,
		elems: usize,
		device: Rc<dyn Device>,
	) -> Result<Self, DevBufAllocFailedError> {
		let data = BufferData::new_zeroed(dtype, elems)?;
		Ok(Self { data, device })
	}

	#[inline]
	pub fn is_on_device(&self, device: &dyn Device) -> bool {
		std::ptr::addr_eq(self.device.as_ref() as *const dyn Device, device as *const dyn Device)
	}

	#[inline]
	pub fn data(&self) -> &BufferData {
		&self.data
	}

	#[inline]
	pub fn dtype(&self) -> DType {
		self.data.dtype()
	}

	#[inline]
	pub fn elems(&self) -> usize {
		self.data.len()
	}

	#[inline]
	pub fn device(&self) -> &Rc<dyn Device> {
		&self.device
	}

	pub fn cells<T: HasDType>(&self) -> Result<&[Cell<T>], DTypeMismatchError> {
		T::cells(&self.data).ok_or(DTypeMismatchError)
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_zeroed() {
		let data = BufferData::new_zeroed(f32::dtype, 5).unwrap();
		assert_eq!(data.len(), 5);
		assert_eq!(data.dtype(), f32::dtype);

		assert!(BufferData::new_zeroed(f64::dtype, usize::MAX / 4).is_err());
		assert!(BufferData::new_zeroed(i32::dtype, isize::MAX as usize / 2).is_err());
	}
}

//--------------------------------------------------------------------------------------------------
