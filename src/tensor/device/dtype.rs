//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::cell::Cell;
use std::num::NonZeroU32;

use super::buffer::BufferData;

//--------------------------------------------------------------------------------------------------

pub trait HasDType: Copy + Default + 'static {
	const dtype: DType;

	fn cells(data: &BufferData) -> Option<&[Cell<Self>]>;
}

impl HasDType for i32 {
	const dtype: DType = DType::from_struct(DTypeStruct {
		kind: DTypeKind::Int,
		shift: 5,
		id: DTypeId::I32,
	});

	fn cells(data: &BufferData) -> Option<&[Cell<Self>]> {
		if let BufferData::I32(cells) = data { Some(&cells[..]) } else { None }
	}
}

impl HasDType for f32 {
	const dtype: DType = DType::from_struct(DTypeStruct {
		kind: DTypeKind::Float,
		shift: 5,
		id: DTypeId::F32,
	});

	fn cells(data: &BufferData) -> Option<&[Cell<Self>]> {
		if let BufferData::F32(cells) = data { Some(&cells[..]) } else { None }
	}
}

impl HasDType for f64 {
	const dtype: DType = DType::from_struct(DTypeStruct {
		kind: DTypeKind::Float,
		shift: 6,
		id: DTypeId::F64,
	});

	fn cells(data: &BufferData) -> Option<&[Cell<Self>]> {
		if let BufferData::F64(cells) = data { Some(&cells[..]) } else { None }
	}
}

#[derive(Clone, Copy)]
pub struct DTypeStruct {
	kind: DTypeKind,

	/// Shifting left by this value will convert number of elements to number of bits
	shift: u8,

	id: DTypeId,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[repr(transparent)]
pub struct DType(NonZeroU32);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct DTypeMismatchError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct UnknownDTypeError;

impl std::str::FromStr for DType {
	type Err = UnknownDTypeError;

	fn from_str(s: &str) -> Result<Self, UnknownDTypeError> {
		match s {
			"i32" => Ok(i32::dtype),
			"f32" => Ok(f32::dtype),
			"f64" => Ok(f64::dtype),
			_ => Err(UnknownDTypeError),
		}
	}
}

impl DTypeStruct {
	pub const fn from_dtype(dtype: DType) -> Self {
		let bytes = dtype.0.get().to_le_bytes();
		Self {
			kind: DTypeKind::from_u8(bytes[0]),
			shift: bytes[1],
			id: DTypeId::from_u8(bytes[3]),
		}
	}
}

impl DType {
	/// All dtypes the crate has storage for.
	pub const ALL: [Self; 3] = [i32::dtype, f32::dtype, f64::dtype];

	pub const fn from_struct(data: DTypeStruct) -> Self {
		let val = u32::from_le_bytes([data.kind as u8, data.shift, 0, data.id as u8]);
		match NonZeroU32::new(val) {
			Some(val) => Self(val),
			// DTypeId starts at 1, so val is never 0
			None => unreachable!(),
		}
	}

	pub fn is_float(self) -> bool {
		DTypeStruct::from_dtype(self).kind == DTypeKind::Float
	}

	pub fn id(self) -> DTypeId {
		DTypeStruct::from_dtype(self).id
	}

	pub fn bits(self) -> usize {
		let data = DTypeStruct::from_dtype(self);
		1 << data.shift
	}

	pub fn bytes(self) -> usize {
		self.bits() / 8
	}

	pub fn array_bytes(self, elems: usize) -> Option<usize> {
		elems.checked_mul(self.bytes())
	}
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DTypeKind {
	Float = 1,
	Int,
}

impl DTypeKind {
	const fn from_u8(val: u8) -> Self {
		match val {
			1 => Self::Float,
			_ => Self::Int,
		}
	}
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DTypeId {
	I32 = 1,
	F32 = 2,
	F64 = 3,
}

impl DTypeId {
	const fn from_u8(val: u8) -> Self {
		match val {
			1 => Self::I32,
			2 => Self::F32,
			_ => Self::F64,
		}
	}

	pub fn to_dtype(self) -> DType {
		match self {
			Self::I32 => i32::dtype,
			Self::F32 => f32::dtype,
			Self::F64 => f64::dtype,
		}
	}
}

impl std::fmt::Display for DType {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self.id() {
			DTypeId::I32 => write!(f, "i32"),
			DTypeId::F32 => write!(f, "f32"),
			DTypeId::F64 => write!(f, "f64"),
		}
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_dtype_roundtrip_through_str() {
		for dtype in DType::ALL {
			let parsed: DType = dtype.to_string().parse().unwrap();
			assert_eq!(parsed, dtype);
			assert_eq!(dtype.id().to_dtype(), dtype);
		}
		assert!("bf16".parse::<DType>().is_err());
	}

	#[test]
	fn test_dtype_properties() {
		assert!(f32::dtype.is_float());
		assert!(!i32::dtype.is_float());
		assert_eq!(f64::dtype.bytes(), 8);
		assert_eq!(f32::dtype.array_bytes(3), Some(12));
		assert_eq!(f64::dtype.array_bytes(usize::MAX / 4), None);
		assert_ne!(i32::dtype, f32::dtype);
	}
}

//--------------------------------------------------------------------------------------------------
