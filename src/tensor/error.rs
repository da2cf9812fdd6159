//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;

use super::device::dtype::DTypeMismatchError;
use super::device::{DevBufAllocFailedError, MissingBackendError};
use super::dim_merger::{DimMergerError, DimsDontMatchError};
use super::pattern::{InvalidShapeError, TooManyAxesError};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TensorOpError {
	/// Cross-device copy combined with dtype conversion.
	UnsupportedConversion,

	/// Operands live on different devices.
	DeviceMismatch,

	/// A kernel was handed operands whose patterns it does not handle.
	UnhandledPattern,

	/// Accelerator operand, but the crate was built without accelerator support.
	MissingBackend,

	DimsDontMatch,
	TooManyAxes,
	DTypeMismatch,
	DevBufAllocFailed,
	IndexOutOfBounds,
	InvalidShape,
}

impl TensorOpError {
	#[cold]
	#[inline(never)]
	pub fn unhandled_pattern(what: &str, code: u64) -> ErrPack<Self> {
		ErrPack::with_message(Self::UnhandledPattern, format!("{what}: unhandled code {code:#x}"))
	}
}

impl From<DimMergerError> for TensorOpError {
	#[cold]
	#[inline(never)]
	fn from(err: DimMergerError) -> Self {
		match err {
			DimMergerError::DimsDontMatch => Self::DimsDontMatch,
			DimMergerError::TooManyAxes => Self::TooManyAxes,
			DimMergerError::ElementsOverflow => Self::InvalidShape,
		}
	}
}

impl From<DimMergerError> for ErrPack<TensorOpError> {
	#[cold]
	#[inline(never)]
	fn from(err: DimMergerError) -> Self {
		Self { code: err.into(), extra: None }
	}
}

impl From<DimsDontMatchError> for ErrPack<TensorOpError> {
	fn from(_: DimsDontMatchError) -> Self {
		Self::with_message(TensorOpError::DimsDontMatch, "operands are not broadcast-compatible")
	}
}

impl From<TooManyAxesError> for ErrPack<TensorOpError> {
	fn from(_: TooManyAxesError) -> Self {
		Self::new(TensorOpError::TooManyAxes)
	}
}

impl From<DevBufAllocFailedError> for ErrPack<TensorOpError> {
	fn from(_: DevBufAllocFailedError) -> Self {
		Self::new(TensorOpError::DevBufAllocFailed)
	}
}

impl From<MissingBackendError> for ErrPack<TensorOpError> {
	fn from(_: MissingBackendError) -> Self {
		Self::with_message(
			TensorOpError::MissingBackend,
			"accelerator device used, but the crate was built without the `cuda` feature",
		)
	}
}

impl From<DTypeMismatchError> for ErrPack<TensorOpError> {
	fn from(_: DTypeMismatchError) -> Self {
		Self::new(TensorOpError::DTypeMismatch)
	}
}

impl From<InvalidShapeError> for ErrPack<TensorOpError> {
	fn from(_: InvalidShapeError) -> Self {
		Self::new(TensorOpError::InvalidShape)
	}
}

//--------------------------------------------------------------------------------------------------
