//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::rc::Rc;

pub mod buffer;
pub mod cpu;
pub mod dtype;

pub use buffer::DeviceBuffer;
pub use dtype::{DType, HasDType};

use crate::ErrPack;
use crate::dispatch::KernelCall;
use crate::tensor::TensorOpError;

//--------------------------------------------------------------------------------------------------

/// `true` when the crate was built with accelerator support (the `cuda` feature).
pub const ACCELERATOR_BUILT: bool = cfg!(feature = "cuda");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKind {
	Cpu,
	Cuda,
}

impl std::fmt::Display for DeviceKind {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Cpu => write!(f, "cpu"),
			Self::Cuda => write!(f, "cuda"),
		}
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct DevBufAllocFailedError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct MissingBackendError;

/// Fails for accelerator devices when accelerator support was not compiled in.
pub fn check_backend(kind: DeviceKind) -> Result<(), MissingBackendError> {
	if kind != DeviceKind::Cpu && !ACCELERATOR_BUILT {
		return Err(MissingBackendError);
	}
	Ok(())
}

//--------------------------------------------------------------------------------------------------

pub trait Device {
	fn name(&self) -> &str;

	fn kind(&self) -> DeviceKind;

	fn is_cpu(&self) -> bool {
		self.kind() == DeviceKind::Cpu
	}

	fn new_buffer(
		self: Rc<Self>,
		dtype: DType,
		elems: usize,
	) -> Result<Rc<DeviceBuffer>, DevBufAllocFailedError>;

	/// Runs one kernel of a plan.
	///
	/// Kernels of one plan are submitted in order. A device that executes asynchronously
	/// must order them on a single stream.
	fn run_kernel(&self, call: &KernelCall) -> Result<(), ErrPack<TensorOpError>>;
}

//--------------------------------------------------------------------------------------------------
