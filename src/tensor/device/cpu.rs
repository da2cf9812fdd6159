//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::rc::Rc;

use crate::ErrPack;
use crate::dispatch::KernelCall;
use crate::tensor::TensorOpError;
use crate::tensor::device::{DevBufAllocFailedError, DeviceBuffer, DeviceKind};
use crate::tensor::{DType, Device};

pub mod kernels;
pub mod math;
pub mod zip;

//--------------------------------------------------------------------------------------------------

pub struct CPUDevice {
	name: String,
}

impl CPUDevice {
	pub fn new() -> Rc<Self> {
		Self::new_named("CPU".to_string())
	}

	pub fn new_named(name: String) -> Rc<Self> {
		Rc::new(Self { name })
	}
}

impl Device for CPUDevice {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> DeviceKind {
		DeviceKind::Cpu
	}

	#[inline(never)]
	fn new_buffer(
		self: Rc<Self>,
		dtype: DType,
		elems: usize,
	) -> Result<Rc<DeviceBuffer>, DevBufAllocFailedError> {
		Ok(Rc::new(DeviceBuffer::new(dtype, elems, self)?))
	}

	fn run_kernel(&self, call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
		kernels::run(call)
	}
}

//--------------------------------------------------------------------------------------------------
