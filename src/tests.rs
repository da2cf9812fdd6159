//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::rc::Rc;

use crate::ErrPack;
use crate::dispatch::KernelCall;
use crate::tensor::device::cpu::{CPUDevice, kernels};
use crate::tensor::device::{DevBufAllocFailedError, DeviceBuffer, DeviceKind};
use crate::tensor::{DType, Device, HasDType, Tensor, TensorOpError};

mod test_add_product;
mod test_assign;

//--------------------------------------------------------------------------------------------------

/// Stands in for an accelerator. Buffers live in host memory and kernels run on the CPU.
pub struct MockAccelerator {
	name: String,
}

impl MockAccelerator {
	pub fn new() -> Rc<Self> {
		Rc::new(Self { name: "mock-cuda".to_string() })
	}
}

impl Device for MockAccelerator {
	fn name(&self) -> &str {
		&self.name
	}

	fn kind(&self) -> DeviceKind {
		DeviceKind::Cuda
	}

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

pub fn cpu() -> Rc<dyn Device> {
	CPUDevice::new()
}

/// Deterministic test data: small integers, exactly representable in every dtype.
pub fn ramp<T: HasDType + From<i16>>(n: usize) -> Vec<T> {
	(0..n).map(|i| T::from((i as i16 % 7) - 3)).collect()
}

pub fn tensor<T: HasDType>(shape: &[usize], data: &[T], dev: &Rc<dyn Device>) -> Tensor {
	Tensor::from_slice(shape, data, dev.clone()).unwrap()
}

//--------------------------------------------------------------------------------------------------
