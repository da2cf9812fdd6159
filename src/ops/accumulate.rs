//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use smallvec::smallvec;

use super::{Expand, check_operands};
use crate::ErrPack;
use crate::dispatch::{DispatchConfig, DispatchKey, KernelPlan, OpKind, combine2, select};
use crate::tensor::dim_merger::DimMerger;
use crate::tensor::{Tensor, TensorOpError};

//--------------------------------------------------------------------------------------------------

/// `a += b`
///
/// `b` is broadcast to the shape of `a`. Where `a` has a size-1 axis and `b` does not,
/// the values of `b` along that axis are summed into `a`.
pub struct AccumulateOp<'a> {
	a: &'a Tensor,
	b: &'a Tensor,
	config: DispatchConfig,
}

impl<'a> AccumulateOp<'a> {
	pub fn new(a: &'a Tensor, b: &'a Tensor) -> Result<Self, ErrPack<TensorOpError>> {
		check_operands(a, &[b], false)?;
		DimMerger::check_broadcast([a.pattern(), b.pattern()])?;
		Ok(Self { a, b, config: DispatchConfig::global() })
	}

	pub fn with_reference_mode(mut self, reference_mode: bool) -> Self {
		self.config = self.config.with_reference_mode(reference_mode);
		self
	}
}

impl Expand for AccumulateOp<'_> {
	fn expand(self) -> Result<KernelPlan, ErrPack<TensorOpError>> {
		let [a, b] = DimMerger::normalize([self.a.pattern(), self.b.pattern()])?;
		let a = self.a.with_pattern(a)?;
		let b = self.b.with_pattern(b)?;
		if a.elems() == 0 {
			return Ok(KernelPlan::empty());
		}

		let code = combine2(a.pattern().code(), b.pattern().code());
		let key = DispatchKey {
			op: OpKind::Accumulate,
			code,
			dtype: a.dtype(),
			device: a.device_kind(),
		};
		let route = select(key, self.config);
		KernelPlan::from_route(route, code, a, smallvec![b])
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dispatch::KernelId;
	use crate::tensor::HasDType;
	use crate::tensor::device::cpu::CPUDevice;

	#[test]
	fn test_scalar_from_contiguous_matrix_is_one_kernel() {
		let dev = CPUDevice::new();
		let a = Tensor::new_empty_on(&[], f32::dtype, dev.clone()).unwrap();
		let b = Tensor::new_empty_on(&[4, 3], f32::dtype, dev).unwrap();
		let plan = AccumulateOp::new(&a, &b).unwrap().with_reference_mode(false).expand().unwrap();
		assert_eq!(plan.kernels().as_slice(), &[KernelId::ScalarPlusEqStvector]);
		assert_eq!(plan.calls()[0].code(), 0x000101);
	}

	#[test]
	fn test_empty_op_has_no_kernels() {
		let dev = CPUDevice::new();
		let a = Tensor::new_empty_on(&[0], f64::dtype, dev.clone()).unwrap();
		let b = Tensor::new_empty_on(&[0], f64::dtype, dev).unwrap();
		let plan = AccumulateOp::new(&a, &b).unwrap().expand().unwrap();
		assert!(plan.is_empty());
		plan.run().unwrap();
	}

	#[test]
	fn test_incompatible_shapes() {
		let dev = CPUDevice::new();
		let a = Tensor::new_empty_on(&[3], i32::dtype, dev.clone()).unwrap();
		let b = Tensor::new_empty_on(&[4], i32::dtype, dev).unwrap();
		let err = AccumulateOp::new(&a, &b).err().unwrap();
		assert_eq!(err.code, TensorOpError::DimsDontMatch);
	}
}

//--------------------------------------------------------------------------------------------------
