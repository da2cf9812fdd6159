//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use super::{Expand, check_operands};
use crate::ErrPack;
use crate::dispatch::{
	DispatchConfig, DispatchKey, KernelCall, KernelPlan, OpKind, Route, combine3, select,
};
use crate::tensor::dim_merger::DimMerger;
use crate::tensor::{Tensor, TensorOpError};

//--------------------------------------------------------------------------------------------------

/// `c := beta * c + alpha * a * b`
///
/// The product is elementwise with broadcasting. Axes on which `c` has size 1 and `a` or
/// `b` do not are summed over, which makes this a dot product, a matrix-vector product or
/// an outer product depending on the shapes. `beta == 0` overwrites `c`.
pub struct AddProductOp<'a> {
	alpha: f64,
	beta: f64,
	a: &'a Tensor,
	b: &'a Tensor,
	c: &'a Tensor,
	config: DispatchConfig,
}

impl<'a> AddProductOp<'a> {
	pub fn new(
		alpha: f64,
		beta: f64,
		a: &'a Tensor,
		b: &'a Tensor,
		c: &'a Tensor,
	) -> Result<Self, ErrPack<TensorOpError>> {
		check_operands(c, &[a, b], false)?;
		DimMerger::check_broadcast([c.pattern(), a.pattern(), b.pattern()])?;
		Ok(Self {
			alpha,
			beta,
			a,
			b,
			c,
			config: DispatchConfig::global(),
		})
	}

	pub fn with_reference_mode(mut self, reference_mode: bool) -> Self {
		self.config = self.config.with_reference_mode(reference_mode);
		self
	}
}

impl Expand for AddProductOp<'_> {
	fn expand(self) -> Result<KernelPlan, ErrPack<TensorOpError>> {
		let [c, a, b] =
			DimMerger::normalize([self.c.pattern(), self.a.pattern(), self.b.pattern()])?;
		let c = self.c.with_pattern(c)?;
		let mut a = self.a.with_pattern(a)?;
		let mut b = self.b.with_pattern(b)?;

		// The product is symmetric; order the factors so fewer codes need a kernel.
		if a.pattern().code() < b.pattern().code() {
			std::mem::swap(&mut a, &mut b);
		}
		let code = combine3(a.pattern().code(), b.pattern().code(), c.pattern().code());

		if c.elems() == 0 {
			if self.c.elems() == 0 {
				return Ok(KernelPlan::empty());
			}
			// Summing over an empty axis: `c` is only scaled by `beta`.
			log::debug!("add_product {code:#x}: empty product");
			let call = KernelCall::new(
				OpKind::AddProduct.generic_kernel(),
				code,
				self.c.clone(),
				[self.a.clone(), self.b.clone()],
			);
			return Ok(KernelPlan::single(call.with_scalars(self.alpha, self.beta)));
		}

		let key = DispatchKey {
			op: OpKind::AddProduct,
			code,
			dtype: c.dtype(),
			device: c.device_kind(),
		};
		let Route::Kernel(kernel) = select(key, self.config) else {
			return Err(TensorOpError::unhandled_pattern("add_product", code));
		};
		let call = KernelCall::new(kernel, code, c, [a, b]);
		Ok(KernelPlan::single(call.with_scalars(self.alpha, self.beta)))
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
	fn test_factor_order_is_canonical() {
		let dev = CPUDevice::new();
		let m = Tensor::new_empty_on(&[4, 3], f32::dtype, dev.clone()).unwrap();
		let v = Tensor::new_empty_on(&[3], f32::dtype, dev.clone()).unwrap();
		let c = Tensor::new_empty_on(&[4, 1], f32::dtype, dev).unwrap();

		let plan_mv = AddProductOp::new(1.0, 1.0, &m, &v, &c)
			.unwrap()
			.with_reference_mode(false)
			.expand()
			.unwrap();
		let plan_vm = AddProductOp::new(1.0, 1.0, &v, &m, &c)
			.unwrap()
			.with_reference_mode(false)
			.expand()
			.unwrap();
		assert_eq!(plan_mv.kernels().as_slice(), &[KernelId::AddProductMatVecVec]);
		assert_eq!(plan_vm.kernels().as_slice(), &[KernelId::AddProductMatVecVec]);
		assert_eq!(plan_mv.calls()[0].code(), 0x103101202);
		assert!(plan_vm.calls()[0].inputs()[0].shares_storage(&m));
	}

	#[test]
	fn test_empty_dot_scales_output() {
		let dev = CPUDevice::new();
		let a = Tensor::new_empty_on(&[0], f64::dtype, dev.clone()).unwrap();
		let b = Tensor::new_empty_on(&[0], f64::dtype, dev.clone()).unwrap();
		let c = Tensor::from_slice(&[], &[3.0_f64], dev).unwrap();
		let plan = AddProductOp::new(1.0, 0.5, &a, &b, &c).unwrap().expand().unwrap();
		assert_eq!(plan.len(), 1);
		plan.run().unwrap();
		assert_eq!(c.to_vec::<f64>().unwrap(), vec![1.5]);
	}

	#[test]
	fn test_dtype_mismatch() {
		let dev = CPUDevice::new();
		let a = Tensor::new_empty_on(&[3], f32::dtype, dev.clone()).unwrap();
		let b = Tensor::new_empty_on(&[3], f64::dtype, dev.clone()).unwrap();
		let c = Tensor::new_empty_on(&[3], f32::dtype, dev).unwrap();
		let err = AddProductOp::new(1.0, 1.0, &a, &b, &c).err().unwrap();
		assert_eq!(err.code, TensorOpError::DTypeMismatch);
	}
}

//--------------------------------------------------------------------------------------------------
