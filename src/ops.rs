//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;
use crate::dispatch::{KernelPlan, OpKind};
use crate::tensor::device::check_backend;
use crate::tensor::{Tensor, TensorOpError};

pub mod accumulate;
pub mod add_product;
pub mod assign;

pub use accumulate::AccumulateOp;
pub use add_product::AddProductOp;
pub use assign::AssignOp;

//--------------------------------------------------------------------------------------------------

/// Turns a constructed op into the kernel calls that compute it.
///
/// `expand()` consumes the op, so an op can be expanded only once.
pub trait Expand {
	fn expand(self) -> Result<KernelPlan, ErrPack<TensorOpError>>;
}

pub enum Op<'a> {
	Accumulate(AccumulateOp<'a>),
	Assign(AssignOp<'a>),
	AddProduct(AddProductOp<'a>),
}

impl Op<'_> {
	pub fn kind(&self) -> OpKind {
		match self {
			Self::Accumulate(_) => OpKind::Accumulate,
			Self::Assign(_) => OpKind::Assign,
			Self::AddProduct(_) => OpKind::AddProduct,
		}
	}
}

impl Expand for Op<'_> {
	fn expand(self) -> Result<KernelPlan, ErrPack<TensorOpError>> {
		match self {
			Self::Accumulate(op) => op.expand(),
			Self::Assign(op) => op.expand(),
			Self::AddProduct(op) => op.expand(),
		}
	}
}

impl<'a> From<AccumulateOp<'a>> for Op<'a> {
	fn from(op: AccumulateOp<'a>) -> Self {
		Self::Accumulate(op)
	}
}

impl<'a> From<AssignOp<'a>> for Op<'a> {
	fn from(op: AssignOp<'a>) -> Self {
		Self::Assign(op)
	}
}

impl<'a> From<AddProductOp<'a>> for Op<'a> {
	fn from(op: AddProductOp<'a>) -> Self {
		Self::AddProduct(op)
	}
}

//--------------------------------------------------------------------------------------------------

/// Checks shared by all ops: one device for all operands, a compiled backend for it,
/// and (unless `allow_convert`) one dtype.
fn check_operands(
	output: &Tensor,
	inputs: &[&Tensor],
	allow_convert: bool,
) -> Result<(), ErrPack<TensorOpError>> {
	if inputs.iter().any(|inp| !inp.is_on_same_device(output)) {
		return Err(ErrPack::with_message(
			TensorOpError::DeviceMismatch,
			"all operands must be on the same device",
		));
	}
	check_backend(output.device_kind())?;
	if !allow_convert {
		let dtype = output.dtype();
		if let Some(inp) = inputs.iter().find(|inp| inp.dtype() != dtype) {
			return Err(ErrPack::with_message(
				TensorOpError::DTypeMismatch,
				format!("expected {dtype}, got {}", inp.dtype()),
			));
		}
	}
	Ok(())
}

//--------------------------------------------------------------------------------------------------

/// `a += b`
pub fn accumulate(a: &Tensor, b: &Tensor) -> Result<(), ErrPack<TensorOpError>> {
	AccumulateOp::new(a, b)?.expand()?.run()
}

/// `a := b`
pub fn assign(a: &Tensor, b: &Tensor) -> Result<(), ErrPack<TensorOpError>> {
	AssignOp::new(a, b)?.expand()?.run()
}

/// `c := beta * c + alpha * a * b`
pub fn add_product(
	alpha: f64,
	beta: f64,
	a: &Tensor,
	b: &Tensor,
	c: &Tensor,
) -> Result<(), ErrPack<TensorOpError>> {
	AddProductOp::new(alpha, beta, a, b, c)?.expand()?.run()
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
