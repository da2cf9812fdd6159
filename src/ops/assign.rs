//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use smallvec::smallvec;

use super::{Expand, check_operands};
use crate::ErrPack;
use crate::dispatch::{
	DispatchConfig, DispatchKey, KernelId, KernelPlan, OpKind, Route, combine2, select,
};
use crate::tensor::dim_merger::DimMerger;
use crate::tensor::{Tensor, TensorOpError};

//--------------------------------------------------------------------------------------------------

/// `a := b`
///
/// Where `a` has a size-1 axis and `b` does not, `a` receives the sum along that axis.
/// If the dtypes differ, the values are converted. Conversion is only done between
/// tensors on the same device.
pub struct AssignOp<'a> {
	a: &'a Tensor,
	b: &'a Tensor,
	config: DispatchConfig,
}

impl<'a> AssignOp<'a> {
	pub fn new(a: &'a Tensor, b: &'a Tensor) -> Result<Self, ErrPack<TensorOpError>> {
		if !a.is_on_same_device(b) && a.dtype() != b.dtype() {
			return Err(ErrPack::with_message(
				TensorOpError::UnsupportedConversion,
				format!(
					"cannot convert {} on {} to {} on {}",
					b.dtype(),
					b.device().name(),
					a.dtype(),
					a.device().name()
				),
			));
		}
		check_operands(a, &[b], true)?;
		DimMerger::check_broadcast([a.pattern(), b.pattern()])?;
		Ok(Self { a, b, config: DispatchConfig::global() })
	}

	pub fn with_reference_mode(mut self, reference_mode: bool) -> Self {
		self.config = self.config.with_reference_mode(reference_mode);
		self
	}

	pub fn is_conversion(&self) -> bool {
		self.a.dtype() != self.b.dtype()
	}
}

impl Expand for AssignOp<'_> {
	fn expand(self) -> Result<KernelPlan, ErrPack<TensorOpError>> {
		let convert = self.is_conversion();
		let [a, b] = DimMerger::normalize([self.a.pattern(), self.b.pattern()])?;
		let a = self.a.with_pattern(a)?;
		let b = self.b.with_pattern(b)?;
		if a.elems() == 0 {
			return Ok(KernelPlan::empty());
		}

		let code = combine2(a.pattern().code(), b.pattern().code());
		let route = if convert {
			log::debug!("assign {code:#x}: {} -> {}, converting", b.dtype(), a.dtype());
			Route::Kernel(KernelId::AssignConvert)
		} else {
			let key = DispatchKey {
				op: OpKind::Assign,
				code,
				dtype: a.dtype(),
				device: a.device_kind(),
			};
			select(key, self.config)
		};
		KernelPlan::from_route(route, code, a, smallvec![b])
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
