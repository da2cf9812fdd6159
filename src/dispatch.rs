//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use smallvec::SmallVec;

pub mod config;
pub mod table;

pub use config::DispatchConfig;
pub use table::DispatchTable;

use crate::ErrPack;
use crate::tensor::pattern::CODE_BITS;
use crate::tensor::{DType, DeviceKind, Tensor, TensorOpError};

//--------------------------------------------------------------------------------------------------

/// `0xAAABBB` where `AAA` is the code of `a` and `BBB` the code of `b`.
pub const fn combine2(a: u64, b: u64) -> u64 {
	(a << CODE_BITS) | b
}

/// `0xAAABBBCCC`.
pub const fn combine3(a: u64, b: u64, c: u64) -> u64 {
	(a << (2 * CODE_BITS)) | (b << CODE_BITS) | c
}

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// `a += b`
	Accumulate,

	/// `a := b`
	Assign,

	/// `c := beta * c + alpha * a * b`
	AddProduct,
}

impl OpKind {
	/// Kernel that handles any broadcast-compatible patterns.
	pub fn generic_kernel(self) -> KernelId {
		match self {
			Self::Accumulate => KernelId::AccumulateGeneric,
			Self::Assign => KernelId::AssignGeneric,
			Self::AddProduct => KernelId::AddProductGeneric,
		}
	}
}

impl std::fmt::Display for OpKind {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Accumulate => write!(f, "accumulate"),
			Self::Assign => write!(f, "assign"),
			Self::AddProduct => write!(f, "add_product"),
		}
	}
}

/// Naming: `Scalar` is `()`, `Stvector` a possibly strided vector `(X)` or `(x)`,
/// `ColVector` a vector along raxis 1 `(X,1)`, `Matrix` is `(x,X)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelId {
	ScalarPlusEqScalar,
	StvectorPlusEqStvector,
	ScalarPlusEqStvector,
	StvectorPlusEqScalar,
	StvectorPlusEqMatrix,
	ColVectorEqMatrix,

	ScalarEqScalar,
	StvectorEqStvector,
	StvectorEqScalar,
	ScalarEqStvector,

	AddProductScalar3,
	AddProductVecScalarVec,
	AddProductVec3,
	AddProductDot,
	AddProductMatVecVec,
	AddProductTmatVecVec,
	AddProductVec2Mat,

	AccumulateGeneric,
	AssignGeneric,
	AssignConvert,
	AddProductGeneric,
}

impl KernelId {
	pub fn is_generic(self) -> bool {
		matches!(
			self,
			Self::AccumulateGeneric
				| Self::AssignGeneric
				| Self::AssignConvert
				| Self::AddProductGeneric
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchKey {
	pub op: OpKind,
	pub code: u64,
	pub dtype: DType,
	pub device: DeviceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	Kernel(KernelId),

	/// The input matrix is first reduced into a column temporary by `reduce`,
	/// then `combine` folds the temporary into the output.
	ViaColumnTemp { reduce: KernelId, combine: KernelId },
}

/// Chooses how to compute `key`.
///
/// In reference mode, CPU ops always get the generic kernel. Otherwise the table is
/// consulted and codes without an entry fall back to the generic kernel.
pub fn select(key: DispatchKey, config: DispatchConfig) -> Route {
	let generic = Route::Kernel(key.op.generic_kernel());
	if config.reference_mode && key.device == DeviceKind::Cpu {
		log::debug!("{} {:#x}: reference mode -> {generic:?}", key.op, key.code);
		return generic;
	}
	if let Some(route) = DispatchTable::instance().lookup(&key) {
		log::debug!("{} {:#x} {} {} -> {route:?}", key.op, key.code, key.dtype, key.device);
		return route;
	}
	if key.device == DeviceKind::Cpu {
		log::debug!("{} {:#x} {}: no specialization -> {generic:?}", key.op, key.code, key.dtype);
	} else {
		log::warn!(
			"{} {:#x} {} on {}: no specialization, using generic kernel",
			key.op,
			key.code,
			key.dtype,
			key.device
		);
	}
	generic
}

//--------------------------------------------------------------------------------------------------

/// One kernel invocation of a plan.
pub struct KernelCall {
	kernel: KernelId,
	code: u64,
	output: Tensor,
	inputs: SmallVec<[Tensor; 2]>,
	alpha: f64,
	beta: f64,
}

impl KernelCall {
	pub(crate) fn new(
		kernel: KernelId,
		code: u64,
		output: Tensor,
		inputs: impl IntoIterator<Item = Tensor>,
	) -> Self {
		Self {
			kernel,
			code,
			output,
			inputs: inputs.into_iter().collect(),
			alpha: 1.0,
			beta: 1.0,
		}
	}

	pub(crate) fn with_scalars(mut self, alpha: f64, beta: f64) -> Self {
		self.alpha = alpha;
		self.beta = beta;
		self
	}

	pub fn kernel(&self) -> KernelId {
		self.kernel
	}

	/// The combined code the kernel was selected for.
	pub fn code(&self) -> u64 {
		self.code
	}

	pub fn output(&self) -> &Tensor {
		&self.output
	}

	pub fn inputs(&self) -> &[Tensor] {
		&self.inputs
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn beta(&self) -> f64 {
		self.beta
	}
}

impl std::fmt::Debug for KernelCall {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("KernelCall")
			.field("kernel", &self.kernel)
			.field("code", &format_args!("{:#x}", self.code))
			.field("output", &self.output)
			.field("inputs", &self.inputs.as_slice())
			.finish_non_exhaustive()
	}
}

//--------------------------------------------------------------------------------------------------

/// Ordered kernel calls produced by expanding one op.
///
/// Calls run in the order they were emitted. A temporary created by the expansion is
/// written by one call, read by the next one, and freed together with the plan.
#[derive(Debug)]
pub struct KernelPlan {
	calls: SmallVec<[KernelCall; 2]>,
}

impl KernelPlan {
	/// A plan with no calls. Ops with no elements expand to this.
	pub(crate) fn empty() -> Self {
		Self { calls: SmallVec::new() }
	}

	pub(crate) fn single(call: KernelCall) -> Self {
		let mut calls = SmallVec::new();
		calls.push(call);
		Self { calls }
	}

	/// Emits the calls for `route`. `output` and `inputs` must be the normalized operands
	/// the route was selected for.
	pub(crate) fn from_route(
		route: Route,
		code: u64,
		output: Tensor,
		inputs: SmallVec<[Tensor; 2]>,
	) -> Result<Self, ErrPack<TensorOpError>> {
		match route {
			Route::Kernel(kernel) => Ok(Self::single(KernelCall::new(kernel, code, output, inputs))),
			Route::ViaColumnTemp { reduce, combine } => {
				let [matrix] = inputs.as_slice() else {
					return Err(TensorOpError::unhandled_pattern("column reduction", code));
				};
				let num_rows = matrix.pattern().raxis(1).size;

				// A column vector: its nontrivial axis is raxis 1.
				let temp = Tensor::new_empty_on(&[num_rows, 1], output.dtype(), output.device())?;
				let reduce_call = KernelCall::new(reduce, code, temp.clone(), [matrix.clone()]);

				// Squeeze raxis 0 away so the temporary becomes a plain `(X)` vector.
				let temp = temp.squeeze_raxis(0)?;
				let combine_call = KernelCall::new(combine, code, output, [temp]);

				let mut calls = SmallVec::new();
				calls.push(reduce_call);
				calls.push(combine_call);
				Ok(Self { calls })
			},
		}
	}

	pub fn len(&self) -> usize {
		self.calls.len()
	}

	pub fn is_empty(&self) -> bool {
		self.calls.is_empty()
	}

	/// Kernel ids in execution order.
	pub fn kernels(&self) -> SmallVec<[KernelId; 2]> {
		self.calls.iter().map(KernelCall::kernel).collect()
	}

	#[cfg(test)]
	pub(crate) fn calls(&self) -> &[KernelCall] {
		&self.calls
	}

	/// Submits the calls in order to the device of their output.
	pub fn run(self) -> Result<(), ErrPack<TensorOpError>> {
		for call in &self.calls {
			let device = call.output().device();
			log::trace!("running {:?} on {}", call.kernel(), device.name());
			device.run_kernel(call)?;
		}
		Ok(())
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
