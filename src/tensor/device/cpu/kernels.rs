//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

#![allow(clippy::indexing_slicing)]

use crate::ErrPack;
use crate::dispatch::{KernelCall, KernelId};
use crate::tensor::device::dtype::DTypeId;
use crate::tensor::dim_merger::{DimMerger, MergedDims};
use crate::tensor::pattern::Pattern;
use crate::tensor::{HasDType, Tensor, TensorOpError};

use super::math::{Element, scale_add};
use super::zip::{StridedMat, StridedVec, zip_merged};

//--------------------------------------------------------------------------------------------------

/// Executes one kernel call on host memory.
///
/// Specialized kernels check that the operands have the shapes they were written for and
/// fail with `UnhandledPattern` otherwise. Generic kernels accept any broadcast-compatible
/// operands.
pub fn run(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	if call.kernel() == KernelId::AssignConvert {
		return assign_convert(call);
	}
	match call.output().dtype().id() {
		DTypeId::I32 => run_typed::<i32>(call),
		DTypeId::F32 => run_typed::<f32>(call),
		DTypeId::F64 => run_typed::<f64>(call),
	}
}

fn run_typed<T: Element>(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	let code = call.code();
	let out = call.output();
	match call.kernel() {
		KernelId::ScalarPlusEqScalar => {
			let [b] = inputs::<1>(call)?;
			let a = scalar_view::<T>(out, code)?;
			let b = scalar_view::<T>(b, code)?;
			a.set(0, a.get(0).add(b.get(0)));
		},
		KernelId::StvectorPlusEqStvector => {
			let [b] = inputs::<1>(call)?;
			let a = vec_view::<T>(out, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(a.len, b.len, code)?;
			for i in 0..a.len {
				a.set(i, a.get(i).add(b.get(i)));
			}
		},
		KernelId::ScalarPlusEqStvector => {
			let [b] = inputs::<1>(call)?;
			let a = scalar_view::<T>(out, code)?;
			let b = vec_view::<T>(b, code)?;
			a.set(0, a.get(0).add(sum(b)));
		},
		KernelId::StvectorPlusEqScalar => {
			let [b] = inputs::<1>(call)?;
			let a = vec_view::<T>(out, code)?;
			let b = scalar_view::<T>(b, code)?.get(0);
			for i in 0..a.len {
				a.set(i, a.get(i).add(b));
			}
		},
		KernelId::StvectorPlusEqMatrix => {
			let [b] = inputs::<1>(call)?;
			let a = vec_view::<T>(out, code)?;
			let b = mat_view::<T>(b, code)?;
			same_len(a.len, b.cols, code)?;
			for i in 0..b.rows {
				let row = b.row(i);
				for j in 0..a.len {
					a.set(j, a.get(j).add(row.get(j)));
				}
			}
		},
		KernelId::ColVectorEqMatrix => {
			let [b] = inputs::<1>(call)?;
			let a = col_view::<T>(out, code)?;
			let b = mat_view::<T>(b, code)?;
			same_len(a.len, b.rows, code)?;
			for i in 0..a.len {
				a.set(i, sum(b.row(i)));
			}
		},

		KernelId::ScalarEqScalar => {
			let [b] = inputs::<1>(call)?;
			let a = scalar_view::<T>(out, code)?;
			a.set(0, scalar_view::<T>(b, code)?.get(0));
		},
		KernelId::StvectorEqStvector => {
			let [b] = inputs::<1>(call)?;
			let a = vec_view::<T>(out, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(a.len, b.len, code)?;
			for i in 0..a.len {
				a.set(i, b.get(i));
			}
		},
		KernelId::StvectorEqScalar => {
			let [b] = inputs::<1>(call)?;
			let a = vec_view::<T>(out, code)?;
			let b = scalar_view::<T>(b, code)?.get(0);
			for i in 0..a.len {
				a.set(i, b);
			}
		},
		KernelId::ScalarEqStvector => {
			let [b] = inputs::<1>(call)?;
			let a = scalar_view::<T>(out, code)?;
			a.set(0, sum(vec_view::<T>(b, code)?));
		},

		KernelId::AddProductScalar3 => {
			let [a, b] = inputs::<2>(call)?;
			let c = scalar_view::<T>(out, code)?;
			let ab = scalar_view::<T>(a, code)?.get(0).to_f64() * scalar_view::<T>(b, code)?.get(0).to_f64();
			update(call, c, 0, ab);
		},
		KernelId::AddProductVecScalarVec => {
			let [a, b] = inputs::<2>(call)?;
			let c = vec_view::<T>(out, code)?;
			let a = vec_view::<T>(a, code)?;
			let b = scalar_view::<T>(b, code)?.get(0).to_f64();
			same_len(c.len, a.len, code)?;
			for i in 0..c.len {
				update(call, c, i, a.get(i).to_f64() * b);
			}
		},
		KernelId::AddProductVec3 => {
			let [a, b] = inputs::<2>(call)?;
			let c = vec_view::<T>(out, code)?;
			let a = vec_view::<T>(a, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(c.len, a.len, code)?;
			same_len(c.len, b.len, code)?;
			for i in 0..c.len {
				update(call, c, i, a.get(i).to_f64() * b.get(i).to_f64());
			}
		},
		KernelId::AddProductDot => {
			let [a, b] = inputs::<2>(call)?;
			let c = scalar_view::<T>(out, code)?;
			let a = vec_view::<T>(a, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(a.len, b.len, code)?;
			update(call, c, 0, dot(a, b));
		},
		KernelId::AddProductMatVecVec => {
			let [a, b] = inputs::<2>(call)?;
			let c = col_view::<T>(out, code)?;
			let a = mat_view::<T>(a, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(c.len, a.rows, code)?;
			same_len(b.len, a.cols, code)?;
			for i in 0..c.len {
				update(call, c, i, dot(a.row(i), b));
			}
		},
		KernelId::AddProductTmatVecVec => {
			let [a, b] = inputs::<2>(call)?;
			let c = col_view::<T>(out, code)?;
			let a = mat_view::<T>(a, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(c.len, a.rows, code)?;
			same_len(b.len, a.cols, code)?;
			// Rows of `a` are strided here, so walk it by columns.
			let mut acc = vec![0.0; a.rows];
			for j in 0..a.cols {
				let col = a.col(j);
				let bj = b.get(j).to_f64();
				for (i, acc) in acc.iter_mut().enumerate() {
					*acc += col.get(i).to_f64() * bj;
				}
			}
			for (i, ab) in acc.into_iter().enumerate() {
				update(call, c, i, ab);
			}
		},
		KernelId::AddProductVec2Mat => {
			let [a, b] = inputs::<2>(call)?;
			let c = mat_view::<T>(out, code)?;
			let a = col_view::<T>(a, code)?;
			let b = vec_view::<T>(b, code)?;
			same_len(c.rows, a.len, code)?;
			same_len(c.cols, b.len, code)?;
			for i in 0..c.rows {
				let row = c.row(i);
				let ai = a.get(i).to_f64();
				for j in 0..c.cols {
					update(call, row, j, ai * b.get(j).to_f64());
				}
			}
		},

		KernelId::AccumulateGeneric => accumulate_generic::<T>(call)?,
		KernelId::AssignGeneric => assign_generic::<T>(call)?,
		KernelId::AddProductGeneric => add_product_generic::<T>(call)?,
		KernelId::AssignConvert => assign_convert(call)?,
	}
	Ok(())
}

//--------------------------------------------------------------------------------------------------

fn inputs<const N: usize>(call: &KernelCall) -> Result<&[Tensor; N], ErrPack<TensorOpError>> {
	call.inputs().try_into().map_err(|_| {
		ErrPack::with_message(
			TensorOpError::UnhandledPattern,
			format!("{:?}: expected {N} inputs, got {}", call.kernel(), call.inputs().len()),
		)
	})
}

fn same_len(a: usize, b: usize, code: u64) -> Result<(), ErrPack<TensorOpError>> {
	if a != b {
		return Err(TensorOpError::unhandled_pattern("operand sizes differ", code));
	}
	Ok(())
}

/// View of raxis `axis`. Every other raxis must have size 1.
fn axis_view<T: HasDType>(
	t: &Tensor,
	axis: usize,
	code: u64,
) -> Result<StridedVec<'_, T>, ErrPack<TensorOpError>> {
	let pattern = t.pattern();
	let other_trivial = pattern.dims().iter().enumerate().all(|(r, d)| r == axis || d.is_trivial());
	if !other_trivial {
		return Err(TensorOpError::unhandled_pattern("expected a vector", code));
	}
	let dim = pattern.raxis(axis);
	Ok(StridedVec {
		cells: t.cells::<T>()?,
		offset: pattern.offset() as isize,
		len: dim.size,
		stride: dim.stride,
	})
}

fn scalar_view<T: HasDType>(t: &Tensor, code: u64) -> Result<StridedVec<'_, T>, ErrPack<TensorOpError>> {
	let v = axis_view(t, 0, code)?;
	if v.len != 1 {
		return Err(TensorOpError::unhandled_pattern("expected a scalar", code));
	}
	Ok(v)
}

fn vec_view<T: HasDType>(t: &Tensor, code: u64) -> Result<StridedVec<'_, T>, ErrPack<TensorOpError>> {
	axis_view(t, 0, code)
}

/// `(X,1)`: a vector along raxis 1.
fn col_view<T: HasDType>(t: &Tensor, code: u64) -> Result<StridedVec<'_, T>, ErrPack<TensorOpError>> {
	axis_view(t, 1, code)
}

fn mat_view<T: HasDType>(t: &Tensor, code: u64) -> Result<StridedMat<'_, T>, ErrPack<TensorOpError>> {
	let pattern = t.pattern();
	if pattern.dims().iter().skip(2).any(|d| !d.is_trivial()) {
		return Err(TensorOpError::unhandled_pattern("expected a matrix", code));
	}
	let rows = pattern.raxis(1);
	let cols = pattern.raxis(0);
	Ok(StridedMat {
		cells: t.cells::<T>()?,
		offset: pattern.offset() as isize,
		rows: rows.size,
		cols: cols.size,
		row_stride: rows.stride,
		col_stride: cols.stride,
	})
}

fn sum<T: Element>(v: StridedVec<T>) -> T {
	v.iter().fold(T::zero(), T::add)
}

fn dot<T: Element>(a: StridedVec<T>, b: StridedVec<T>) -> f64 {
	a.iter().zip(b.iter()).map(|(a, b)| a.to_f64() * b.to_f64()).sum()
}

fn update<T: Element>(call: &KernelCall, c: StridedVec<T>, i: usize, ab: f64) {
	let val = scale_add(c.get(i).to_f64(), call.beta(), call.alpha(), ab);
	c.set(i, T::from_f64(val));
}

//--------------------------------------------------------------------------------------------------

/// Merges the operand patterns for a generic kernel.
///
/// An axis on which every operand has stride 0 addresses a single element, so it is dropped.
fn merged<const N: usize>(patterns: [&Pattern; N]) -> Result<MergedDims<N>, ErrPack<TensorOpError>> {
	let mut dims = DimMerger::merge(patterns)?;
	dims.retain(|dim| dim.size == 0 || dim.strides.iter().any(|&s| s != 0));
	Ok(dims)
}

fn base<const N: usize>(patterns: [&Pattern; N]) -> [isize; N] {
	patterns.map(|p| p.offset() as isize)
}

/// True if the output has stride 0 on an axis where the input moves.
fn is_reduction(dims: &MergedDims<2>) -> bool {
	dims.iter().any(|dim| dim.size > 1 && dim.strides[0] == 0 && dim.strides[1] != 0)
}

fn fill_zero<T: Element>(out: &Tensor) -> Result<(), ErrPack<TensorOpError>> {
	let cells = out.cells::<T>()?;
	let patterns = [out.pattern()];
	zip_merged(&merged(patterns)?, base(patterns), |[i]| cells[i].set(T::zero()));
	Ok(())
}

fn accumulate_generic<T: Element>(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	let [b] = inputs::<1>(call)?;
	let a = call.output();
	let a_cells = a.cells::<T>()?;
	let b_cells = b.cells::<T>()?;
	let patterns = [a.pattern(), b.pattern()];
	zip_merged(&merged(patterns)?, base(patterns), |[i, j]| {
		a_cells[i].set(a_cells[i].get().add(b_cells[j].get()));
	});
	Ok(())
}

/// When the output is broadcast against the input, the input is summed into it.
/// The output is zeroed first, so it must not overlap the input in that case.
fn assign_generic<T: Element>(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	let [b] = inputs::<1>(call)?;
	let a = call.output();
	let a_cells = a.cells::<T>()?;
	let b_cells = b.cells::<T>()?;
	let patterns = [a.pattern(), b.pattern()];
	let dims = merged(patterns)?;
	if is_reduction(&dims) {
		fill_zero::<T>(a)?;
		zip_merged(&dims, base(patterns), |[i, j]| {
			a_cells[i].set(a_cells[i].get().add(b_cells[j].get()));
		});
	} else {
		zip_merged(&dims, base(patterns), |[i, j]| a_cells[i].set(b_cells[j].get()));
	}
	Ok(())
}

/// Assignment between different dtypes. Values go through `f64`; float to int rounds.
fn assign_convert(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	match call.output().dtype().id() {
		DTypeId::I32 => assign_convert_into::<i32>(call),
		DTypeId::F32 => assign_convert_into::<f32>(call),
		DTypeId::F64 => assign_convert_into::<f64>(call),
	}
}

fn assign_convert_into<O: Element>(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	let [b] = inputs::<1>(call)?;
	match b.dtype().id() {
		DTypeId::I32 => convert::<O, i32>(call.output(), b),
		DTypeId::F32 => convert::<O, f32>(call.output(), b),
		DTypeId::F64 => convert::<O, f64>(call.output(), b),
	}
}

fn convert<O: Element, I: Element>(a: &Tensor, b: &Tensor) -> Result<(), ErrPack<TensorOpError>> {
	let a_cells = a.cells::<O>()?;
	let b_cells = b.cells::<I>()?;
	let patterns = [a.pattern(), b.pattern()];
	let dims = merged(patterns)?;
	if is_reduction(&dims) {
		fill_zero::<O>(a)?;
		zip_merged(&dims, base(patterns), |[i, j]| {
			let val = a_cells[i].get().to_f64() + b_cells[j].get().to_f64();
			a_cells[i].set(O::from_f64(val));
		});
	} else {
		zip_merged(&dims, base(patterns), |[i, j]| {
			a_cells[i].set(O::from_f64(b_cells[j].get().to_f64()));
		});
	}
	Ok(())
}

/// `c := beta * c + alpha * sum(a * b)`, computed in `f64`.
///
/// `c` is scaled in a separate pass before the products are added, so it must not
/// overlap `a` or `b` unless `beta == 1`.
#[allow(clippy::float_cmp)]
fn add_product_generic<T: Element>(call: &KernelCall) -> Result<(), ErrPack<TensorOpError>> {
	let [a, b] = inputs::<2>(call)?;
	let c = call.output();
	let c_cells = c.cells::<T>()?;
	let a_cells = a.cells::<T>()?;
	let b_cells = b.cells::<T>()?;
	let (alpha, beta) = (call.alpha(), call.beta());

	if beta != 1.0 {
		let patterns = [c.pattern()];
		zip_merged(&merged(patterns)?, base(patterns), |[i]| {
			let val = if beta == 0.0 { 0.0 } else { beta * c_cells[i].get().to_f64() };
			c_cells[i].set(T::from_f64(val));
		});
	}

	let patterns = [c.pattern(), a.pattern(), b.pattern()];
	zip_merged(&merged(patterns)?, base(patterns), |[i, j, k]| {
		let ab = a_cells[j].get().to_f64() * b_cells[k].get().to_f64();
		c_cells[i].set(T::from_f64(c_cells[i].get().to_f64() + alpha * ab));
	});
	Ok(())
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
