//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use assert_approx_eq::assert_approx_eq;

use super::{MockAccelerator, cpu, ramp, tensor};
use crate::ErrPack;
use crate::dispatch::KernelId;
use crate::ops::{self, AssignOp, Expand};
use crate::tensor::{Device, HasDType, Tensor, TensorOpError};

//--------------------------------------------------------------------------------------------------

#[test]
fn test_copy_strided() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let src = tensor(&[3, 4], &ramp::<f64>(12), &dev);
	// column 1 of the matrix
	let b = src.strided_view(&[3], &[4], 1)?;
	let a = tensor(&[3], &[0.0_f64; 3], &dev);

	let plan = AssignOp::new(&a, &b)?.with_reference_mode(false).expand()?;
	assert_eq!(plan.kernels().as_slice(), &[KernelId::StvectorEqStvector]);
	plan.run()?;

	let m = ramp::<f64>(12);
	assert_eq!(a.to_vec::<f64>()?, vec![m[1], m[5], m[9]]);
	Ok(())
}

#[test]
fn test_fill_from_scalar() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = tensor(&[2, 2], &[0_i32; 4], &dev);
	let b = tensor(&[], &[7_i32], &dev);

	let plan = AssignOp::new(&a, &b)?.with_reference_mode(false).expand()?;
	assert_eq!(plan.kernels().as_slice(), &[KernelId::StvectorEqScalar]);
	plan.run()?;
	assert_eq!(a.to_vec::<i32>()?, vec![7; 4]);
	Ok(())
}

#[test]
fn test_scalar_gets_sum_of_padded_matrix() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = tensor(&[], &[f32::NAN], &dev);
	let storage = tensor(&[3, 4], &ramp::<f32>(12), &dev);
	let b = storage.strided_view(&[3, 2], &[4, 1], 1)?;

	let plan = AssignOp::new(&a, &b)?.with_reference_mode(false).expand()?;
	assert_eq!(plan.kernels().as_slice(), &[KernelId::ColVectorEqMatrix, KernelId::ScalarEqStvector]);
	plan.run()?;

	let m = ramp::<f32>(12);
	let expected: f32 = [1, 2, 5, 6, 9, 10].iter().map(|&i| m[i]).sum();
	assert_approx_eq!(a.to_vec::<f32>()?[0], expected);
	Ok(())
}

#[test]
fn test_convert_same_device() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = tensor(&[4], &[0.0_f64; 4], &dev);
	let b = tensor(&[2, 2], &[1_i32, -2, 3, -4], &dev);
	// shapes broadcast: a is (4,) and b is (2, 2), which don't match
	assert_eq!(AssignOp::new(&a, &b).err().unwrap().code, TensorOpError::DimsDontMatch);

	let b = b.strided_view(&[4], &[1], 0)?;
	ops::assign(&a, &b)?;
	assert_eq!(a.to_vec::<f64>()?, vec![1.0, -2.0, 3.0, -4.0]);
	Ok(())
}

#[test]
fn test_cross_device_and_dtype_fails_fast() {
	let dev = cpu();
	let accel: std::rc::Rc<dyn Device> = MockAccelerator::new();
	let a = tensor(&[4], &[1.0_f32; 4], &accel);
	let b = tensor(&[4], &[2.0_f64; 4], &dev);

	let err = AssignOp::new(&a, &b).err().unwrap();
	assert_eq!(err.code, TensorOpError::UnsupportedConversion);
	assert_eq!(a.to_vec::<f32>().unwrap(), vec![1.0; 4]);

	// same dtype across devices is a plain device mismatch
	let b = tensor(&[4], &[2.0_f32; 4], &dev);
	assert_eq!(AssignOp::new(&a, &b).err().unwrap().code, TensorOpError::DeviceMismatch);
}

#[test]
fn test_assign_alias_same_view() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = tensor(&[3], &[1_i32, 2, 3], &dev);
	let b: Tensor = a.clone();
	ops::assign(&a, &b)?;
	assert_eq!(a.to_vec::<i32>()?, vec![1, 2, 3]);
	Ok(())
}

#[test]
fn test_reference_mode_copy() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = Tensor::new_empty_on(&[2, 3], i32::dtype, dev.clone())?;
	let b = tensor(&[2, 3], &ramp::<i32>(6), &dev);
	AssignOp::new(&a, &b)?.with_reference_mode(true).expand()?.run()?;
	assert_eq!(a.to_vec::<i32>()?, ramp::<i32>(6));
	Ok(())
}

//--------------------------------------------------------------------------------------------------
