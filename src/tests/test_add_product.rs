//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use assert_approx_eq::assert_approx_eq;
use ndarray::{Array1, Array2};

use super::{cpu, ramp, tensor};
use crate::ErrPack;
use crate::dispatch::KernelId;
use crate::ops::{self, AddProductOp, Expand};
use crate::tensor::{HasDType, Tensor, TensorOpError};

//--------------------------------------------------------------------------------------------------

fn run_checked(
	alpha: f64,
	beta: f64,
	a: &Tensor,
	b: &Tensor,
	c: &Tensor,
	expected_kernel: KernelId,
) -> Result<(), ErrPack<TensorOpError>> {
	let plan = AddProductOp::new(alpha, beta, a, b, c)?.with_reference_mode(false).expand()?;
	assert_eq!(plan.kernels().as_slice(), &[expected_kernel]);
	plan.run()
}

fn assert_all_close(actual: &[f64], expected: &[f64]) {
	assert_eq!(actual.len(), expected.len());
	for (&x, &y) in actual.iter().zip(expected) {
		assert_approx_eq!(x, y, 1e-9);
	}
}

#[test]
fn test_matrix_vector() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let m_data: Vec<f64> = ramp(12);
	let v_data = vec![0.5, -1.0, 2.0];
	let c_init = vec![1.0, 2.0, 3.0, 4.0];

	let m = tensor(&[4, 3], &m_data, &dev);
	let v = tensor(&[3], &v_data, &dev);
	let c = tensor(&[4, 1], &c_init, &dev);
	run_checked(2.0, 0.5, &m, &v, &c, KernelId::AddProductMatVecVec)?;

	let mv = Array2::from_shape_vec((4, 3), m_data).unwrap().dot(&Array1::from(v_data));
	let expected = &Array1::from(c_init) * 0.5 + &mv * 2.0;
	assert_all_close(&c.to_vec::<f64>()?, expected.as_slice().unwrap());
	Ok(())
}

#[test]
fn test_transposed_matrix_vector() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let m_data: Vec<f64> = ramp(12);
	let v_data = vec![1.0, 2.0, -3.0];

	// stored as 3x4, used as its 4x3 transpose
	let m = tensor(&[3, 4], &m_data, &dev);
	let mt = m.transposed();
	let v = tensor(&[3], &v_data, &dev);
	let c = tensor(&[4, 1], &[f64::NAN; 4], &dev);
	run_checked(1.0, 0.0, &v, &mt, &c, KernelId::AddProductTmatVecVec)?;

	let expected = Array2::from_shape_vec((3, 4), m_data).unwrap().t().dot(&Array1::from(v_data));
	assert_all_close(&c.to_vec::<f64>()?, expected.as_slice().unwrap());
	Ok(())
}

#[test]
fn test_outer_product() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let x = vec![1.0_f32, 2.0, 3.0, 4.0];
	let y = vec![-1.0_f32, 0.5, 2.0];

	let a = tensor(&[4, 1], &x, &dev);
	let b = tensor(&[3], &y, &dev);
	let c = tensor(&[4, 3], &[1.0_f32; 12], &dev);
	run_checked(1.0, 1.0, &b, &a, &c, KernelId::AddProductVec2Mat)?;

	let col = Array2::from_shape_vec((4, 1), x).unwrap();
	let row = Array2::from_shape_vec((1, 3), y).unwrap();
	let expected = col.dot(&row) + 1.0;
	for (&actual, &expected) in c.to_vec::<f32>()?.iter().zip(expected.iter()) {
		assert_approx_eq!(actual, expected);
	}
	Ok(())
}

#[test]
fn test_dot() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let x: Vec<f32> = ramp(7);
	let y: Vec<f32> = (0..7).map(|i| i as f32 * 0.25).collect();

	let a = tensor(&[7], &x, &dev);
	let b = tensor(&[7], &y, &dev);
	let c = tensor(&[], &[10.0_f32], &dev);
	run_checked(-1.0, 1.0, &a, &b, &c, KernelId::AddProductDot)?;

	let dot = Array1::from(x).dot(&Array1::from(y));
	assert_approx_eq!(c.to_vec::<f32>()?[0], 10.0 - dot);
	Ok(())
}

#[test]
fn test_elementwise_and_scaled() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = tensor(&[5], &[1.0_f64, 2.0, 3.0, 4.0, 5.0], &dev);
	let b = tensor(&[5], &[2.0_f64; 5], &dev);
	let c = tensor(&[5], &[1.0_f64; 5], &dev);
	run_checked(1.0, 1.0, &a, &b, &c, KernelId::AddProductVec3)?;
	assert_all_close(&c.to_vec::<f64>()?, &[3.0, 5.0, 7.0, 9.0, 11.0]);

	let s = tensor(&[], &[-1.0_f64], &dev);
	run_checked(1.0, 0.0, &s, &a, &c, KernelId::AddProductVecScalarVec)?;
	assert_all_close(&c.to_vec::<f64>()?, &[-1.0, -2.0, -3.0, -4.0, -5.0]);
	Ok(())
}

#[test]
fn test_factor_order_does_not_change_result() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let m = tensor(&[3, 4], &ramp::<f32>(12), &dev);
	let v = tensor(&[4], &[0.5_f32, 1.0, 1.5, 2.0], &dev);
	let c1 = tensor(&[3, 1], &[0.0_f32; 3], &dev);
	let c2 = tensor(&[3, 1], &[0.0_f32; 3], &dev);

	ops::add_product(1.0, 1.0, &m, &v, &c1)?;
	ops::add_product(1.0, 1.0, &v, &m, &c2)?;
	assert_eq!(c1.to_vec::<f32>()?, c2.to_vec::<f32>()?);
	Ok(())
}

#[test]
fn test_generic_batched() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	// c[i, 0, k] = sum_j a[i, j, k] * b[j, 0]
	let a_data: Vec<f64> = ramp(24);
	let b_data = vec![1.0, -1.0, 0.5, 2.0];
	let a = tensor(&[2, 4, 3], &a_data, &dev);
	let b = tensor(&[4, 1], &b_data, &dev);
	let c = tensor(&[2, 1, 3], &[0.0_f64; 6], &dev);

	let plan = AddProductOp::new(1.0, 0.0, &a, &b, &c)?.with_reference_mode(false).expand()?;
	assert_eq!(plan.kernels().as_slice(), &[KernelId::AddProductGeneric]);
	plan.run()?;

	let mut expected = vec![0.0; 6];
	for i in 0..2 {
		for k in 0..3 {
			expected[i * 3 + k] = (0..4).map(|j| a_data[i * 12 + j * 3 + k] * b_data[j]).sum();
		}
	}
	assert_all_close(&c.to_vec::<f64>()?, &expected);
	Ok(())
}

#[test]
fn test_integer_uses_generic_kernel() -> Result<(), ErrPack<TensorOpError>> {
	let dev = cpu();
	let a = tensor(&[3], &[1_i32, 2, 3], &dev);
	let b = tensor(&[3], &[4_i32, 5, 6], &dev);
	let c = Tensor::new_empty_on(&[], i32::dtype, dev.clone())?;
	let plan = AddProductOp::new(1.0, 0.0, &a, &b, &c)?.expand()?;
	assert_eq!(plan.kernels().as_slice(), &[KernelId::AddProductGeneric]);
	plan.run()?;
	assert_eq!(c.to_vec::<i32>()?, vec![32]);
	Ok(())
}

//--------------------------------------------------------------------------------------------------
