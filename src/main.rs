//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use pattern_dispatch::dispatch::DispatchConfig;
use pattern_dispatch::ops::{self, AccumulateOp, Expand};
use pattern_dispatch::tensor::device::cpu::CPUDevice;
use pattern_dispatch::tensor::{DType, HasDType, Tensor};

/// `-v` gives warnings, `-vv` info, `-vvv` debug and so on.
fn verbosity() -> usize {
	std::env::args()
		.skip(1)
		.filter(|arg| arg.starts_with('-') && !arg.starts_with("--"))
		.map(|arg| arg.chars().filter(|&c| c == 'v').count())
		.sum()
}

/// The first positional argument selects the dtype of the converted result.
fn target_dtype() -> Result<DType, String> {
	match std::env::args().skip(1).find(|arg| !arg.starts_with('-')) {
		Some(arg) => arg.parse().map_err(|_| format!("unknown dtype `{arg}`")),
		None => Ok(i32::dtype),
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	stderrlog::new().module("pattern_dispatch").verbosity(verbosity()).init()?;

	println!("reference mode: {}", DispatchConfig::global().reference_mode);

	let dev = CPUDevice::new();
	let data: Vec<f32> = (1..=20).map(|i| i as f32).collect();

	// 4x3 matrix embedded in a 4x5 buffer
	let storage = Tensor::from_slice(&[4, 5], &data, dev.clone())?;
	let m = storage.strided_view(&[4, 3], &[5, 1], 0)?;
	println!("m = {m:?}");

	let s = Tensor::new_empty_on(&[], f32::dtype, dev.clone())?;
	let plan = AccumulateOp::new(&s, &m)?.expand()?;
	println!("s += m expands to {:?}", plan.kernels().as_slice());
	plan.run()?;
	println!("s = {:?}", s.to_vec::<f32>()?);

	let v = Tensor::from_slice(&[3], &[1.0_f32, 0.0, -1.0], dev.clone())?;
	let c = Tensor::new_empty_on(&[4, 1], f32::dtype, dev.clone())?;
	ops::add_product(1.0, 0.0, &m, &v, &c)?;
	println!("m @ v = {:?}", c.to_vec::<f32>()?);

	let dtype = target_dtype()?;
	let r = Tensor::new_empty_on(&[4], dtype, dev.clone())?;
	ops::assign(&r, &c.squeeze_raxis(0)?)?;
	let back = Tensor::new_empty_on(&[4], f64::dtype, dev)?;
	ops::assign(&back, &r)?;
	println!("through {dtype} = {:?}", back.to_vec::<f64>()?);

	Ok(())
}
