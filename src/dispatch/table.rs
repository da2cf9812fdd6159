//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::sync::OnceLock;

use arrayvec::ArrayVec;
use hashbrown::HashMap;

use super::{DispatchKey, KernelId, OpKind, Route, combine2, combine3};
use crate::tensor::{DType, DeviceKind};

//--------------------------------------------------------------------------------------------------

/// Contiguous and strided vector codes.
const VECTORS: [u64; 2] = [0x101, 0x001];

/// Dtypes that have specialized add_product kernels and accelerator kernels.
fn floats() -> ArrayVec<DType, 3> {
	DType::ALL.into_iter().filter(|dtype| dtype.is_float()).collect()
}

/// Maps (op, code, dtype, device) to the specialized route for it.
///
/// Keys that are not registered run the generic kernel of the op.
pub struct DispatchTable {
	map: HashMap<DispatchKey, Route>,
}

impl Default for DispatchTable {
	fn default() -> Self {
		Self::new()
	}
}

impl DispatchTable {
	pub fn new() -> Self {
		Self { map: HashMap::new() }
	}

	/// The built-in table used by `select()`.
	pub fn instance() -> &'static Self {
		static instance: OnceLock<DispatchTable> = OnceLock::new();
		instance.get_or_init(Self::builtin)
	}

	pub fn register(
		&mut self,
		op: OpKind,
		code: u64,
		dtypes: &[DType],
		device: DeviceKind,
		route: Route,
	) {
		for &dtype in dtypes {
			let key = DispatchKey { op, code, dtype, device };
			if let Some(old) = self.map.insert(key, route) {
				log::warn!("{op} {code:#x} {dtype} {device}: {old:?} replaced by {route:?}");
			}
		}
	}

	pub fn lookup(&self, key: &DispatchKey) -> Option<Route> {
		self.map.get(key).copied()
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}

	fn builtin() -> Self {
		let mut table = Self::new();
		table.register_cpu();
		table.register_cuda();
		log::debug!("dispatch table: {} entries", table.len());
		table
	}

	fn register_cpu(&mut self) {
		use KernelId::*;
		let cpu = DeviceKind::Cpu;
		let one = Route::Kernel;
		let floats = floats();

		// a += b
		let acc = OpKind::Accumulate;
		self.register(acc, combine2(0x000, 0x000), &DType::ALL, cpu, one(ScalarPlusEqScalar));
		for a in VECTORS {
			for b in VECTORS {
				self.register(acc, combine2(a, b), &DType::ALL, cpu, one(StvectorPlusEqStvector));
			}
			self.register(acc, combine2(0x000, a), &DType::ALL, cpu, one(ScalarPlusEqStvector));
			self.register(acc, combine2(a, 0x000), &DType::ALL, cpu, one(StvectorPlusEqScalar));
			self.register(acc, combine2(a, 0x103), &DType::ALL, cpu, one(StvectorPlusEqMatrix));
		}
		let via_temp = Route::ViaColumnTemp {
			reduce: ColVectorEqMatrix,
			combine: ScalarPlusEqStvector,
		};
		self.register(acc, combine2(0x000, 0x103), &DType::ALL, cpu, via_temp);

		// a := b
		let assign = OpKind::Assign;
		self.register(assign, combine2(0x000, 0x000), &DType::ALL, cpu, one(ScalarEqScalar));
		for a in VECTORS {
			for b in VECTORS {
				self.register(assign, combine2(a, b), &DType::ALL, cpu, one(StvectorEqStvector));
			}
			self.register(assign, combine2(0x000, a), &DType::ALL, cpu, one(ScalarEqStvector));
			self.register(assign, combine2(a, 0x000), &DType::ALL, cpu, one(StvectorEqScalar));
		}
		let via_temp = Route::ViaColumnTemp {
			reduce: ColVectorEqMatrix,
			combine: ScalarEqStvector,
		};
		self.register(assign, combine2(0x000, 0x103), &DType::ALL, cpu, via_temp);

		// c := beta * c + alpha * a * b
		// The factors are ordered so that `code(a) >= code(b)`; only those keys are registered.
		let prod = OpKind::AddProduct;
		self.register(prod, combine3(0x000, 0x000, 0x000), &floats, cpu, one(AddProductScalar3));
		for a in VECTORS {
			for c in VECTORS {
				let code = combine3(a, 0x000, c);
				self.register(prod, code, &floats, cpu, one(AddProductVecScalarVec));
			}
			for b in VECTORS.into_iter().filter(|&b| b <= a) {
				self.register(prod, combine3(a, b, 0x000), &floats, cpu, one(AddProductDot));
				for c in VECTORS {
					self.register(prod, combine3(a, b, c), &floats, cpu, one(AddProductVec3));
				}
			}
		}
		self.register(prod, combine3(0x103, 0x101, 0x202), &floats, cpu, one(AddProductMatVecVec));
		self.register(prod, combine3(0x203, 0x101, 0x202), &floats, cpu, one(AddProductTmatVecVec));
		self.register(prod, combine3(0x202, 0x101, 0x103), &floats, cpu, one(AddProductVec2Mat));
	}

	/// Accelerator kernels cover the vector cases of accumulate. Everything else,
	/// including scalar += scalar, runs the generic kernel.
	fn register_cuda(&mut self) {
		use KernelId::*;
		let cuda = DeviceKind::Cuda;
		let one = Route::Kernel;
		let floats = floats();

		let acc = OpKind::Accumulate;
		for a in VECTORS {
			for b in VECTORS {
				self.register(acc, combine2(a, b), &floats, cuda, one(StvectorPlusEqStvector));
			}
			self.register(acc, combine2(0x000, a), &floats, cuda, one(ScalarPlusEqStvector));
			self.register(acc, combine2(a, 0x000), &floats, cuda, one(StvectorPlusEqScalar));
		}
		let via_temp = Route::ViaColumnTemp {
			reduce: ColVectorEqMatrix,
			combine: ScalarPlusEqStvector,
		};
		self.register(acc, combine2(0x000, 0x103), &floats, cuda, via_temp);
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
