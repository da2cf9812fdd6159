//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::sync::OnceLock;

//--------------------------------------------------------------------------------------------------

pub const REFERENCE_MODE_ENV: &str = "PATTERN_DISPATCH_REFERENCE_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchConfig {
	/// Run every op on CPU through the generic reference kernels.
	///
	/// Ignored for other devices, which have no reference implementation.
	pub reference_mode: bool,
}

impl DispatchConfig {
	/// Process-wide default, read once from the environment.
	pub fn global() -> Self {
		static instance: OnceLock<DispatchConfig> = OnceLock::new();
		*instance.get_or_init(|| {
			let config = Self::from_env_value(std::env::var(REFERENCE_MODE_ENV).ok().as_deref());
			if config.reference_mode {
				log::info!("{REFERENCE_MODE_ENV} is set, CPU ops will use reference kernels");
			}
			config
		})
	}

	pub fn from_env_value(value: Option<&str>) -> Self {
		let reference_mode = value.is_some_and(|v| {
			matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
		});
		Self { reference_mode }
	}

	pub fn with_reference_mode(self, reference_mode: bool) -> Self {
		Self { reference_mode }
	}
}

//--------------------------------------------------------------------------------------------------


//--------------------------------------------------------------------------------------------------
