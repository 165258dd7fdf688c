// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Path-based conditional assertion macros
//!
//! The trace engine runs inside a node's transaction replay, where a panic takes
//! the whole request down. Contract checks (a frame finalized twice, a placeholder
//! entered twice) are therefore off by default and switched on per module path
//! through the `OCTRACE_ASSERT` environment variable, the same way `RUST_LOG`
//! selects log targets.
//!
//! # Environment Variable Syntax
//!
//! - **Enable all assertions**: `OCTRACE_ASSERT=*` or `OCTRACE_ASSERT=all`
//! - **Enable a crate**: `OCTRACE_ASSERT=octrace_engine`
//! - **Enable a module and its children**: `OCTRACE_ASSERT=octrace_common::types`
//! - **Multiple targets**: `OCTRACE_ASSERT=octrace_engine::tracer,octrace_common::types`
//!
//! When the variable is unset or empty, every assertion is a no-op.
//!
//! ```bash
//! OCTRACE_ASSERT=* cargo test
//! ```
//!
//! ```ignore
//! use octrace_common::{octrace_assert, octrace_assert_eq};
//!
//! fn finish(already_done: bool) {
//!     octrace_assert!(!already_done, "frame finalized twice");
//! }
//! ```

use once_cell::sync::Lazy;
use std::env;

/// Assertion targets parsed from `OCTRACE_ASSERT`
static ASSERTION_TARGETS: Lazy<Vec<String>> = Lazy::new(|| match env::var("OCTRACE_ASSERT") {
    Ok(val) if !val.is_empty() => {
        val.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
    _ => Vec::new(),
});

/// Check if assertions are enabled for the given module path
///
/// Returns `true` when any configured target is `*`/`all`, or is a prefix of
/// `module_path`.
pub fn is_assertion_enabled(module_path: &str) -> bool {
    matches_targets(&ASSERTION_TARGETS, module_path)
}

fn matches_targets(targets: &[String], module_path: &str) -> bool {
    targets.iter().any(|target| {
        target == "*" || target == "all" || module_path.starts_with(target.as_str())
    })
}

/// Marker for the rarely taken assertion branch
#[cold]
#[inline(never)]
pub fn cold_path() {}

/// Assert a condition only when enabled via `OCTRACE_ASSERT`.
#[macro_export]
macro_rules! octrace_assert {
    ($($arg:tt)*) => {
        if $crate::macros::is_assertion_enabled(module_path!()) {
            $crate::macros::cold_path();
            assert!($($arg)*);
        }
    };
}

/// Assert two expressions are equal only when enabled via `OCTRACE_ASSERT`.
#[macro_export]
macro_rules! octrace_assert_eq {
    ($($arg:tt)*) => {
        if $crate::macros::is_assertion_enabled(module_path!()) {
            $crate::macros::cold_path();
            assert_eq!($($arg)*);
        }
    };
}

/// Like [`octrace_assert!`], but compiled out of release builds.
#[macro_export]
macro_rules! octrace_debug_assert {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::octrace_assert!($($arg)*);
        }
    };
}
