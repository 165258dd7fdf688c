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

//! Data model of an openchain-style transaction trace
//!
//! The tree itself ([`CallFrame`], [`TraceNode`] and the leaf records) lives in
//! [`trace`], node coordinates in [`path`], the preimage and address side tables
//! in [`ledger`], and the assembled output in [`result`].

/// Side tables: hash preimages and the per-code address book
pub mod ledger;
/// Dotted node coordinates
pub mod path;
/// Assembled trace and the proxy response envelope
pub mod result;
/// Call frames and leaf events
pub mod trace;

pub use ledger::*;
pub use path::*;
pub use result::*;
pub use trace::*;
