// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Turn pipe-delimited records into ROG frames and push them out a serial port

pub mod frame;
pub mod pipeline;
pub mod serial;
pub mod source;

pub use frame::{format, DateToken, Frame};
pub use pipeline::{fetch_and_send, preview, send_formatted_frame, PipelineError};
pub use serial::{Connection, SerialConfig, SystemPorts, TransportError};
pub use source::{FetchError, RecordSource};
