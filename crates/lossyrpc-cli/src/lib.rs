// Copyright 2025 lossyrpc Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # lossyrpc CLI
//!
//! Command-line interface for lossyrpc services.
//!
//! ## Key Commands
//!
//! - `lossyrpc call`: Make one raw call (outputs the reply envelope as JSON)
//! - `lossyrpc probe`: Check whether a service is accepting connections
//! - `lossyrpc serve`: Run the coordination example service until Ctrl-C
//!
//! ## Architecture
//!
//! The CLI uses the `argh` crate for argument parsing and dispatches to
//! `lossyrpc-server` and `lossyrpc-client`. The pieces that are more than
//! argument plumbing live in this library so they can be tested directly.

pub mod probe;
pub mod serve;

pub use probe::probe;
pub use serve::serve;
