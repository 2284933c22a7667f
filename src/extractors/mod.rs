// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod reddit;
pub mod registry;
pub mod traits;

pub use registry::ExtractorRegistry;
pub use traits::{ExtractionError, Extractor};
