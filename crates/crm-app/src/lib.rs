// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod filter;
pub mod format;
pub mod forms;
pub mod ids;
pub mod model;
pub mod record;
pub mod state;
pub mod value;

pub use filter::*;
pub use format::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use record::*;
pub use state::*;
pub use value::*;
