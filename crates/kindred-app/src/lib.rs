// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod debounce;
pub mod fetch;
pub mod filters;
pub mod ids;
pub mod location;
pub mod model;
pub mod navigation;
pub mod router;
pub mod selection;
pub mod service;
pub mod session;
pub mod state;

pub use debounce::*;
pub use fetch::*;
pub use filters::*;
pub use ids::*;
pub use location::*;
pub use model::*;
pub use navigation::*;
pub use router::*;
pub use selection::*;
pub use service::*;
pub use session::*;
pub use state::*;
