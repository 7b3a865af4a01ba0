//! # dst-scenarios: District Scenario Collaborators
//!
//! Concrete [`OptimizationEntity`](dst_core::OptimizationEntity)
//! implementations for the scheduling algorithms in `dst-algo`: buildings
//! composed of device specifications, a district operator, and a validated
//! [`District`] entity tree. The [`factory`] module bundles ready-made
//! scenarios and load/price/generation profiles for demos and integration
//! tests.
//!
//! Buildings solve their local subproblems on the embedded conic QP backend
//! of `dst-core`. Deferrable loads are the mixed-integer element: their
//! contiguous-run start offset is enumerated exactly when an integer-exact
//! solve is requested, and relaxed to a window energy constraint otherwise.

pub mod building;
pub mod devices;
pub mod district;
pub mod factory;

pub use building::Building;
pub use devices::{DeviceSpec, Objective};
pub use district::{District, DistrictOperator};
