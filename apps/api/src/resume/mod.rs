// Resume persistence API: list / save / fetch / delete.
// Handlers stay thin; ownership checks, normalization and validation live in `service`
// so the in-process editor gateway goes through the same path.

pub mod handlers;
pub mod service;
