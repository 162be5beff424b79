#![forbid(unsafe_code)]

pub mod aabb;

pub use aabb::Aabb;
