//! IO functionality: reading the rotation problem payload and writing the solved rotation, both as JSON.

pub mod simple;
