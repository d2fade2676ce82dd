#![allow(dead_code)]

pub mod gallery;
pub mod socket_guard;
