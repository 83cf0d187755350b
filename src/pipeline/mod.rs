// Frame pipeline: conversion, processing, handoff and the worker driving them.

pub mod convert;
pub mod edges;
pub mod error;
pub mod frame;
pub mod processor;
pub mod session;
pub mod worker;
