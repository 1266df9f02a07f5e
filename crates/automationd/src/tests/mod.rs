//! Test suites for the automation daemon.

pub(crate) mod support;
