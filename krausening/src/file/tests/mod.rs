//! Tests for properties file loading helpers.
