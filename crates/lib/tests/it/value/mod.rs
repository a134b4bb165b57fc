//! Value and size estimation tests
