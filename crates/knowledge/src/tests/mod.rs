//! Retrieval tests across the build and search path.
