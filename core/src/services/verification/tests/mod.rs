//! Unit tests for the verification session store
