//! Property tests for the pure reconcile and merge passes.

mod reconcile_props;
