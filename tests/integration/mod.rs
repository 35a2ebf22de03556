//! Integration tests for the state capture/restore engine.

mod blueprint_documents;
mod decision_protocol;
mod end_to_end;
mod snapshot_container;
mod test_utils;
