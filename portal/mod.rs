// ========================================================================================
//
//                              REMOTE DATA PORTAL CLIENT
//
// ========================================================================================
//
// The analysis inputs live in a remote data-sharing portal and are referenced
// by accession identifiers. This module owns the portal session: fetching
// input files into a local cache, storing result artifacts with descriptive
// annotations and a provenance record, and submitting a stored artifact to a
// scoring evaluation queue.
//
// The client is an explicit value threaded through every call that needs
// remote access; there is no implicit global session. Portal failures carry
// no retry or backoff logic: every error propagates to the caller and
// terminates the run.

pub mod client;
pub mod entity;

pub use client::{PortalClient, PortalError, TOKEN_ENV_VAR};
pub use entity::{EntityMetadata, ProvenanceRecord, ResultAnnotations, SubmissionReceipt};
