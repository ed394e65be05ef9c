//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When fixture data changes, update only this file.

// ============================================================================
// Basic Auth Credentials
// ============================================================================

pub const ADMIN_USER: &str = "admin";

pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Fixture Library
// ============================================================================

/// Songs across all fixture files
pub const TOTAL_SONGS: usize = 4;

/// One unknown key plus one unparsable track number
pub const FIXTURE_WARNINGS: usize = 2;

pub const BAND_ARTIST: &str = "The Test Band";
pub const JAZZ_ARTIST: &str = "Jazz Ensemble";

pub const OPENING_TRACK_TITLE: &str = "Opening Track";
pub const SECOND_SONG_TITLE: &str = "Second Song";
pub const BLUE_NIGHT_TITLE: &str = "Blue Night";
pub const IMPROVISATION_TITLE: &str = "Untitled Improvisation";

pub const BLUE_NIGHT_MODIFIED: &str = "2017-03-04 10:20:30";

/// Songs in the file added by reindex tests
pub const EXTRA_SONGS: usize = 2;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Maximum time to wait for a background reindex to land (milliseconds)
pub const REINDEX_WAIT_TIMEOUT_MS: u64 = 5000;
