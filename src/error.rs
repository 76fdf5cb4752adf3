//! Rich diagnostic error types for the skeleton-reid engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and enough context (line, column, frame,
//! BodyID) for an annotator to fix the offending input.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the skeleton-reid engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ReidError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Imagery(#[from] ImageryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),
}

// ---------------------------------------------------------------------------
// Input (pose dataset) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("malformed input: required column \"{column}\" is missing")]
    #[diagnostic(
        code(reid::input::missing_column),
        help(
            "The pose dataset must contain the columns Frame, Timestamp, BodyID, \
             NECK_X, NECK_Y and NECK_Z. Check the header row of the CSV file."
        )
    )]
    MissingColumn { column: String },

    #[error("malformed input: line {line}, column \"{column}\": cannot parse \"{value}\"")]
    #[diagnostic(
        code(reid::input::invalid_value),
        help(
            "Frame and BodyID must be integers, Timestamp and *_X/*_Y/*_Z columns \
             must be numeric. Coordinates may be left empty (or NaN) when missing."
        )
    )]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("malformed input: line {line} repeats frame {frame}, BodyID {body_id}")]
    #[diagnostic(
        code(reid::input::duplicate_record),
        help("Each (Frame, BodyID) pair may appear only once. Remove the duplicate row.")
    )]
    DuplicateRecord { line: u64, frame: i64, body_id: i64 },

    #[error("malformed input: {message}")]
    #[diagnostic(
        code(reid::input::csv),
        help("The dataset could not be read as delimited text. Check the delimiter and quoting.")
    )]
    Csv { message: String },

    #[error("failed to read pose dataset: {path}")]
    #[diagnostic(
        code(reid::input::io),
        help("Ensure the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Spatial key errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KeyError {
    #[error("frame {frame}, BodyID {body_id}: spatial key column \"{column}\" is missing")]
    #[diagnostic(
        code(reid::key::missing),
        severity(Warning),
        help(
            "The neck coordinate is required for automatic re-identification. \
             This body is still shown for manual labeling."
        )
    )]
    MissingKey {
        frame: i64,
        body_id: i64,
        column: String,
    },
}

// ---------------------------------------------------------------------------
// Name catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("configuration error: the person name catalog is empty")]
    #[diagnostic(
        code(reid::catalog::empty),
        help("Provide at least one person name, one per line.")
    )]
    Empty,

    #[error("\"{name}\" (BodyID {body_id}) is not in the person name catalog")]
    #[diagnostic(
        code(reid::catalog::unknown_name),
        help("Labels must be chosen from the names supplied at session start, or left empty.")
    )]
    UnknownName { name: String, body_id: i64 },

    #[error("failed to read person name catalog: {path}")]
    #[diagnostic(
        code(reid::catalog::io),
        help("Ensure the names file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("nothing to export: no record has been assigned a person name")]
    #[diagnostic(
        code(reid::export::empty),
        help("Label at least one body before exporting. The session is still active.")
    )]
    Empty,

    #[error("failed to write export: {message}")]
    #[diagnostic(
        code(reid::export::write),
        help("Check that the output location is writable and the disk is not full.")
    )]
    Write { message: String },
}

// ---------------------------------------------------------------------------
// Imagery errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ImageryError {
    #[error("failed to open frame archive: {path}")]
    #[diagnostic(
        code(reid::imagery::io),
        help("Ensure the archive exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid frame archive: {message}")]
    #[diagnostic(
        code(reid::imagery::archive),
        help("The frame images must be supplied as a zip archive of frame_<N>.png/.jpg files.")
    )]
    Archive { message: String },

    #[error("invalid image name prefix \"{prefix}\": {message}")]
    #[diagnostic(
        code(reid::imagery::prefix),
        help("Use a plain literal prefix such as \"frame_\".")
    )]
    Prefix { prefix: String, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read session config: {path}")]
    #[diagnostic(
        code(reid::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session config: {path}")]
    #[diagnostic(
        code(reid::config::parse),
        help("Check the TOML syntax in the session config file. {message}")
    )]
    Parse { path: String, message: String },

    #[error("session config is missing \"{field}\"")]
    #[diagnostic(
        code(reid::config::missing_field),
        help("Set `{field}` in the config file or pass it on the command line.")
    )]
    MissingField { field: String },
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("the pose dataset contains no frames")]
    #[diagnostic(
        code(reid::session::no_frames),
        help("The CSV file has a header but no data rows.")
    )]
    NoFrames,

    #[error("frame position {position} is out of range (0..{total})")]
    #[diagnostic(
        code(reid::session::out_of_range),
        help("Frame positions run from 0 to the number of frames minus one.")
    )]
    PositionOutOfRange { position: usize, total: usize },

    #[error("frame {frame} is not in the dataset")]
    #[diagnostic(
        code(reid::session::unknown_frame),
        help("List the available frames with `skel-reid inspect`.")
    )]
    UnknownFrame { frame: i64 },

    #[error("frame {frame} has no body with BodyID {body_id}")]
    #[diagnostic(
        code(reid::session::unknown_body),
        help("Edits may only label bodies present in the frame being annotated.")
    )]
    UnknownBody { frame: i64, body_id: i64 },
}

/// Convenience alias for functions returning skeleton-reid results.
pub type ReidResult<T> = std::result::Result<T, ReidError>;
