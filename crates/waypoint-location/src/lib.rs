//! Waypoint Location Codec
//!
//! Normalizes raw path/query/hash strings and converts query strings to and
//! from typed values. Everything here is pure and allocation-light; the
//! route matcher and the history backends build on it.

mod path;
mod query;
mod target;

pub use path::{
    decode_segment, encode_segment, has_trailing_slash, join_paths, normalize_hash,
    normalize_path, split_location, split_segments, trim_trailing_slash,
};
pub use query::{parse_query, stringify_query, DefaultQueryCodec, Query, QueryCodec, QueryValue};
pub use target::{build_full_path, Location, NavigationTarget, Params};
