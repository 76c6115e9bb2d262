pub(crate) mod reader;
pub(crate) mod reduce;
pub(crate) mod scratch;
mod simd;
pub(crate) mod zones;
