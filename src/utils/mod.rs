pub mod codec;
pub mod path;
