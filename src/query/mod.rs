pub mod ast;
pub mod catalog;
pub mod normalize;
pub mod optimize;
pub mod parse;
pub mod transform;
