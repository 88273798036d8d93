pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod stack;
